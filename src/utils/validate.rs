use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::submissions::entities::StudentItem;

static SUBMISSION_UUID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,128}$").expect("Invalid submission uuid regex"));

const MAX_IDENTIFIER_LEN: usize = 255;

pub fn validate_submission_uuid(submission_uuid: &str) -> Result<(), &'static str> {
    if !SUBMISSION_UUID_RE.is_match(submission_uuid) {
        return Err("Submission uuid must be 1-128 letters, digits, underscores or hyphens");
    }
    Ok(())
}

fn validate_identifier(value: &str) -> bool {
    !value.trim().is_empty() && value.len() <= MAX_IDENTIFIER_LEN
}

/// 校验学生作答项标识：各字段非空且不超过 255 字节
pub fn validate_student_item(item: &StudentItem) -> Result<(), &'static str> {
    if !validate_identifier(&item.student_id) {
        return Err("student_id must be non-empty and at most 255 bytes");
    }
    if !validate_identifier(&item.course_id) {
        return Err("course_id must be non-empty and at most 255 bytes");
    }
    if !validate_identifier(&item.item_id) {
        return Err("item_id must be non-empty and at most 255 bytes");
    }
    if !validate_identifier(&item.item_type) {
        return Err("item_type must be non-empty and at most 255 bytes");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_submission_uuid() {
        assert!(validate_submission_uuid("5f1c2a9e-8d4b-4c1e-9b7a-2e3f4a5b6c7d").is_ok());
        assert!(validate_submission_uuid("abc123").is_ok());
        assert!(validate_submission_uuid("").is_err());
        assert!(validate_submission_uuid("../etc/passwd").is_err());
        assert!(validate_submission_uuid(&"a".repeat(129)).is_err());
    }

    #[test]
    fn test_validate_student_item() {
        let mut item = StudentItem {
            student_id: "alice".to_string(),
            course_id: "course-1".to_string(),
            item_id: "essay".to_string(),
            item_type: "openassessment".to_string(),
        };
        assert!(validate_student_item(&item).is_ok());

        item.course_id = "   ".to_string();
        assert!(validate_student_item(&item).is_err());

        item.course_id = "c".repeat(256);
        assert!(validate_student_item(&item).is_err());
    }
}

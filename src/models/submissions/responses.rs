use serde::Serialize;

use super::entities::{StudentItem, Submission};

/// 提交及其所属学生信息
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionWithStudent {
    pub submission: Submission,
    pub student_item: StudentItem,
}

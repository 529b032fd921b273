use serde::Serialize;

use crate::errors::{ErrorCategory, PeerFlowError};

/// 接口业务错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,

    // 通用错误 1xxx
    BadRequest = 1000,
    NotFound = 1004,
    InternalServerError = 1500,

    // 提交相关 2xxx
    SubmissionNotFound = 2001,

    // 互评相关 3xxx
    PeerRequestInvalid = 3000,
    PeerWorkflowConflict = 3002,
    RubricSelectionInvalid = 3003,
    ScoreNotAvailable = 3004,
    FeedbackNotFound = 3005,
}

impl ErrorCode {
    /// 根据领域错误推断错误码
    pub fn from_error(err: &PeerFlowError) -> Self {
        match err {
            PeerFlowError::InvalidRubricSelection(_) => ErrorCode::RubricSelectionInvalid,
            PeerFlowError::NotFound(_) => ErrorCode::NotFound,
            _ => match err.category() {
                ErrorCategory::Request => ErrorCode::PeerRequestInvalid,
                ErrorCategory::Workflow => ErrorCode::PeerWorkflowConflict,
                ErrorCategory::Internal => ErrorCode::InternalServerError,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_from_error() {
        assert_eq!(
            ErrorCode::from_error(&PeerFlowError::workflow("no open item")),
            ErrorCode::PeerWorkflowConflict
        );
        assert_eq!(
            ErrorCode::from_error(&PeerFlowError::invalid_rubric_selection("bad option")),
            ErrorCode::RubricSelectionInvalid
        );
        assert_eq!(
            ErrorCode::from_error(&PeerFlowError::database_operation("locked")),
            ErrorCode::InternalServerError
        );
        assert_eq!(
            ErrorCode::from_error(&PeerFlowError::request("oversized")),
            ErrorCode::PeerRequestInvalid
        );
    }
}

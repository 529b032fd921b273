pub mod peer;
pub mod submissions;

pub use peer::configure_peer_routes;
pub use submissions::configure_submission_routes;

use actix_web::HttpResponse;
use serde::Serialize;

use crate::errors::{ErrorCategory, PeerFlowError};
use crate::models::{ApiResponse, ErrorCode};

/// 成功响应
pub(crate) fn ok<T: Serialize>(data: T, message: &str) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(data, message))
}

/// 将领域错误转换为 HTTP 响应
///
/// 请求错误 400，未找到 404，流程错误 409，内部错误 500（只返回通用提示）。
pub(crate) fn error_response(err: &PeerFlowError) -> HttpResponse {
    let code = ErrorCode::from_error(err);
    match (err, err.category()) {
        (PeerFlowError::NotFound(msg), _) => {
            HttpResponse::NotFound().json(ApiResponse::error_empty(code, msg.as_str()))
        }
        (_, ErrorCategory::Request) => {
            HttpResponse::BadRequest().json(ApiResponse::error_empty(code, err.message()))
        }
        (_, ErrorCategory::Workflow) => {
            HttpResponse::Conflict().json(ApiResponse::error_empty(code, err.message()))
        }
        (_, ErrorCategory::Internal) => HttpResponse::InternalServerError().json(
            ApiResponse::error_empty(code, "Internal error, please try again later"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (PeerFlowError::request("bad"), StatusCode::BAD_REQUEST),
            (
                PeerFlowError::invalid_rubric_selection("bad"),
                StatusCode::BAD_REQUEST,
            ),
            (PeerFlowError::not_found("gone"), StatusCode::NOT_FOUND),
            (PeerFlowError::workflow("no item"), StatusCode::CONFLICT),
            (
                PeerFlowError::database_operation("locked"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(error_response(&err).status(), status);
        }
    }
}

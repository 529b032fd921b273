use actix_web::{HttpResponse, Result as ActixResult, web};
use std::sync::Arc;

use super::{error_response, ok};
use crate::errors::PeerFlowError;
use crate::models::submissions::requests::CreateSubmissionRequest;
use crate::models::{ApiResponse, ErrorCode};
use crate::storage::SubmissionApi;
use crate::utils::{validate_student_item, validate_submission_uuid};

// 创建提交
pub async fn create_submission(
    submissions: web::Data<Arc<dyn SubmissionApi>>,
    body: web::Json<CreateSubmissionRequest>,
) -> ActixResult<HttpResponse> {
    let req = body.into_inner();
    if let Err(msg) = validate_student_item(&req.student_item) {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::BadRequest,
            msg,
        )));
    }

    match submissions
        .create_submission(req, chrono::Utc::now())
        .await
    {
        Ok(submission) => Ok(ok(submission, "Submission created successfully")),
        Err(e) => Ok(error_response(&e)),
    }
}

// 获取提交详情
pub async fn get_submission(
    submissions: web::Data<Arc<dyn SubmissionApi>>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let submission_uuid = path.into_inner();
    if let Err(msg) = validate_submission_uuid(&submission_uuid) {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::BadRequest,
            msg,
        )));
    }

    match submissions.get_submission_and_student(&submission_uuid).await {
        Ok(found) => Ok(ok(found, "Submission retrieved successfully")),
        Err(PeerFlowError::NotFound(_)) => Ok(HttpResponse::NotFound().json(
            ApiResponse::error_empty(ErrorCode::SubmissionNotFound, "Submission not found"),
        )),
        Err(e) => Ok(error_response(&e)),
    }
}

// 配置路由
pub fn configure_submission_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/submissions")
            .service(web::resource("").route(web::post().to(create_submission)))
            .service(web::resource("/{submission_uuid}").route(web::get().to(get_submission))),
    );
}

use actix_web::{HttpResponse, Result as ActixResult, web};
use std::sync::Arc;

use super::{error_response, ok};
use crate::models::{
    ApiResponse, ErrorCode,
    assessments::requests::{AssessmentListQuery, SetAssessmentFeedbackRequest},
    peer::requests::{
        CreateAssessmentRequest, NextSubmissionQuery, RequirementsQuery, StartWorkflowRequest,
    },
};
use crate::services::PeerAssessmentService;

type PeerService = web::Data<Arc<PeerAssessmentService>>;

// 进入互评环节
pub async fn start_workflow(
    service: PeerService,
    body: web::Json<StartWorkflowRequest>,
) -> ActixResult<HttpResponse> {
    match service.on_start(&body.submission_uuid).await {
        Ok(workflow) => Ok(ok(workflow, "Peer workflow started")),
        Err(e) => Ok(error_response(&e)),
    }
}

// 互评进度
pub async fn get_status(
    service: PeerService,
    path: web::Path<String>,
    query: web::Query<RequirementsQuery>,
) -> ActixResult<HttpResponse> {
    match service
        .get_status(&path.into_inner(), query.into_inner().into())
        .await
    {
        Ok(status) => Ok(ok(status, "Peer status retrieved successfully")),
        Err(e) => Ok(error_response(&e)),
    }
}

// 领取下一份待评提交
pub async fn next_submission(
    service: PeerService,
    path: web::Path<String>,
    query: web::Query<NextSubmissionQuery>,
) -> ActixResult<HttpResponse> {
    match service
        .get_submission_to_assess(&path.into_inner(), query.must_be_graded_by)
        .await
    {
        Ok(Some(submission)) => Ok(ok(submission, "Submission assigned for assessment")),
        Ok(None) => Ok(HttpResponse::Ok().json(ApiResponse::success_empty(
            "No submission available for assessment",
        ))),
        Err(e) => Ok(error_response(&e)),
    }
}

// 提交互评
pub async fn create_assessment(
    service: PeerService,
    path: web::Path<String>,
    body: web::Json<CreateAssessmentRequest>,
) -> ActixResult<HttpResponse> {
    match service
        .create_assessment(&path.into_inner(), body.into_inner())
        .await
    {
        Ok(assessment) => Ok(HttpResponse::Created().json(ApiResponse::success(
            assessment,
            "Assessment created successfully",
        ))),
        Err(e) => Ok(error_response(&e)),
    }
}

// 学生给出的互评
pub async fn list_submitted_assessments(
    service: PeerService,
    path: web::Path<String>,
    query: web::Query<AssessmentListQuery>,
) -> ActixResult<HttpResponse> {
    let query = query.into_inner();
    match service
        .get_submitted_assessments(
            &path.into_inner(),
            query.scored_only.unwrap_or(false),
            query.limit,
        )
        .await
    {
        Ok(list) => Ok(ok(list, "Submitted assessments retrieved successfully")),
        Err(e) => Ok(error_response(&e)),
    }
}

// 提交收到的互评
pub async fn list_assessments(
    service: PeerService,
    path: web::Path<String>,
    query: web::Query<AssessmentListQuery>,
) -> ActixResult<HttpResponse> {
    let query = query.into_inner();
    match service
        .get_assessments(
            &path.into_inner(),
            query.scored_only.unwrap_or(false),
            query.limit,
        )
        .await
    {
        Ok(list) => Ok(ok(list, "Assessments retrieved successfully")),
        Err(e) => Ok(error_response(&e)),
    }
}

// 最终得分
pub async fn get_score(
    service: PeerService,
    path: web::Path<String>,
    query: web::Query<RequirementsQuery>,
) -> ActixResult<HttpResponse> {
    match service
        .get_score(&path.into_inner(), query.into_inner().into())
        .await
    {
        Ok(Some(score)) => Ok(ok(score, "Score retrieved successfully")),
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::ScoreNotAvailable,
            "Score is not available yet",
        ))),
        Err(e) => Ok(error_response(&e)),
    }
}

// 各维度中位数
pub async fn get_median_scores(
    service: PeerService,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    match service
        .get_assessment_median_scores(&path.into_inner())
        .await
    {
        Ok(scores) => Ok(ok(scores, "Median scores retrieved successfully")),
        Err(e) => Ok(error_response(&e)),
    }
}

// 各维度最高分
pub async fn get_rubric_max_scores(
    service: PeerService,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    match service.get_rubric_max_scores(&path.into_inner()).await {
        Ok(Some(scores)) => Ok(ok(scores, "Rubric max scores retrieved successfully")),
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::NotFound,
            "Submission has no assessments yet",
        ))),
        Err(e) => Ok(error_response(&e)),
    }
}

// 获取评审反馈
pub async fn get_feedback(
    service: PeerService,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    match service.get_assessment_feedback(&path.into_inner()).await {
        Ok(Some(feedback)) => Ok(ok(feedback, "Feedback retrieved successfully")),
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::FeedbackNotFound,
            "Feedback not found",
        ))),
        Err(e) => Ok(error_response(&e)),
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct FeedbackBody {
    pub feedback_text: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

// 设置评审反馈
pub async fn set_feedback(
    service: PeerService,
    path: web::Path<String>,
    body: web::Json<FeedbackBody>,
) -> ActixResult<HttpResponse> {
    let body = body.into_inner();
    let request = SetAssessmentFeedbackRequest {
        submission_uuid: path.into_inner(),
        feedback_text: body.feedback_text,
        options: body.options,
    };

    match service.set_assessment_feedback(request).await {
        Ok(feedback) => Ok(ok(feedback, "Feedback saved successfully")),
        Err(e) => Ok(error_response(&e)),
    }
}

// 配置路由
pub fn configure_peer_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/peer")
            .service(web::resource("/workflows").route(web::post().to(start_workflow)))
            .service(
                web::resource("/workflows/{submission_uuid}/status")
                    .route(web::get().to(get_status)),
            )
            .service(
                web::resource("/workflows/{submission_uuid}/next")
                    .route(web::post().to(next_submission)),
            )
            .service(
                web::resource("/workflows/{submission_uuid}/assessments")
                    .route(web::post().to(create_assessment)),
            )
            .service(
                web::resource("/workflows/{submission_uuid}/submitted")
                    .route(web::get().to(list_submitted_assessments)),
            )
            .service(
                web::resource("/submissions/{submission_uuid}/assessments")
                    .route(web::get().to(list_assessments)),
            )
            .service(
                web::resource("/submissions/{submission_uuid}/score")
                    .route(web::get().to(get_score)),
            )
            .service(
                web::resource("/submissions/{submission_uuid}/median")
                    .route(web::get().to(get_median_scores)),
            )
            .service(
                web::resource("/submissions/{submission_uuid}/rubric-max-scores")
                    .route(web::get().to(get_rubric_max_scores)),
            )
            .service(
                web::resource("/submissions/{submission_uuid}/feedback")
                    .route(web::get().to(get_feedback))
                    .route(web::put().to(set_feedback)),
            ),
    );
}

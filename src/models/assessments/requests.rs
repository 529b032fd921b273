use serde::Deserialize;

/// 设置评审反馈请求
#[derive(Debug, Clone, Deserialize)]
pub struct SetAssessmentFeedbackRequest {
    pub submission_uuid: String,
    pub feedback_text: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

/// 评审列表查询参数
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssessmentListQuery {
    pub scored_only: Option<bool>,
    pub limit: Option<u64>,
}

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 评审明细（已按评分标准展开）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentPartDetail {
    pub criterion: String,
    pub criterion_label: String,
    pub option: Option<String>,
    pub option_label: Option<String>,
    pub points: Option<i32>,
    pub points_possible: i32,
    pub feedback: String,
}

/// 评审详情
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentDetail {
    pub id: i64,
    pub submission_uuid: String,
    pub scorer_id: String,
    pub score_type: String,
    pub scored_at: DateTime<Utc>,
    pub feedback: String,
    pub rubric_content_hash: String,
    pub parts: Vec<AssessmentPartDetail>,
    pub points_earned: i32,
    pub points_possible: i32,
}

/// 评审反馈详情
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentFeedbackResponse {
    pub submission_uuid: String,
    pub feedback_text: String,
    pub options: Vec<String>,
    pub updated_at: DateTime<Utc>,
    pub assessments: Vec<AssessmentDetail>,
}

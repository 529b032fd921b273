use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 评审明细（每个维度一条）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentPart {
    pub criterion_id: i64,
    pub option_id: Option<i64>,
    pub feedback: String,
}

/// 评审记录（只追加，创建后不可变）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: i64,
    pub submission_uuid: String,
    pub rubric_id: i64,
    pub scorer_id: String,
    pub score_type: String,
    pub scored_at: DateTime<Utc>,
    pub feedback: String,
    pub parts: Vec<AssessmentPart>,
}

impl Assessment {
    /// 互评类型标识
    pub const PEER_TYPE: &'static str = "PE";
}

/// 待写入的评审记录
#[derive(Debug, Clone)]
pub struct NewAssessment {
    pub submission_uuid: String,
    pub rubric_id: i64,
    pub scorer_id: String,
    pub scored_at: DateTime<Utc>,
    pub feedback: String,
    pub parts: Vec<AssessmentPart>,
}

/// 被评者对评审结果的反馈（每个提交一条）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentFeedback {
    pub submission_uuid: String,
    pub feedback_text: String,
    pub options: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

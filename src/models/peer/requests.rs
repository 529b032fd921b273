use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::peer::entities::PeerRequirements;
use crate::models::rubrics::entities::RubricDefinition;

/// 进入互评环节请求
#[derive(Debug, Clone, Deserialize)]
pub struct StartWorkflowRequest {
    pub submission_uuid: String,
}

/// 创建评审请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAssessmentRequest {
    pub scorer_id: String,
    pub options_selected: BTreeMap<String, String>,
    #[serde(default)]
    pub criterion_feedback: BTreeMap<String, String>,
    #[serde(default)]
    pub overall_feedback: String,
    pub rubric: RubricDefinition,
    pub must_be_graded_by: u32,
    pub scored_at: Option<DateTime<Utc>>,
}

/// 互评要求查询参数
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RequirementsQuery {
    pub must_grade: u32,
    pub must_be_graded_by: u32,
}

impl From<RequirementsQuery> for PeerRequirements {
    fn from(query: RequirementsQuery) -> Self {
        PeerRequirements {
            must_grade: query.must_grade,
            must_be_graded_by: query.must_be_graded_by,
        }
    }
}

/// 获取待评提交查询参数
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct NextSubmissionQuery {
    pub must_be_graded_by: u32,
}

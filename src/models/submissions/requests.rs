use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::entities::StudentItem;

/// 创建提交请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubmissionRequest {
    pub student_item: StudentItem,
    pub answer: serde_json::Value,
    pub submitted_at: Option<DateTime<Utc>>,
}

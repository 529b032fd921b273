use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 学生作答项：某个学生在某门课程中对某道题目的作答位置
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentItem {
    pub student_id: String,
    pub course_id: String,
    pub item_id: String,
    #[serde(default = "default_item_type")]
    pub item_type: String,
}

fn default_item_type() -> String {
    "openassessment".to_string()
}

/// 提交（创建后不可变）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    // 提交唯一标识
    pub uuid: String,
    // 关联的学生作答项 ID
    pub student_item_id: i64,
    // 第几次提交
    pub attempt_number: i32,
    // 作答内容
    pub answer: serde_json::Value,
    // 提交时间
    pub submitted_at: DateTime<Utc>,
    // 入库时间
    pub created_at: DateTime<Utc>,
}

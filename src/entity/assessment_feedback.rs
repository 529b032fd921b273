//! 评审反馈实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assessment_feedback")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub submission_uuid: String,
    #[sea_orm(column_type = "Text")]
    pub feedback_text: String,
    // JSON 数组形式保存的可选项文本
    #[sea_orm(column_type = "Text")]
    pub options: String,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_assessment_feedback(
        self,
    ) -> crate::models::assessments::entities::AssessmentFeedback {
        use chrono::{DateTime, Utc};

        crate::models::assessments::entities::AssessmentFeedback {
            submission_uuid: self.submission_uuid,
            feedback_text: self.feedback_text,
            options: serde_json::from_str(&self.options).unwrap_or_default(),
            updated_at: DateTime::<Utc>::from_timestamp(self.updated_at, 0).unwrap_or_default(),
        }
    }
}

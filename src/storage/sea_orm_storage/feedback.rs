//! 评审反馈存储操作

use super::SeaOrmStorage;
use crate::entity::assessment_feedback::{ActiveModel, Column, Entity as AssessmentFeedbacks};
use crate::errors::{PeerFlowError, Result};
use crate::models::assessments::entities::AssessmentFeedback;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set};

impl SeaOrmStorage {
    /// 获取提交的评审反馈
    pub async fn get_assessment_feedback_impl(
        &self,
        submission_uuid: &str,
    ) -> Result<Option<AssessmentFeedback>> {
        let result = AssessmentFeedbacks::find()
            .filter(Column::SubmissionUuid.eq(submission_uuid))
            .one(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询评审反馈失败: {e}")))?;

        Ok(result.map(|m| m.into_assessment_feedback()))
    }

    /// 创建或更新评审反馈
    ///
    /// feedback_text 为 None 时保留原文本，选项总是整体替换。
    pub async fn upsert_assessment_feedback_impl(
        &self,
        submission_uuid: &str,
        feedback_text: Option<String>,
        options: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<AssessmentFeedback> {
        let options_json = serde_json::to_string(&options)?;

        let existing = AssessmentFeedbacks::find()
            .filter(Column::SubmissionUuid.eq(submission_uuid))
            .one(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询评审反馈失败: {e}")))?;

        let model = match existing {
            Some(found) => {
                let mut active = found.into_active_model();
                if let Some(text) = feedback_text {
                    active.feedback_text = Set(text);
                }
                active.options = Set(options_json);
                active.updated_at = Set(now.timestamp());
                active.update(&self.db).await.map_err(|e| {
                    PeerFlowError::database_operation(format!("更新评审反馈失败: {e}"))
                })?
            }
            None => {
                let active = ActiveModel {
                    submission_uuid: Set(submission_uuid.to_string()),
                    feedback_text: Set(feedback_text.unwrap_or_default()),
                    options: Set(options_json),
                    updated_at: Set(now.timestamp()),
                    ..Default::default()
                };
                active.insert(&self.db).await.map_err(|e| {
                    PeerFlowError::database_operation(format!("创建评审反馈失败: {e}"))
                })?
            }
        };

        Ok(model.into_assessment_feedback())
    }
}

//! 提交存储操作
//!
//! 提交存储是互评流程的外部协作方，这里提供基于同一数据库的参考实现。

use super::SeaOrmStorage;
use crate::entity::student_items::{
    ActiveModel as StudentItemActiveModel, Column as StudentItemColumn, Entity as StudentItems,
};
use crate::entity::submissions::{ActiveModel, Column, Entity as Submissions};
use crate::errors::{PeerFlowError, Result, is_unique_violation};
use crate::models::submissions::{
    entities::{StudentItem, Submission},
    requests::CreateSubmissionRequest,
    responses::SubmissionWithStudent,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set};

impl SeaOrmStorage {
    /// 获取或创建学生作答项
    async fn get_or_create_student_item_impl(&self, item: &StudentItem) -> Result<i64> {
        let find = || {
            StudentItems::find()
                .filter(StudentItemColumn::StudentId.eq(item.student_id.as_str()))
                .filter(StudentItemColumn::CourseId.eq(item.course_id.as_str()))
                .filter(StudentItemColumn::ItemId.eq(item.item_id.as_str()))
                .filter(StudentItemColumn::ItemType.eq(item.item_type.as_str()))
        };

        if let Some(existing) = find()
            .one(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询学生作答项失败: {e}")))?
        {
            return Ok(existing.id);
        }

        let model = StudentItemActiveModel {
            student_id: Set(item.student_id.clone()),
            course_id: Set(item.course_id.clone()),
            item_id: Set(item.item_id.clone()),
            item_type: Set(item.item_type.clone()),
            ..Default::default()
        };

        match model.insert(&self.db).await {
            Ok(created) => Ok(created.id),
            // 并发创建，读取已存在的记录
            Err(e) if is_unique_violation(&e) => find()
                .one(&self.db)
                .await
                .map_err(|e| {
                    PeerFlowError::database_operation(format!("查询学生作答项失败: {e}"))
                })?
                .map(|m| m.id)
                .ok_or_else(|| PeerFlowError::database_operation("学生作答项创建冲突后未找到记录")),
            Err(e) => Err(PeerFlowError::database_operation(format!(
                "创建学生作答项失败: {e}"
            ))),
        }
    }

    /// 创建提交（自动计算提交次数）
    pub async fn create_submission_impl(
        &self,
        req: CreateSubmissionRequest,
        now: DateTime<Utc>,
    ) -> Result<Submission> {
        let student_item_id = self.get_or_create_student_item_impl(&req.student_item).await?;

        // 查询当前最大提交次数
        let max_attempt = Submissions::find()
            .filter(Column::StudentItemId.eq(student_item_id))
            .select_only()
            .column_as(Column::AttemptNumber.max(), "max_attempt")
            .into_tuple::<Option<i32>>()
            .one(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询最大提交次数失败: {e}")))?
            .flatten()
            .unwrap_or(0);

        let model = ActiveModel {
            uuid: Set(uuid::Uuid::new_v4().to_string()),
            student_item_id: Set(student_item_id),
            attempt_number: Set(max_attempt + 1),
            answer: Set(serde_json::to_string(&req.answer)?),
            submitted_at: Set(req.submitted_at.unwrap_or(now).timestamp()),
            created_at: Set(now.timestamp()),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("创建提交失败: {e}")))?;

        Ok(result.into_submission())
    }

    /// 通过 UUID 获取提交
    pub async fn get_submission_impl(&self, submission_uuid: &str) -> Result<Submission> {
        Submissions::find()
            .filter(Column::Uuid.eq(submission_uuid))
            .one(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询提交失败: {e}")))?
            .map(|m| m.into_submission())
            .ok_or_else(|| PeerFlowError::not_found(format!("提交不存在: {submission_uuid}")))
    }

    /// 通过 UUID 获取提交及学生信息
    pub async fn get_submission_and_student_impl(
        &self,
        submission_uuid: &str,
    ) -> Result<SubmissionWithStudent> {
        let (submission, student_item) = Submissions::find()
            .filter(Column::Uuid.eq(submission_uuid))
            .find_also_related(StudentItems)
            .one(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询提交失败: {e}")))?
            .ok_or_else(|| PeerFlowError::not_found(format!("提交不存在: {submission_uuid}")))?;

        let student_item = student_item.ok_or_else(|| {
            PeerFlowError::database_operation(format!("提交缺少学生作答项: {submission_uuid}"))
        })?;

        Ok(SubmissionWithStudent {
            submission: submission.into_submission(),
            student_item: student_item.into_student_item(),
        })
    }
}

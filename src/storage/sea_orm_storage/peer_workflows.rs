//! 互评台账存储操作

use super::SeaOrmStorage;
use crate::entity::peer_workflow_items::{Column as ItemColumn, Entity as PeerWorkflowItems};
use crate::entity::peer_workflows::{ActiveModel, Column, Entity as PeerWorkflows};
use crate::errors::{PeerFlowError, Result, is_unique_violation};
use crate::models::{peer::entities::PeerWorkflow, submissions::entities::StudentItem};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
    sea_query::Expr,
};

/// 统计作者已获得的完成评审数
pub(super) async fn count_graded_by_in<C: ConnectionTrait>(conn: &C, author_id: i64) -> Result<u64> {
    PeerWorkflowItems::find()
        .filter(ItemColumn::AuthorId.eq(author_id))
        .filter(ItemColumn::AssessmentId.is_not_null())
        .count(conn)
        .await
        .map_err(|e| PeerFlowError::database_operation(format!("统计获得评审数失败: {e}")))
}

/// 作者已获得足够评审时设置 grading_completed_at
///
/// 条件更新只会生效一次，并发重复设置为无害操作。
pub(super) async fn refresh_grading_completed_in<C: ConnectionTrait>(
    conn: &C,
    author_id: i64,
    must_be_graded_by: u32,
    now: DateTime<Utc>,
) -> Result<bool> {
    let graded_by = count_graded_by_in(conn, author_id).await?;
    if graded_by < u64::from(must_be_graded_by) {
        return Ok(false);
    }

    let result = PeerWorkflows::update_many()
        .col_expr(Column::GradingCompletedAt, Expr::value(now.timestamp()))
        .filter(Column::Id.eq(author_id))
        .filter(Column::GradingCompletedAt.is_null())
        .exec(conn)
        .await
        .map_err(|e| PeerFlowError::database_operation(format!("更新评审完成时间失败: {e}")))?;

    Ok(result.rows_affected > 0)
}

impl SeaOrmStorage {
    /// 创建台账
    ///
    /// submission_uuid 上的唯一索引保证每个提交只有一条台账，
    /// 并发创建产生的唯一约束冲突视为成功并返回已有记录。
    pub async fn create_peer_workflow_impl(
        &self,
        student_item: &StudentItem,
        submission_uuid: &str,
        now: DateTime<Utc>,
    ) -> Result<PeerWorkflow> {
        if let Some(existing) = self.get_peer_workflow_by_submission_impl(submission_uuid).await? {
            return Ok(existing);
        }

        let model = ActiveModel {
            student_id: Set(student_item.student_id.clone()),
            course_id: Set(student_item.course_id.clone()),
            item_id: Set(student_item.item_id.clone()),
            submission_uuid: Set(submission_uuid.to_string()),
            created_at: Set(now.timestamp()),
            completed_at: Set(None),
            grading_completed_at: Set(None),
            ..Default::default()
        };

        match model.insert(&self.db).await {
            Ok(created) => Ok(created.into_peer_workflow()),
            Err(e) if is_unique_violation(&e) => self
                .get_peer_workflow_by_submission_impl(submission_uuid)
                .await?
                .ok_or_else(|| PeerFlowError::database_operation("台账创建冲突后未找到记录")),
            Err(e) => Err(PeerFlowError::database_operation(format!("创建台账失败: {e}"))),
        }
    }

    /// 通过提交 UUID 获取台账
    pub async fn get_peer_workflow_by_submission_impl(
        &self,
        submission_uuid: &str,
    ) -> Result<Option<PeerWorkflow>> {
        let result = PeerWorkflows::find()
            .filter(Column::SubmissionUuid.eq(submission_uuid))
            .one(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询台账失败: {e}")))?;

        Ok(result.map(|m| m.into_peer_workflow()))
    }

    /// 通过 ID 获取台账
    pub async fn get_peer_workflow_by_id_impl(
        &self,
        workflow_id: i64,
    ) -> Result<Option<PeerWorkflow>> {
        let result = PeerWorkflows::find_by_id(workflow_id)
            .one(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询台账失败: {e}")))?;

        Ok(result.map(|m| m.into_peer_workflow()))
    }

    /// 标记已完成评审他人
    pub async fn mark_workflow_completed_impl(
        &self,
        workflow_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = PeerWorkflows::update_many()
            .col_expr(Column::CompletedAt, Expr::value(now.timestamp()))
            .filter(Column::Id.eq(workflow_id))
            .filter(Column::CompletedAt.is_null())
            .exec(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("更新完成时间失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    /// 统计评审者已完成的评审数
    pub async fn count_peers_graded_impl(&self, scorer_id: i64) -> Result<u64> {
        PeerWorkflowItems::find()
            .filter(ItemColumn::ScorerId.eq(scorer_id))
            .filter(ItemColumn::AssessmentId.is_not_null())
            .count(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("统计已评审数失败: {e}")))
    }

    /// 统计作者已获得的评审数
    pub async fn count_graded_by_impl(&self, author_id: i64) -> Result<u64> {
        count_graded_by_in(&self.db, author_id).await
    }
}

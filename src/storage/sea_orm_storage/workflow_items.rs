//! 评审租约与选题存储操作
//!
//! 租约过期是惰性的：过期记录不会被删除，只是不再计入“进行中”。

use super::SeaOrmStorage;
use super::peer_workflows::refresh_grading_completed_in;
use crate::entity::peer_workflow_items::{
    ActiveModel, Column, Entity as PeerWorkflowItems, Relation,
};
use crate::entity::peer_workflows::{
    Column as WorkflowColumn, Entity as PeerWorkflows, Model as WorkflowModel,
};
use crate::errors::{PeerFlowError, Result};
use crate::models::peer::entities::{PeerWorkflow, PeerWorkflowItem};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Query, SelectStatement};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Set,
};
use tracing::debug;

/// 评审者已完成评审的作者台账
///
/// 过期未完成的租约不计入，作者可以重新分配给同一评审者。
fn assessed_authors(scorer_id: i64) -> SelectStatement {
    Query::select()
        .column(Column::AuthorId)
        .from(PeerWorkflowItems)
        .and_where(Column::ScorerId.eq(scorer_id))
        .and_where(Column::AssessmentId.is_not_null())
        .to_owned()
}

/// 同一课程作答项中、不属于评审者本人且尚未被其评审过的台账
///
/// 本人按学生判断，同一学生的其他提交次数也不会分配给自己。
fn same_item_candidates(scorer: &PeerWorkflow) -> Select<PeerWorkflows> {
    PeerWorkflows::find()
        .filter(WorkflowColumn::CourseId.eq(scorer.course_id.as_str()))
        .filter(WorkflowColumn::ItemId.eq(scorer.item_id.as_str()))
        .filter(WorkflowColumn::Id.ne(scorer.id))
        .filter(WorkflowColumn::StudentId.ne(scorer.student_id.as_str()))
        .filter(WorkflowColumn::Id.not_in_subquery(assessed_authors(scorer.id)))
}

/// 关闭评审者对某提交最近的一条未完成租约
///
/// 找不到可关闭的租约时返回流程错误。关闭后重新检查作者是否已获得足够评审。
pub(super) async fn close_active_assessment_in<C: ConnectionTrait>(
    conn: &C,
    scorer_id: i64,
    submission_uuid: &str,
    assessment_id: i64,
    must_be_graded_by: u32,
    now: DateTime<Utc>,
) -> Result<PeerWorkflowItem> {
    let open = PeerWorkflowItems::find()
        .filter(Column::ScorerId.eq(scorer_id))
        .filter(Column::SubmissionUuid.eq(submission_uuid))
        .filter(Column::AssessmentId.is_null())
        .order_by_desc(Column::StartedAt)
        .order_by_desc(Column::Id)
        .one(conn)
        .await
        .map_err(|e| PeerFlowError::database_operation(format!("查询评审租约失败: {e}")))?
        .ok_or_else(|| {
            PeerFlowError::workflow(format!(
                "No open assessment for scorer {scorer_id} on submission {submission_uuid}"
            ))
        })?;

    let author_id = open.author_id;
    let mut active = open.into_active_model();
    active.assessment_id = Set(Some(assessment_id));
    let closed = active
        .update(conn)
        .await
        .map_err(|e| PeerFlowError::database_operation(format!("关闭评审租约失败: {e}")))?;

    refresh_grading_completed_in(conn, author_id, must_be_graded_by, now).await?;

    Ok(closed.into_peer_workflow_item())
}

impl SeaOrmStorage {
    /// 查找评审者仍在有效期内的未完成租约（最近开始的一条）
    pub async fn find_active_item_impl(
        &self,
        scorer_id: i64,
        lease_start: DateTime<Utc>,
    ) -> Result<Option<PeerWorkflowItem>> {
        let result = PeerWorkflowItems::find()
            .join(JoinType::InnerJoin, Relation::Author.def())
            .filter(Column::ScorerId.eq(scorer_id))
            .filter(Column::AssessmentId.is_null())
            .filter(Column::StartedAt.gt(lease_start.timestamp()))
            .filter(WorkflowColumn::GradingCompletedAt.is_null())
            .order_by_desc(Column::StartedAt)
            .order_by_desc(Column::Id)
            .one(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询进行中租约失败: {e}")))?;

        Ok(result.map(|m| m.into_peer_workflow_item()))
    }

    /// 评审者最近开始的未完成租约
    ///
    /// 提交评审时使用，过期租约仍可提交。
    pub async fn find_latest_open_item_impl(
        &self,
        scorer_id: i64,
    ) -> Result<Option<PeerWorkflowItem>> {
        let result = PeerWorkflowItems::find()
            .filter(Column::ScorerId.eq(scorer_id))
            .filter(Column::AssessmentId.is_null())
            .order_by_desc(Column::StartedAt)
            .order_by_desc(Column::Id)
            .one(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询未完成租约失败: {e}")))?;

        Ok(result.map(|m| m.into_peer_workflow_item()))
    }

    /// 覆盖队列
    ///
    /// 按台账创建顺序选取第一个“已完成评审数 + 有效租约数”不足要求的提交。
    pub async fn find_submission_for_review_impl(
        &self,
        scorer: &PeerWorkflow,
        must_be_graded_by: u32,
        lease_start: DateTime<Utc>,
    ) -> Result<Option<String>> {
        let coverage = Expr::cust_with_values(
            "(SELECT COUNT(*) FROM peer_workflow_items \
             WHERE peer_workflow_items.author_id = peer_workflows.id \
             AND (peer_workflow_items.assessment_id IS NOT NULL \
             OR peer_workflow_items.started_at > ?)) < ?",
            [lease_start.timestamp(), i64::from(must_be_graded_by)],
        );

        let result = same_item_candidates(scorer)
            .filter(WorkflowColumn::GradingCompletedAt.is_null())
            .filter(coverage)
            .order_by_asc(WorkflowColumn::CreatedAt)
            .order_by_asc(WorkflowColumn::Id)
            .one(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询待评审提交失败: {e}")))?;

        debug!(
            "Coverage queue for workflow {} returned {:?}",
            scorer.id,
            result.as_ref().map(|m| m.id)
        );

        Ok(result.map(|m| m.submission_uuid))
    }

    /// 超额评审候选数量
    pub async fn count_over_grading_candidates_impl(&self, scorer: &PeerWorkflow) -> Result<u64> {
        same_item_candidates(scorer)
            .count(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("统计超额评审候选失败: {e}")))
    }

    /// 按偏移量获取超额评审候选
    pub async fn find_over_grading_candidate_impl(
        &self,
        scorer: &PeerWorkflow,
        offset: u64,
    ) -> Result<Option<String>> {
        let result: Option<WorkflowModel> = same_item_candidates(scorer)
            .order_by_asc(WorkflowColumn::CreatedAt)
            .order_by_asc(WorkflowColumn::Id)
            .offset(offset)
            .limit(1)
            .one(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询超额评审候选失败: {e}")))?;

        Ok(result.map(|m| m.submission_uuid))
    }

    /// 创建或刷新租约
    ///
    /// 同一对 (评审者, 作者) 已有记录时刷新最近一条的开始时间，否则新建。
    pub async fn create_workflow_item_impl(
        &self,
        scorer_id: i64,
        author: &PeerWorkflow,
        now: DateTime<Utc>,
    ) -> Result<PeerWorkflowItem> {
        let existing = PeerWorkflowItems::find()
            .filter(Column::ScorerId.eq(scorer_id))
            .filter(Column::AuthorId.eq(author.id))
            .filter(Column::SubmissionUuid.eq(author.submission_uuid.as_str()))
            .order_by_desc(Column::StartedAt)
            .order_by_desc(Column::Id)
            .one(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询评审租约失败: {e}")))?;

        let model = match existing {
            Some(item) => {
                let mut active = item.into_active_model();
                active.started_at = Set(now.timestamp());
                active.update(&self.db).await.map_err(|e| {
                    PeerFlowError::database_operation(format!("刷新评审租约失败: {e}"))
                })?
            }
            None => {
                let active = ActiveModel {
                    scorer_id: Set(scorer_id),
                    author_id: Set(author.id),
                    submission_uuid: Set(author.submission_uuid.clone()),
                    started_at: Set(now.timestamp()),
                    assessment_id: Set(None),
                    scored: Set(false),
                    ..Default::default()
                };
                active.insert(&self.db).await.map_err(|e| {
                    PeerFlowError::database_operation(format!("创建评审租约失败: {e}"))
                })?
            }
        };

        Ok(model.into_peer_workflow_item())
    }

    /// 列出评审者对某提交的全部租约
    pub async fn list_workflow_items_impl(
        &self,
        scorer_id: i64,
        submission_uuid: &str,
    ) -> Result<Vec<PeerWorkflowItem>> {
        let items = PeerWorkflowItems::find()
            .filter(Column::ScorerId.eq(scorer_id))
            .filter(Column::SubmissionUuid.eq(submission_uuid))
            .order_by_desc(Column::StartedAt)
            .order_by_desc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询评审租约列表失败: {e}")))?;

        Ok(items
            .into_iter()
            .map(|m| m.into_peer_workflow_item())
            .collect())
    }

    /// 关闭进行中的租约
    pub async fn close_active_assessment_impl(
        &self,
        scorer_id: i64,
        submission_uuid: &str,
        assessment_id: i64,
        must_be_graded_by: u32,
        now: DateTime<Utc>,
    ) -> Result<PeerWorkflowItem> {
        close_active_assessment_in(
            &self.db,
            scorer_id,
            submission_uuid,
            assessment_id,
            must_be_graded_by,
            now,
        )
        .await
    }
}

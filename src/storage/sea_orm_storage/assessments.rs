//! 互评记录存储操作

use std::collections::HashMap;

use super::SeaOrmStorage;
use super::workflow_items::close_active_assessment_in;
use crate::entity::assessment_parts::{
    ActiveModel as PartActiveModel, Column as PartColumn, Entity as AssessmentParts,
};
use crate::entity::assessments::{ActiveModel, Column, Entity as Assessments, Model};
use crate::entity::peer_workflow_items::{Column as ItemColumn, Entity as PeerWorkflowItems};
use crate::errors::{PeerFlowError, Result};
use crate::models::assessments::entities::{Assessment, AssessmentPart, NewAssessment};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::info;

/// 为评审记录加载明细
async fn attach_parts<C: ConnectionTrait>(conn: &C, models: Vec<Model>) -> Result<Vec<Assessment>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = models.iter().map(|m| m.id).collect();
    let parts = AssessmentParts::find()
        .filter(PartColumn::AssessmentId.is_in(ids))
        .order_by_asc(PartColumn::Id)
        .all(conn)
        .await
        .map_err(|e| PeerFlowError::database_operation(format!("查询评审明细失败: {e}")))?;

    let mut grouped: HashMap<i64, Vec<AssessmentPart>> = HashMap::new();
    for part in parts {
        grouped
            .entry(part.assessment_id)
            .or_default()
            .push(part.into_part());
    }

    Ok(models
        .into_iter()
        .map(|m| {
            let parts = grouped.remove(&m.id).unwrap_or_default();
            m.into_assessment(parts)
        })
        .collect())
}

/// 按给定 ID 顺序加载评审记录
async fn load_in_order<C: ConnectionTrait>(conn: &C, ids: Vec<i64>) -> Result<Vec<Assessment>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let models = Assessments::find()
        .filter(Column::Id.is_in(ids.clone()))
        .all(conn)
        .await
        .map_err(|e| PeerFlowError::database_operation(format!("查询评审记录失败: {e}")))?;

    let mut by_id: HashMap<i64, Model> = models.into_iter().map(|m| (m.id, m)).collect();
    let ordered = ids.iter().filter_map(|id| by_id.remove(id)).collect();
    attach_parts(conn, ordered).await
}

impl SeaOrmStorage {
    /// 写入一条互评
    ///
    /// 评审记录、明细、关闭租约与作者完成状态在同一事务中提交。
    pub async fn create_peer_assessment_impl(
        &self,
        scorer_id: i64,
        assessment: NewAssessment,
        must_be_graded_by: u32,
        now: DateTime<Utc>,
    ) -> Result<Assessment> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("开启事务失败: {e}")))?;

        let model = ActiveModel {
            submission_uuid: Set(assessment.submission_uuid.clone()),
            rubric_id: Set(assessment.rubric_id),
            scorer_id: Set(assessment.scorer_id.clone()),
            score_type: Set(Assessment::PEER_TYPE.to_string()),
            scored_at: Set(assessment.scored_at.timestamp()),
            feedback: Set(assessment.feedback.clone()),
            ..Default::default()
        };

        let created = model
            .insert(&txn)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("创建评审记录失败: {e}")))?;

        if !assessment.parts.is_empty() {
            let parts = assessment.parts.iter().map(|part| PartActiveModel {
                assessment_id: Set(created.id),
                criterion_id: Set(part.criterion_id),
                option_id: Set(part.option_id),
                feedback: Set(part.feedback.clone()),
                ..Default::default()
            });
            AssessmentParts::insert_many(parts)
                .exec(&txn)
                .await
                .map_err(|e| PeerFlowError::database_operation(format!("创建评审明细失败: {e}")))?;
        }

        let item = close_active_assessment_in(
            &txn,
            scorer_id,
            &assessment.submission_uuid,
            created.id,
            must_be_graded_by,
            now,
        )
        .await?;

        txn.commit()
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("提交事务失败: {e}")))?;

        info!(
            "Assessment {} created by workflow {} for submission {} (item {})",
            created.id, scorer_id, assessment.submission_uuid, item.id
        );

        Ok(created.into_assessment(assessment.parts))
    }

    /// 通过 ID 获取评审
    pub async fn get_assessment_impl(&self, assessment_id: i64) -> Result<Option<Assessment>> {
        let result = Assessments::find_by_id(assessment_id)
            .one(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询评审记录失败: {e}")))?;

        match result {
            Some(model) => Ok(attach_parts(&self.db, vec![model]).await?.pop()),
            None => Ok(None),
        }
    }

    /// 列出某提交收到的全部互评（最新在前）
    pub async fn list_assessments_for_submission_impl(
        &self,
        submission_uuid: &str,
        limit: Option<u64>,
    ) -> Result<Vec<Assessment>> {
        let models = Assessments::find()
            .filter(Column::SubmissionUuid.eq(submission_uuid))
            .filter(Column::ScoreType.eq(Assessment::PEER_TYPE))
            .order_by_desc(Column::ScoredAt)
            .order_by_desc(Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询评审列表失败: {e}")))?;

        attach_parts(&self.db, models).await
    }

    /// 列出作者计分的互评（按评审 ID 升序）
    pub async fn list_scored_assessments_impl(
        &self,
        author_id: i64,
        limit: Option<u64>,
    ) -> Result<Vec<Assessment>> {
        let items = PeerWorkflowItems::find()
            .filter(ItemColumn::AuthorId.eq(author_id))
            .filter(ItemColumn::Scored.eq(true))
            .filter(ItemColumn::AssessmentId.is_not_null())
            .order_by_asc(ItemColumn::AssessmentId)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询计分评审失败: {e}")))?;

        let ids = items.into_iter().filter_map(|i| i.assessment_id).collect();
        load_in_order(&self.db, ids).await
    }

    /// 列出评审者给出的互评（最新在前）
    pub async fn list_assessments_by_scorer_impl(
        &self,
        scorer_id: i64,
        scored_only: bool,
        limit: Option<u64>,
    ) -> Result<Vec<Assessment>> {
        let mut select = PeerWorkflowItems::find()
            .filter(ItemColumn::ScorerId.eq(scorer_id))
            .filter(ItemColumn::AssessmentId.is_not_null());

        if scored_only {
            select = select.filter(ItemColumn::Scored.eq(true));
        }

        let items = select
            .order_by_desc(ItemColumn::AssessmentId)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询已提交评审失败: {e}")))?;

        let ids = items.into_iter().filter_map(|i| i.assessment_id).collect();
        load_in_order(&self.db, ids).await
    }

    /// 获取某提交最近的一条评审
    pub async fn get_latest_assessment_impl(
        &self,
        submission_uuid: &str,
    ) -> Result<Option<Assessment>> {
        Ok(self
            .list_assessments_for_submission_impl(submission_uuid, Some(1))
            .await?
            .pop())
    }

    /// 标记计分评审
    ///
    /// 已计分数量不足 N 时，按评审 ID 从小到大补足。返回标记后的计分总数。
    pub async fn flag_scored_items_impl(&self, author_id: i64, must_be_graded_by: u32) -> Result<u64> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("开启事务失败: {e}")))?;

        let target = u64::from(must_be_graded_by);
        let already = PeerWorkflowItems::find()
            .filter(ItemColumn::AuthorId.eq(author_id))
            .filter(ItemColumn::Scored.eq(true))
            .count(&txn)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("统计计分评审失败: {e}")))?;

        if already >= target {
            txn.commit()
                .await
                .map_err(|e| PeerFlowError::database_operation(format!("提交事务失败: {e}")))?;
            return Ok(already);
        }

        let candidates: Vec<i64> = PeerWorkflowItems::find()
            .filter(ItemColumn::AuthorId.eq(author_id))
            .filter(ItemColumn::Scored.eq(false))
            .filter(ItemColumn::AssessmentId.is_not_null())
            .order_by_asc(ItemColumn::AssessmentId)
            .order_by_asc(ItemColumn::Id)
            .limit(target - already)
            .all(&txn)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询待计分评审失败: {e}")))?
            .into_iter()
            .map(|item| item.id)
            .collect();

        let flagged = if candidates.is_empty() {
            0
        } else {
            PeerWorkflowItems::update_many()
                .col_expr(ItemColumn::Scored, Expr::value(true))
                .filter(ItemColumn::Id.is_in(candidates))
                .exec(&txn)
                .await
                .map_err(|e| PeerFlowError::database_operation(format!("标记计分评审失败: {e}")))?
                .rows_affected
        };

        txn.commit()
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(already + flagged)
    }

    /// 统计已计分的评审数量
    pub async fn count_scored_items_impl(&self, author_id: i64) -> Result<u64> {
        PeerWorkflowItems::find()
            .filter(ItemColumn::AuthorId.eq(author_id))
            .filter(ItemColumn::Scored.eq(true))
            .filter(ItemColumn::AssessmentId.is_not_null())
            .count(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("统计计分评审失败: {e}")))
    }
}

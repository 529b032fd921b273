use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::{
    assessments::entities::{Assessment, AssessmentFeedback, NewAssessment},
    peer::entities::{PeerWorkflow, PeerWorkflowItem},
    rubrics::entities::{Rubric, RubricDefinition},
    submissions::{
        entities::{StudentItem, Submission},
        requests::CreateSubmissionRequest,
        responses::SubmissionWithStudent,
    },
};

use crate::errors::Result;

pub mod sea_orm_storage;

/// 提交存储接口（外部协作方）
///
/// 未找到时返回 `PeerFlowError::NotFound`，与数据库错误区分。
#[async_trait::async_trait]
pub trait SubmissionApi: Send + Sync {
    // 创建提交（now 为入库时间，未指定提交时间时也作为提交时间）
    async fn create_submission(
        &self,
        req: CreateSubmissionRequest,
        now: DateTime<Utc>,
    ) -> Result<Submission>;
    // 通过 UUID 获取提交
    async fn get_submission(&self, submission_uuid: &str) -> Result<Submission>;
    // 通过 UUID 获取提交及学生信息
    async fn get_submission_and_student(
        &self,
        submission_uuid: &str,
    ) -> Result<SubmissionWithStudent>;
}

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 互评台账方法
    // 创建台账（并发重复创建时返回已有记录）
    async fn create_peer_workflow(
        &self,
        student_item: &StudentItem,
        submission_uuid: &str,
        now: DateTime<Utc>,
    ) -> Result<PeerWorkflow>;
    // 通过提交 UUID 获取台账
    async fn get_peer_workflow_by_submission(
        &self,
        submission_uuid: &str,
    ) -> Result<Option<PeerWorkflow>>;
    // 通过 ID 获取台账
    async fn get_peer_workflow_by_id(&self, workflow_id: i64) -> Result<Option<PeerWorkflow>>;
    // 标记已完成评审他人（只设置一次）
    async fn mark_workflow_completed(&self, workflow_id: i64, now: DateTime<Utc>) -> Result<bool>;
    // 统计已完成的评审数量（作为评审者）
    async fn count_peers_graded(&self, scorer_id: i64) -> Result<u64>;
    // 统计已获得的评审数量（作为作者）
    async fn count_graded_by(&self, author_id: i64) -> Result<u64>;

    /// 评审租约与选题方法
    // 查找评审者仍在有效期内的未完成租约
    async fn find_active_item(
        &self,
        scorer_id: i64,
        lease_start: DateTime<Utc>,
    ) -> Result<Option<PeerWorkflowItem>>;
    // 评审者最近开始的未完成租约（不考虑过期）
    async fn find_latest_open_item(&self, scorer_id: i64) -> Result<Option<PeerWorkflowItem>>;
    // 覆盖队列：按创建顺序选取评审数不足的提交
    async fn find_submission_for_review(
        &self,
        scorer: &PeerWorkflow,
        must_be_graded_by: u32,
        lease_start: DateTime<Utc>,
    ) -> Result<Option<String>>;
    // 超额评审候选数量
    async fn count_over_grading_candidates(&self, scorer: &PeerWorkflow) -> Result<u64>;
    // 按偏移量获取超额评审候选
    async fn find_over_grading_candidate(
        &self,
        scorer: &PeerWorkflow,
        offset: u64,
    ) -> Result<Option<String>>;
    // 创建或刷新租约
    async fn create_workflow_item(
        &self,
        scorer_id: i64,
        author: &PeerWorkflow,
        now: DateTime<Utc>,
    ) -> Result<PeerWorkflowItem>;
    // 列出评审者对某提交的全部租约（按开始时间倒序）
    async fn list_workflow_items(
        &self,
        scorer_id: i64,
        submission_uuid: &str,
    ) -> Result<Vec<PeerWorkflowItem>>;
    // 将评审挂到最近的未完成租约上，并检查作者是否已获得足够评审
    async fn close_active_assessment(
        &self,
        scorer_id: i64,
        submission_uuid: &str,
        assessment_id: i64,
        must_be_graded_by: u32,
        now: DateTime<Utc>,
    ) -> Result<PeerWorkflowItem>;

    /// 评审记录方法
    // 在同一事务中写入评审、明细并关闭租约
    async fn create_peer_assessment(
        &self,
        scorer_id: i64,
        assessment: NewAssessment,
        must_be_graded_by: u32,
        now: DateTime<Utc>,
    ) -> Result<Assessment>;
    // 通过 ID 获取评审
    async fn get_assessment(&self, assessment_id: i64) -> Result<Option<Assessment>>;
    // 列出某提交收到的全部互评（最新在前）
    async fn list_assessments_for_submission(
        &self,
        submission_uuid: &str,
        limit: Option<u64>,
    ) -> Result<Vec<Assessment>>;
    // 列出某作者计分的互评（按评审顺序）
    async fn list_scored_assessments(
        &self,
        author_id: i64,
        limit: Option<u64>,
    ) -> Result<Vec<Assessment>>;
    // 列出评审者给出的互评（最新在前）
    async fn list_assessments_by_scorer(
        &self,
        scorer_id: i64,
        scored_only: bool,
        limit: Option<u64>,
    ) -> Result<Vec<Assessment>>;
    // 获取某提交最近的一条评审
    async fn get_latest_assessment(&self, submission_uuid: &str) -> Result<Option<Assessment>>;
    // 将最早的 N 条已完成评审标记为计分（幂等，总数不超过 N）
    async fn flag_scored_items(&self, author_id: i64, must_be_graded_by: u32) -> Result<u64>;
    // 统计已计分的评审数量
    async fn count_scored_items(&self, author_id: i64) -> Result<u64>;

    /// 评分标准方法
    async fn get_rubric_by_hash(&self, content_hash: &str) -> Result<Option<Rubric>>;
    async fn get_rubric_by_id(&self, rubric_id: i64) -> Result<Option<Rubric>>;
    // 创建评分标准（哈希冲突时返回已有记录）
    async fn create_rubric(
        &self,
        definition: &RubricDefinition,
        content_hash: &str,
    ) -> Result<Rubric>;

    /// 评审反馈方法
    async fn get_assessment_feedback(
        &self,
        submission_uuid: &str,
    ) -> Result<Option<AssessmentFeedback>>;
    async fn upsert_assessment_feedback(
        &self,
        submission_uuid: &str,
        feedback_text: Option<String>,
        options: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<AssessmentFeedback>;
}

pub async fn create_storage() -> Result<Arc<sea_orm_storage::SeaOrmStorage>> {
    let storage = sea_orm_storage::SeaOrmStorage::new_async().await?;
    Ok(Arc::new(storage))
}

//! 台账与进度

use tracing::{debug, info};

use super::{PeerAssessmentService, log_failure};
use crate::errors::{PeerFlowError, Result};
use crate::models::peer::{
    entities::{PeerRequirements, PeerStatus, PeerWorkflow, PeerWorkflowItem},
    responses::PeerStatusResponse,
};
use crate::utils::validate_student_item;

impl PeerAssessmentService {
    /// 学生进入互评环节时创建台账（重复调用返回已有台账）
    pub async fn on_start(&self, submission_uuid: &str) -> Result<PeerWorkflow> {
        self.on_start_inner(submission_uuid)
            .await
            .inspect_err(|e| log_failure("on_start", e))
    }

    async fn on_start_inner(&self, submission_uuid: &str) -> Result<PeerWorkflow> {
        if let Some(existing) = self.find_workflow(submission_uuid).await? {
            return Ok(existing);
        }

        let found = self
            .submissions
            .get_submission_and_student(submission_uuid)
            .await?;
        validate_student_item(&found.student_item).map_err(PeerFlowError::request)?;

        let workflow = self
            .storage
            .create_peer_workflow(&found.student_item, submission_uuid, self.now())
            .await?;

        info!(
            "Peer workflow {} started for submission {}",
            workflow.id, submission_uuid
        );
        Ok(workflow)
    }

    /// 显式创建（或刷新）评审租约
    pub async fn create_peer_workflow_item(
        &self,
        scorer_submission_uuid: &str,
        submission_uuid: &str,
    ) -> Result<PeerWorkflowItem> {
        self.create_peer_workflow_item_inner(scorer_submission_uuid, submission_uuid)
            .await
            .inspect_err(|e| log_failure("create_peer_workflow_item", e))
    }

    async fn create_peer_workflow_item_inner(
        &self,
        scorer_submission_uuid: &str,
        submission_uuid: &str,
    ) -> Result<PeerWorkflowItem> {
        let scorer = self.require_workflow(scorer_submission_uuid).await?;
        let author = self.require_workflow(submission_uuid).await?;

        if scorer.id == author.id || scorer.student_id == author.student_id {
            return Err(PeerFlowError::request(
                "A learner cannot be assigned their own submission",
            ));
        }

        let item = self
            .storage
            .create_workflow_item(scorer.id, &author, self.now())
            .await?;

        info!(
            "Lease {} granted to workflow {} on submission {}",
            item.id, scorer.id, submission_uuid
        );
        Ok(item)
    }

    /// 学生是否已完成要求数量的互评
    ///
    /// 首次满足时记录 completed_at，之后直接返回。
    pub async fn submitter_is_finished(
        &self,
        submission_uuid: &str,
        requirements: PeerRequirements,
    ) -> Result<bool> {
        self.submitter_is_finished_inner(submission_uuid, requirements)
            .await
            .inspect_err(|e| log_failure("submitter_is_finished", e))
    }

    async fn submitter_is_finished_inner(
        &self,
        submission_uuid: &str,
        requirements: PeerRequirements,
    ) -> Result<bool> {
        let Some(workflow) = self.find_workflow(submission_uuid).await? else {
            return Ok(false);
        };
        if workflow.completed_at.is_some() {
            return Ok(true);
        }

        let peers_graded = self.storage.count_peers_graded(workflow.id).await?;
        if peers_graded < u64::from(requirements.must_grade) {
            return Ok(false);
        }

        if self
            .storage
            .mark_workflow_completed(workflow.id, self.now())
            .await?
        {
            info!(
                "Workflow {} finished grading ({} peers graded)",
                workflow.id, peers_graded
            );
        }
        Ok(true)
    }

    /// 提交是否已获得足够的互评
    pub async fn assessment_is_finished(
        &self,
        submission_uuid: &str,
        requirements: PeerRequirements,
    ) -> Result<bool> {
        let graded_by = self.get_graded_by_count(submission_uuid).await?;
        Ok(graded_by >= u64::from(requirements.must_be_graded_by))
    }

    /// 返回 (是否已完成要求数量的互评, 已完成数量)
    pub async fn has_finished_required_evaluating(
        &self,
        submission_uuid: &str,
        must_grade: u32,
    ) -> Result<(bool, u64)> {
        self.has_finished_required_evaluating_inner(submission_uuid, must_grade)
            .await
            .inspect_err(|e| log_failure("has_finished_required_evaluating", e))
    }

    async fn has_finished_required_evaluating_inner(
        &self,
        submission_uuid: &str,
        must_grade: u32,
    ) -> Result<(bool, u64)> {
        let Some(workflow) = self.find_workflow(submission_uuid).await? else {
            return Ok((false, 0));
        };
        let peers_graded = self.storage.count_peers_graded(workflow.id).await?;
        Ok((peers_graded >= u64::from(must_grade), peers_graded))
    }

    /// 提交已获得的完成评审数
    pub async fn get_graded_by_count(&self, submission_uuid: &str) -> Result<u64> {
        self.get_graded_by_count_inner(submission_uuid)
            .await
            .inspect_err(|e| log_failure("get_graded_by_count", e))
    }

    async fn get_graded_by_count_inner(&self, submission_uuid: &str) -> Result<u64> {
        match self.find_workflow(submission_uuid).await? {
            Some(workflow) => self.storage.count_graded_by(workflow.id).await,
            None => Ok(0),
        }
    }

    /// 互评进度
    pub async fn get_status(
        &self,
        submission_uuid: &str,
        requirements: PeerRequirements,
    ) -> Result<PeerStatusResponse> {
        self.get_status_inner(submission_uuid, requirements)
            .await
            .inspect_err(|e| log_failure("get_status", e))
    }

    async fn get_status_inner(
        &self,
        submission_uuid: &str,
        requirements: PeerRequirements,
    ) -> Result<PeerStatusResponse> {
        let workflow = self.require_workflow(submission_uuid).await?;
        let submitter_finished = self
            .submitter_is_finished_inner(submission_uuid, requirements)
            .await?;
        let peers_graded = self.storage.count_peers_graded(workflow.id).await?;
        let graded_by = self.storage.count_graded_by(workflow.id).await?;
        let assessment_finished = graded_by >= u64::from(requirements.must_be_graded_by);
        let status = PeerStatus::derive(submitter_finished, assessment_finished);

        debug!("Workflow {} status: {}", workflow.id, status);

        Ok(PeerStatusResponse {
            submission_uuid: submission_uuid.to_string(),
            status,
            submitter_finished,
            assessment_finished,
            peers_graded,
            graded_by,
        })
    }
}

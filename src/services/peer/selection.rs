//! 选择下一份待评提交
//!
//! 顺序：继续进行中的租约 -> 覆盖队列 -> 超额评审。

use rand::Rng;
use tracing::{debug, info};

use super::{PeerAssessmentService, log_failure};
use crate::errors::{PeerFlowError, Result};
use crate::models::{peer::entities::PeerWorkflow, submissions::entities::Submission};

impl PeerAssessmentService {
    /// 为评审者选择一份提交并发放租约
    ///
    /// 没有可评的提交时返回 `None`。未完成评审前重复调用返回同一份提交。
    pub async fn get_submission_to_assess(
        &self,
        reviewer_submission_uuid: &str,
        must_be_graded_by: u32,
    ) -> Result<Option<Submission>> {
        self.get_submission_to_assess_inner(reviewer_submission_uuid, must_be_graded_by)
            .await
            .inspect_err(|e| log_failure("get_submission_to_assess", e))
    }

    async fn get_submission_to_assess_inner(
        &self,
        reviewer_submission_uuid: &str,
        must_be_graded_by: u32,
    ) -> Result<Option<Submission>> {
        let reviewer = self.require_workflow(reviewer_submission_uuid).await?;
        let now = self.now();

        let Some(submission_uuid) = self
            .select_for_review(&reviewer, must_be_graded_by, now)
            .await?
        else {
            debug!("No submission available for workflow {}", reviewer.id);
            return Ok(None);
        };

        let author = self
            .storage
            .get_peer_workflow_by_submission(&submission_uuid)
            .await?
            .ok_or_else(|| {
                PeerFlowError::internal(format!(
                    "Selected submission {submission_uuid} has no peer workflow"
                ))
            })?;

        let item = self
            .storage
            .create_workflow_item(reviewer.id, &author, now)
            .await?;
        info!(
            "Lease {} granted to workflow {} on submission {}",
            item.id, reviewer.id, submission_uuid
        );

        let submission = self.submissions.get_submission(&submission_uuid).await?;
        Ok(Some(submission))
    }

    async fn select_for_review(
        &self,
        reviewer: &PeerWorkflow,
        must_be_graded_by: u32,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Option<String>> {
        let lease_start = self.lease_start(now);

        if let Some(item) = self
            .storage
            .find_active_item(reviewer.id, lease_start)
            .await?
        {
            debug!(
                "Workflow {} resumes lease {} on {}",
                reviewer.id, item.id, item.submission_uuid
            );
            return Ok(Some(item.submission_uuid));
        }

        if let Some(submission_uuid) = self
            .storage
            .find_submission_for_review(reviewer, must_be_graded_by, lease_start)
            .await?
        {
            debug!(
                "Workflow {} takes {} from the coverage queue",
                reviewer.id, submission_uuid
            );
            return Ok(Some(submission_uuid));
        }

        self.select_for_over_grading(reviewer).await
    }

    /// 从同一作答项中随机选择一份未分配过的提交
    async fn select_for_over_grading(&self, reviewer: &PeerWorkflow) -> Result<Option<String>> {
        let candidates = self
            .storage
            .count_over_grading_candidates(reviewer)
            .await?;
        if candidates == 0 {
            return Ok(None);
        }

        let offset = rand::rng().random_range(0..candidates);
        let picked = match self
            .storage
            .find_over_grading_candidate(reviewer, offset)
            .await?
        {
            Some(found) => Some(found),
            // 统计与查询之间候选减少时退回第一个
            None => {
                self.storage
                    .find_over_grading_candidate(reviewer, 0)
                    .await?
            }
        };

        debug!(
            "Workflow {} over-grades {:?} (offset {} of {})",
            reviewer.id, picked, offset, candidates
        );
        Ok(picked)
    }
}

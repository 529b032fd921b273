//! 互评流程服务
//!
//! 所有协调都通过数据库完成，服务本身无状态，可以在多个进程中同时运行。
//! 每个学生的派生状态为 `grading` -> `waiting_for_peers` -> `done`，不落库、不可回退。

pub mod assessment;
pub mod feedback;
pub mod scoring;
pub mod selection;
pub mod workflow;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, warn};

use crate::cache::ObjectCache;
use crate::config::PeerConfig;
use crate::errors::{ErrorCategory, PeerFlowError, Result};
use crate::models::peer::entities::PeerWorkflow;
use crate::services::rubric_index::RubricIndex;
use crate::storage::{Storage, SubmissionApi};
use crate::utils::{Clock, validate_submission_uuid};

/// 互评流程参数
#[derive(Debug, Clone)]
pub struct PeerSettings {
    // 评审租约有效期
    pub time_limit: Duration,
    pub max_feedback_chars: usize,
    pub max_feedback_options: usize,
}

impl Default for PeerSettings {
    fn default() -> Self {
        Self {
            time_limit: Duration::hours(8),
            max_feedback_chars: 102_400,
            max_feedback_options: 32,
        }
    }
}

impl PeerSettings {
    pub fn from_config(config: &PeerConfig) -> Self {
        Self {
            time_limit: Duration::hours(config.time_limit_hours),
            max_feedback_chars: config.max_feedback_chars,
            max_feedback_options: config.max_feedback_options,
        }
    }
}

pub struct PeerAssessmentService {
    storage: Arc<dyn Storage>,
    submissions: Arc<dyn SubmissionApi>,
    rubrics: RubricIndex,
    settings: PeerSettings,
    clock: Arc<dyn Clock>,
}

impl PeerAssessmentService {
    pub fn new(
        storage: Arc<dyn Storage>,
        submissions: Arc<dyn SubmissionApi>,
        cache: Arc<dyn ObjectCache>,
        settings: PeerSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rubrics: RubricIndex::new(storage.clone(), cache),
            storage,
            submissions,
            settings,
            clock,
        }
    }

    pub fn settings(&self) -> &PeerSettings {
        &self.settings
    }

    pub fn rubrics(&self) -> &RubricIndex {
        &self.rubrics
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// 租约有效期起点：此时间之后开始的租约视为进行中
    pub(crate) fn lease_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.settings.time_limit
    }

    pub(crate) async fn find_workflow(&self, submission_uuid: &str) -> Result<Option<PeerWorkflow>> {
        validate_submission_uuid(submission_uuid).map_err(PeerFlowError::request)?;
        self.storage
            .get_peer_workflow_by_submission(submission_uuid)
            .await
    }

    /// 获取台账，不存在时返回流程错误
    pub(crate) async fn require_workflow(&self, submission_uuid: &str) -> Result<PeerWorkflow> {
        self.find_workflow(submission_uuid).await?.ok_or_else(|| {
            PeerFlowError::workflow(format!(
                "No peer workflow found for submission {submission_uuid}"
            ))
        })
    }
}

/// 按错误分类记录日志
pub(crate) fn log_failure(operation: &str, err: &PeerFlowError) {
    match err.category() {
        ErrorCategory::Internal => error!("{} failed: {}", operation, err),
        ErrorCategory::Workflow => warn!("{} refused: {}", operation, err),
        ErrorCategory::Request => {}
    }
}

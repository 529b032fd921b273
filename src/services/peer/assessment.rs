//! 提交与查询互评

use std::collections::{BTreeMap, HashMap};

use tracing::info;

use super::{PeerAssessmentService, log_failure};
use crate::errors::{PeerFlowError, Result};
use crate::models::{
    assessments::{
        entities::{Assessment, AssessmentPart, NewAssessment},
        responses::{AssessmentDetail, AssessmentPartDetail},
    },
    peer::requests::CreateAssessmentRequest,
    rubrics::entities::Rubric,
};
use crate::utils::{truncate_chars, validate_submission_uuid};

/// 按评分标准展开评审记录
pub(crate) fn describe_assessment(assessment: &Assessment, rubric: &Rubric) -> AssessmentDetail {
    let parts: Vec<AssessmentPartDetail> = assessment
        .parts
        .iter()
        .filter_map(|part| {
            let criterion = rubric.find_criterion(part.criterion_id)?;
            let option = part
                .option_id
                .and_then(|id| criterion.options.iter().find(|o| o.id == id));
            Some(AssessmentPartDetail {
                criterion: criterion.name.clone(),
                criterion_label: criterion.label.clone(),
                option: option.map(|o| o.name.clone()),
                option_label: option.map(|o| o.label.clone()),
                points: option.map(|o| o.points),
                points_possible: criterion.points_possible(),
                feedback: part.feedback.clone(),
            })
        })
        .collect();

    AssessmentDetail {
        id: assessment.id,
        submission_uuid: assessment.submission_uuid.clone(),
        scorer_id: assessment.scorer_id.clone(),
        score_type: assessment.score_type.clone(),
        scored_at: assessment.scored_at,
        feedback: assessment.feedback.clone(),
        rubric_content_hash: rubric.content_hash.clone(),
        points_earned: parts.iter().filter_map(|p| p.points).sum(),
        points_possible: rubric.points_possible(),
        parts,
    }
}

impl PeerAssessmentService {
    /// 批量展开评审记录，同一评分标准只加载一次
    pub(crate) async fn describe_all(
        &self,
        assessments: &[Assessment],
    ) -> Result<Vec<AssessmentDetail>> {
        let mut rubrics: HashMap<i64, Rubric> = HashMap::new();
        let mut details = Vec::with_capacity(assessments.len());
        for assessment in assessments {
            if !rubrics.contains_key(&assessment.rubric_id) {
                let rubric = self.rubrics.get(assessment.rubric_id).await?;
                rubrics.insert(assessment.rubric_id, rubric);
            }
            if let Some(rubric) = rubrics.get(&assessment.rubric_id) {
                details.push(describe_assessment(assessment, rubric));
            }
        }
        Ok(details)
    }

    /// 提交一条互评
    ///
    /// 评审对象为评审者最近开始的未完成租约。评语超长时截断。
    pub async fn create_assessment(
        &self,
        reviewer_submission_uuid: &str,
        request: CreateAssessmentRequest,
    ) -> Result<AssessmentDetail> {
        self.create_assessment_inner(reviewer_submission_uuid, request)
            .await
            .inspect_err(|e| log_failure("create_assessment", e))
    }

    async fn create_assessment_inner(
        &self,
        reviewer_submission_uuid: &str,
        request: CreateAssessmentRequest,
    ) -> Result<AssessmentDetail> {
        if request.scorer_id.trim().is_empty() {
            return Err(PeerFlowError::request("scorer_id must not be empty"));
        }

        let scorer = self.require_workflow(reviewer_submission_uuid).await?;
        let now = self.now();

        let item = self
            .storage
            .find_latest_open_item(scorer.id)
            .await?
            .ok_or_else(|| {
                PeerFlowError::workflow(format!(
                    "Workflow {} has no open submission to assess",
                    scorer.id
                ))
            })?;

        let rubric = self.rubrics.get_or_create(&request.rubric).await?;

        let max_chars = self.settings.max_feedback_chars;
        let criterion_feedback: BTreeMap<String, String> = request
            .criterion_feedback
            .iter()
            .map(|(name, text)| (name.clone(), truncate_chars(text, max_chars)))
            .collect();
        let selections = self
            .rubrics
            .resolve(&rubric, &request.options_selected, &criterion_feedback)?;

        let new_assessment = NewAssessment {
            submission_uuid: item.submission_uuid.clone(),
            rubric_id: rubric.id,
            scorer_id: request.scorer_id,
            scored_at: request.scored_at.unwrap_or(now),
            feedback: truncate_chars(&request.overall_feedback, max_chars),
            parts: selections
                .into_iter()
                .map(|s| AssessmentPart {
                    criterion_id: s.criterion_id,
                    option_id: s.option_id,
                    feedback: s.feedback,
                })
                .collect(),
        };

        let assessment = self
            .storage
            .create_peer_assessment(scorer.id, new_assessment, request.must_be_graded_by, now)
            .await?;

        info!(
            "Workflow {} assessed submission {} (assessment {})",
            scorer.id, assessment.submission_uuid, assessment.id
        );

        Ok(describe_assessment(&assessment, &rubric))
    }

    /// 提交收到的互评
    ///
    /// scored_only 时只返回计入最终得分的评审（按评审顺序），否则最新在前。
    pub async fn get_assessments(
        &self,
        submission_uuid: &str,
        scored_only: bool,
        limit: Option<u64>,
    ) -> Result<Vec<AssessmentDetail>> {
        self.get_assessments_inner(submission_uuid, scored_only, limit)
            .await
            .inspect_err(|e| log_failure("get_assessments", e))
    }

    async fn get_assessments_inner(
        &self,
        submission_uuid: &str,
        scored_only: bool,
        limit: Option<u64>,
    ) -> Result<Vec<AssessmentDetail>> {
        let assessments = if scored_only {
            match self.find_workflow(submission_uuid).await? {
                Some(workflow) => {
                    self.storage
                        .list_scored_assessments(workflow.id, limit)
                        .await?
                }
                None => Vec::new(),
            }
        } else {
            validate_submission_uuid(submission_uuid)
                .map_err(PeerFlowError::request)?;
            self.storage
                .list_assessments_for_submission(submission_uuid, limit)
                .await?
        };

        self.describe_all(&assessments).await
    }

    /// 学生作为评审者给出的互评（最新在前）
    pub async fn get_submitted_assessments(
        &self,
        submission_uuid: &str,
        scored_only: bool,
        limit: Option<u64>,
    ) -> Result<Vec<AssessmentDetail>> {
        self.get_submitted_assessments_inner(submission_uuid, scored_only, limit)
            .await
            .inspect_err(|e| log_failure("get_submitted_assessments", e))
    }

    async fn get_submitted_assessments_inner(
        &self,
        submission_uuid: &str,
        scored_only: bool,
        limit: Option<u64>,
    ) -> Result<Vec<AssessmentDetail>> {
        let Some(workflow) = self.find_workflow(submission_uuid).await? else {
            return Ok(Vec::new());
        };

        let assessments = self
            .storage
            .list_assessments_by_scorer(workflow.id, scored_only, limit)
            .await?;
        self.describe_all(&assessments).await
    }
}

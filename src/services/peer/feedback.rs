//! 被评者对评审结果的反馈

use tracing::info;

use super::{PeerAssessmentService, log_failure};
use crate::errors::{PeerFlowError, Result};
use crate::models::assessments::{
    entities::AssessmentFeedback,
    requests::SetAssessmentFeedbackRequest,
    responses::{AssessmentDetail, AssessmentFeedbackResponse},
};
use crate::utils::validate_submission_uuid;

impl PeerAssessmentService {
    async fn feedback_response(
        &self,
        feedback: AssessmentFeedback,
    ) -> Result<AssessmentFeedbackResponse> {
        let assessments: Vec<AssessmentDetail> = self
            .get_assessments(&feedback.submission_uuid, true, None)
            .await?;

        Ok(AssessmentFeedbackResponse {
            submission_uuid: feedback.submission_uuid,
            feedback_text: feedback.feedback_text,
            options: feedback.options,
            updated_at: feedback.updated_at,
            assessments,
        })
    }

    /// 获取反馈
    pub async fn get_assessment_feedback(
        &self,
        submission_uuid: &str,
    ) -> Result<Option<AssessmentFeedbackResponse>> {
        self.get_assessment_feedback_inner(submission_uuid)
            .await
            .inspect_err(|e| log_failure("get_assessment_feedback", e))
    }

    async fn get_assessment_feedback_inner(
        &self,
        submission_uuid: &str,
    ) -> Result<Option<AssessmentFeedbackResponse>> {
        validate_submission_uuid(submission_uuid).map_err(PeerFlowError::request)?;

        match self.storage.get_assessment_feedback(submission_uuid).await? {
            Some(feedback) => Ok(Some(self.feedback_response(feedback).await?)),
            None => Ok(None),
        }
    }

    /// 创建或更新反馈
    ///
    /// 文本或选项超出限制时拒绝，不做截断。
    pub async fn set_assessment_feedback(
        &self,
        request: SetAssessmentFeedbackRequest,
    ) -> Result<AssessmentFeedbackResponse> {
        self.set_assessment_feedback_inner(request)
            .await
            .inspect_err(|e| log_failure("set_assessment_feedback", e))
    }

    async fn set_assessment_feedback_inner(
        &self,
        request: SetAssessmentFeedbackRequest,
    ) -> Result<AssessmentFeedbackResponse> {
        validate_submission_uuid(&request.submission_uuid).map_err(PeerFlowError::request)?;

        let max_chars = self.settings.max_feedback_chars;
        if request
            .feedback_text
            .as_ref()
            .is_some_and(|text| text.chars().count() > max_chars)
        {
            return Err(PeerFlowError::request(format!(
                "Feedback text exceeds {max_chars} characters"
            )));
        }
        if request.options.len() > self.settings.max_feedback_options {
            return Err(PeerFlowError::request(format!(
                "At most {} feedback options are allowed",
                self.settings.max_feedback_options
            )));
        }
        if request
            .options
            .iter()
            .any(|o| o.trim().is_empty() || o.chars().count() > max_chars)
        {
            return Err(PeerFlowError::request(
                "Feedback options must be non-empty and within the length limit",
            ));
        }

        let feedback = self
            .storage
            .upsert_assessment_feedback(
                &request.submission_uuid,
                request.feedback_text,
                request.options,
                self.now(),
            )
            .await?;

        info!("Assessment feedback saved for {}", feedback.submission_uuid);
        self.feedback_response(feedback).await
    }
}

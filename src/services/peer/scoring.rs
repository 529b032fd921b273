//! 得分汇总
//!
//! 每个维度取计分评审的中位数，偶数个时向上取整。仅评语维度不参与计分。

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use super::{PeerAssessmentService, log_failure};
use crate::errors::{PeerFlowError, Result};
use crate::models::{
    assessments::entities::Assessment,
    peer::{entities::PeerRequirements, responses::PeerScore},
    rubrics::entities::Rubric,
};
use crate::utils::validate_submission_uuid;

/// 中位数
pub fn median(values: &[i32]) -> i32 {
    if values.is_empty() {
        return 0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        let sum = i64::from(sorted[n / 2 - 1]) + i64::from(sorted[n / 2]);
        // 向上取整
        sum.div_euclid(2) as i32 + sum.rem_euclid(2) as i32
    }
}

/// 按维度名汇总各评审的得分并取中位数
///
/// `rubrics` 需包含所有评审引用的评分标准。
pub fn median_scores(
    assessments: &[Assessment],
    rubrics: &HashMap<i64, Rubric>,
) -> BTreeMap<String, i32> {
    let mut scores: BTreeMap<String, Vec<i32>> = BTreeMap::new();

    for assessment in assessments {
        let Some(rubric) = rubrics.get(&assessment.rubric_id) else {
            continue;
        };
        for criterion in rubric.criteria.iter().filter(|c| !c.is_feedback_only()) {
            scores.entry(criterion.name.clone()).or_default();
        }
        for part in &assessment.parts {
            let Some(option_id) = part.option_id else {
                continue;
            };
            if let Some((criterion, option)) = rubric.find_option(option_id) {
                scores
                    .entry(criterion.name.clone())
                    .or_default()
                    .push(option.points);
            }
        }
    }

    scores
        .into_iter()
        .map(|(name, values)| (name, median(&values)))
        .collect()
}

impl PeerAssessmentService {
    async fn load_rubrics(&self, assessments: &[Assessment]) -> Result<HashMap<i64, Rubric>> {
        let mut rubrics = HashMap::new();
        for assessment in assessments {
            if !rubrics.contains_key(&assessment.rubric_id) {
                let rubric = self.rubrics.get(assessment.rubric_id).await?;
                rubrics.insert(assessment.rubric_id, rubric);
            }
        }
        Ok(rubrics)
    }

    /// 计分评审的各维度中位数
    pub async fn get_assessment_median_scores(
        &self,
        submission_uuid: &str,
    ) -> Result<BTreeMap<String, i32>> {
        self.get_assessment_median_scores_inner(submission_uuid)
            .await
            .inspect_err(|e| log_failure("get_assessment_median_scores", e))
    }

    async fn get_assessment_median_scores_inner(
        &self,
        submission_uuid: &str,
    ) -> Result<BTreeMap<String, i32>> {
        let Some(workflow) = self.find_workflow(submission_uuid).await? else {
            return Ok(BTreeMap::new());
        };

        let scored = self
            .storage
            .list_scored_assessments(workflow.id, None)
            .await?;
        let rubrics = self.load_rubrics(&scored).await?;
        Ok(median_scores(&scored, &rubrics))
    }

    /// 最终得分
    ///
    /// 学生完成自己的互评且提交已获得足够评审后，固定最早的 N 条评审为计分评审，
    /// 返回各维度中位数之和。条件未满足时返回 `None`。
    pub async fn get_score(
        &self,
        submission_uuid: &str,
        requirements: PeerRequirements,
    ) -> Result<Option<PeerScore>> {
        self.get_score_inner(submission_uuid, requirements)
            .await
            .inspect_err(|e| log_failure("get_score", e))
    }

    async fn get_score_inner(
        &self,
        submission_uuid: &str,
        requirements: PeerRequirements,
    ) -> Result<Option<PeerScore>> {
        let Some(workflow) = self.find_workflow(submission_uuid).await? else {
            return Ok(None);
        };

        if !self
            .submitter_is_finished(submission_uuid, requirements)
            .await?
        {
            debug!("Workflow {} has not finished grading peers", workflow.id);
            return Ok(None);
        }

        let required = requirements.must_be_graded_by;
        let graded_by = self.storage.count_graded_by(workflow.id).await?;
        if required == 0 || graded_by < u64::from(required) {
            debug!(
                "Workflow {} graded by {} of {} peers",
                workflow.id, graded_by, required
            );
            return Ok(None);
        }

        let flagged = self.storage.flag_scored_items(workflow.id, required).await?;
        let scored = self
            .storage
            .list_scored_assessments(workflow.id, None)
            .await?;
        let Some(first) = scored.first() else {
            return Ok(None);
        };

        let rubrics = self.load_rubrics(&scored).await?;
        let points_possible = rubrics
            .get(&first.rubric_id)
            .map(|r| r.points_possible())
            .unwrap_or_default();
        let medians = median_scores(&scored, &rubrics);
        let points_earned: i32 = medians.values().sum();

        info!(
            "Score for submission {}: {}/{} ({} scored assessments)",
            submission_uuid, points_earned, points_possible, flagged
        );

        Ok(Some(PeerScore {
            points_earned,
            points_possible,
        }))
    }

    /// 最近一条评审所用评分标准的各维度最高分
    pub async fn get_rubric_max_scores(
        &self,
        submission_uuid: &str,
    ) -> Result<Option<BTreeMap<String, i32>>> {
        self.get_rubric_max_scores_inner(submission_uuid)
            .await
            .inspect_err(|e| log_failure("get_rubric_max_scores", e))
    }

    async fn get_rubric_max_scores_inner(
        &self,
        submission_uuid: &str,
    ) -> Result<Option<BTreeMap<String, i32>>> {
        validate_submission_uuid(submission_uuid).map_err(PeerFlowError::request)?;

        let Some(latest) = self.storage.get_latest_assessment(submission_uuid).await? else {
            return Ok(None);
        };
        let rubric = self.rubrics.get(latest.rubric_id).await?;
        Ok(Some(rubric.max_scores()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[]), 0);
        assert_eq!(median(&[7]), 7);
        assert_eq!(median(&[3, 1, 2]), 2);
        assert_eq!(median(&[1, 2]), 2);
        assert_eq!(median(&[5, 0, 10, 3]), 4);
        assert_eq!(median(&[2, 4]), 3);
    }

    #[test]
    fn test_median_within_bounds() {
        let samples: [&[i32]; 4] = [&[0, 10], &[1, 1, 9], &[4, 4, 4, 5], &[10, 0, 5, 5, 3]];
        for values in samples {
            let m = median(values);
            let min = *values.iter().min().unwrap();
            let max = *values.iter().max().unwrap();
            assert!(m >= min && m <= max, "median {m} out of [{min}, {max}]");
        }
    }
}

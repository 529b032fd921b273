//! 评分标准
//!
//! 评分标准一经创建不可修改，以内容哈希（SHA-256）作为唯一标识与缓存键。
//! 没有选项的维度为“仅评语”维度，不计分。

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{PeerFlowError, Result};

/// 评分选项定义（调用方提交的原始结构）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDefinition {
    pub name: String,
    #[serde(default)]
    pub label: String,
    pub points: i32,
    #[serde(default)]
    pub explanation: String,
}

/// 评分维度定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionDefinition {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<OptionDefinition>,
}

/// 评分标准定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricDefinition {
    pub criteria: Vec<CriterionDefinition>,
}

impl RubricDefinition {
    /// 校验评分标准结构
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.criteria.is_empty() {
            return Err("Rubric must have at least one criterion".to_string());
        }

        let mut criterion_names = HashSet::new();
        for criterion in &self.criteria {
            if criterion.name.trim().is_empty() {
                return Err("Criterion name must not be empty".to_string());
            }
            if !criterion_names.insert(criterion.name.as_str()) {
                return Err(format!("Duplicate criterion name: {}", criterion.name));
            }

            let mut option_names = HashSet::new();
            for option in &criterion.options {
                if !option_names.insert(option.name.as_str()) {
                    return Err(format!(
                        "Duplicate option name '{}' in criterion '{}'",
                        option.name, criterion.name
                    ));
                }
                if option.points < 0 {
                    return Err(format!(
                        "Option '{}' in criterion '{}' has negative points",
                        option.name, criterion.name
                    ));
                }
            }
        }

        Ok(())
    }

    /// 计算内容哈希
    ///
    /// 结构体序列化字段顺序固定，相同内容总是得到相同哈希。
    pub fn content_hash(&self) -> Result<String> {
        let canonical = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        Ok(hex::encode(hasher.finalize()))
    }
}

/// 已入库的评分选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricOption {
    pub id: i64,
    pub order_num: i32,
    pub name: String,
    pub label: String,
    pub points: i32,
    pub explanation: String,
}

/// 已入库的评分维度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricCriterion {
    pub id: i64,
    pub order_num: i32,
    pub name: String,
    pub label: String,
    pub prompt: String,
    pub options: Vec<RubricOption>,
}

impl RubricCriterion {
    /// 本维度最高分，仅评语维度为 0
    pub fn points_possible(&self) -> i32 {
        self.options.iter().map(|o| o.points).max().unwrap_or(0)
    }

    pub fn is_feedback_only(&self) -> bool {
        self.options.is_empty()
    }
}

/// 已入库的评分标准
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rubric {
    pub id: i64,
    pub content_hash: String,
    pub criteria: Vec<RubricCriterion>,
}

/// 一个维度的解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSelection {
    pub criterion_id: i64,
    pub option_id: Option<i64>,
    pub feedback: String,
}

impl Rubric {
    /// 评分标准总分
    pub fn points_possible(&self) -> i32 {
        self.criteria.iter().map(|c| c.points_possible()).sum()
    }

    /// 各维度最高分
    pub fn max_scores(&self) -> BTreeMap<String, i32> {
        self.criteria
            .iter()
            .map(|c| (c.name.clone(), c.points_possible()))
            .collect()
    }

    pub fn find_criterion(&self, criterion_id: i64) -> Option<&RubricCriterion> {
        self.criteria.iter().find(|c| c.id == criterion_id)
    }

    /// 根据选项 ID 查找所属维度与选项
    pub fn find_option(&self, option_id: i64) -> Option<(&RubricCriterion, &RubricOption)> {
        self.criteria.iter().find_map(|c| {
            c.options
                .iter()
                .find(|o| o.id == option_id)
                .map(|o| (c, o))
        })
    }

    /// 将“维度名 -> 选项名”解析为选项 ID
    ///
    /// 每个有选项的维度必须恰好选中一个选项；仅评语维度不需要选择。
    /// 返回结果按维度顺序排列。
    pub fn resolve(
        &self,
        options_selected: &BTreeMap<String, String>,
        criterion_feedback: &BTreeMap<String, String>,
    ) -> Result<Vec<PartSelection>> {
        if let Some(unknown) = options_selected
            .keys()
            .find(|name| !self.criteria.iter().any(|c| &c.name == *name))
        {
            return Err(PeerFlowError::invalid_rubric_selection(format!(
                "Criterion '{unknown}' does not exist in the rubric"
            )));
        }

        let mut parts = Vec::with_capacity(self.criteria.len());
        for criterion in &self.criteria {
            let option_id = match options_selected.get(&criterion.name) {
                Some(option_name) => {
                    let option = criterion
                        .options
                        .iter()
                        .find(|o| &o.name == option_name)
                        .ok_or_else(|| {
                            PeerFlowError::invalid_rubric_selection(format!(
                                "Option '{option_name}' does not exist in criterion '{}'",
                                criterion.name
                            ))
                        })?;
                    Some(option.id)
                }
                None if criterion.is_feedback_only() => None,
                None => {
                    return Err(PeerFlowError::invalid_rubric_selection(format!(
                        "No option selected for criterion '{}'",
                        criterion.name
                    )));
                }
            };

            parts.push(PartSelection {
                criterion_id: criterion.id,
                option_id,
                feedback: criterion_feedback
                    .get(&criterion.name)
                    .cloned()
                    .unwrap_or_default(),
            });
        }

        Ok(parts)
    }

    /// 将“维度名 -> 分数”解析为选项 ID
    ///
    /// 多个选项分数相同时取顺序最靠前的一个。
    pub fn resolve_points(
        &self,
        selected_points: &BTreeMap<String, i32>,
    ) -> Result<BTreeMap<String, i64>> {
        let mut resolved = BTreeMap::new();
        for (criterion_name, points) in selected_points {
            let criterion = self
                .criteria
                .iter()
                .find(|c| &c.name == criterion_name)
                .ok_or_else(|| {
                    PeerFlowError::invalid_rubric_selection(format!(
                        "Criterion '{criterion_name}' does not exist in the rubric"
                    ))
                })?;
            let option = criterion
                .options
                .iter()
                .filter(|o| o.points == *points)
                .min_by_key(|o| o.order_num)
                .ok_or_else(|| {
                    PeerFlowError::invalid_rubric_selection(format!(
                        "No option with {points} points in criterion '{criterion_name}'"
                    ))
                })?;
            resolved.insert(criterion_name.clone(), option.id);
        }

        if let Some(missing) = self
            .criteria
            .iter()
            .find(|c| !c.is_feedback_only() && !resolved.contains_key(&c.name))
        {
            return Err(PeerFlowError::invalid_rubric_selection(format!(
                "No points given for criterion '{}'",
                missing.name
            )));
        }

        Ok(resolved)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_definition() -> RubricDefinition {
        let option = |name: &str, points: i32| OptionDefinition {
            name: name.to_string(),
            label: name.to_string(),
            points,
            explanation: String::new(),
        };
        RubricDefinition {
            criteria: vec![
                CriterionDefinition {
                    name: "clarity".to_string(),
                    label: "Clarity".to_string(),
                    prompt: "How clear is the essay?".to_string(),
                    options: vec![option("poor", 0), option("fair", 1), option("good", 3)],
                },
                CriterionDefinition {
                    name: "ideas".to_string(),
                    label: "Ideas".to_string(),
                    prompt: "How strong are the ideas?".to_string(),
                    options: vec![option("weak", 0), option("solid", 5), option("great", 10)],
                },
                CriterionDefinition {
                    name: "comments".to_string(),
                    label: "Comments".to_string(),
                    prompt: "Anything else?".to_string(),
                    options: vec![],
                },
            ],
        }
    }

    fn stored(definition: &RubricDefinition) -> Rubric {
        Rubric {
            id: 1,
            content_hash: definition.content_hash().unwrap(),
            criteria: definition
                .criteria
                .iter()
                .enumerate()
                .map(|(ci, c)| RubricCriterion {
                    id: 100 + ci as i64,
                    order_num: ci as i32,
                    name: c.name.clone(),
                    label: c.label.clone(),
                    prompt: c.prompt.clone(),
                    options: c
                        .options
                        .iter()
                        .enumerate()
                        .map(|(oi, o)| RubricOption {
                            id: (ci as i64 + 1) * 10 + oi as i64,
                            order_num: oi as i32,
                            name: o.name.clone(),
                            label: o.label.clone(),
                            points: o.points,
                            explanation: o.explanation.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    fn selections(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_content_hash_is_stable() {
        let definition = sample_definition();
        assert_eq!(
            definition.content_hash().unwrap(),
            sample_definition().content_hash().unwrap()
        );
        assert_eq!(definition.content_hash().unwrap().len(), 64);

        let mut changed = sample_definition();
        changed.criteria[0].options[2].points = 4;
        assert_ne!(
            definition.content_hash().unwrap(),
            changed.content_hash().unwrap()
        );
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        assert!(sample_definition().validate().is_ok());

        let mut duplicate = sample_definition();
        duplicate.criteria[1].name = "clarity".to_string();
        assert!(duplicate.validate().is_err());

        let empty = RubricDefinition { criteria: vec![] };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_points_possible() {
        let rubric = stored(&sample_definition());
        assert_eq!(rubric.points_possible(), 13);
        let max = rubric.max_scores();
        assert_eq!(max["clarity"], 3);
        assert_eq!(max["ideas"], 10);
        assert_eq!(max["comments"], 0);
    }

    #[test]
    fn test_resolve_one_option_per_criterion() {
        let rubric = stored(&sample_definition());
        let selected = selections(&[("clarity", "good"), ("ideas", "solid")]);
        let feedback = selections(&[("comments", "nice work")]);

        let first = rubric.resolve(&selected, &feedback).unwrap();
        let second = rubric.resolve(&selected, &feedback).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);

        let (criterion, option) = rubric.find_option(first[0].option_id.unwrap()).unwrap();
        assert_eq!((criterion.name.as_str(), option.name.as_str()), ("clarity", "good"));
        let (criterion, option) = rubric.find_option(first[1].option_id.unwrap()).unwrap();
        assert_eq!((criterion.name.as_str(), option.name.as_str()), ("ideas", "solid"));
        assert_eq!(first[2].option_id, None);
        assert_eq!(first[2].feedback, "nice work");
    }

    #[test]
    fn test_resolve_rejects_invalid_selections() {
        let rubric = stored(&sample_definition());
        let empty = BTreeMap::new();

        let missing = selections(&[("clarity", "good")]);
        assert!(matches!(
            rubric.resolve(&missing, &empty),
            Err(PeerFlowError::InvalidRubricSelection(_))
        ));

        let unknown_option = selections(&[("clarity", "excellent"), ("ideas", "solid")]);
        assert!(rubric.resolve(&unknown_option, &empty).is_err());

        let unknown_criterion =
            selections(&[("clarity", "good"), ("ideas", "solid"), ("style", "ok")]);
        assert!(rubric.resolve(&unknown_criterion, &empty).is_err());
    }

    #[test]
    fn test_resolve_points() {
        let rubric = stored(&sample_definition());
        let points: BTreeMap<String, i32> =
            [("clarity".to_string(), 1), ("ideas".to_string(), 10)].into();
        let resolved = rubric.resolve_points(&points).unwrap();
        assert_eq!(rubric.find_option(resolved["clarity"]).unwrap().1.name, "fair");
        assert_eq!(rubric.find_option(resolved["ideas"]).unwrap().1.name, "great");

        let invalid: BTreeMap<String, i32> =
            [("clarity".to_string(), 2), ("ideas".to_string(), 10)].into();
        assert!(rubric.resolve_points(&invalid).is_err());

        let partial: BTreeMap<String, i32> = [("clarity".to_string(), 1)].into();
        assert!(rubric.resolve_points(&partial).is_err());
    }
}

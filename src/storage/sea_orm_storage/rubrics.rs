//! 评分标准存储操作

use std::collections::HashMap;

use super::SeaOrmStorage;
use crate::entity::rubric_criteria::{
    ActiveModel as CriterionActiveModel, Column as CriterionColumn, Entity as RubricCriteria,
};
use crate::entity::rubric_options::{
    ActiveModel as OptionActiveModel, Column as OptionColumn, Entity as RubricOptions,
};
use crate::entity::rubrics::{ActiveModel, Column, Entity as Rubrics, Model};
use crate::errors::{PeerFlowError, Result, is_unique_violation};
use crate::models::rubrics::entities::{
    Rubric, RubricCriterion, RubricDefinition, RubricOption,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::debug;

impl SeaOrmStorage {
    /// 组装评分标准（维度与选项按顺序排列）
    async fn assemble_rubric(&self, rubric: Model) -> Result<Rubric> {
        let criteria = RubricCriteria::find()
            .filter(CriterionColumn::RubricId.eq(rubric.id))
            .order_by_asc(CriterionColumn::OrderNum)
            .all(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询评分维度失败: {e}")))?;

        let criterion_ids: Vec<i64> = criteria.iter().map(|c| c.id).collect();
        let options = RubricOptions::find()
            .filter(OptionColumn::CriterionId.is_in(criterion_ids))
            .order_by_asc(OptionColumn::OrderNum)
            .order_by_asc(OptionColumn::Id)
            .all(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询评分选项失败: {e}")))?;

        let mut grouped: HashMap<i64, Vec<RubricOption>> = HashMap::new();
        for option in options {
            grouped
                .entry(option.criterion_id)
                .or_default()
                .push(option.into_rubric_option());
        }

        Ok(Rubric {
            id: rubric.id,
            content_hash: rubric.content_hash,
            criteria: criteria
                .into_iter()
                .map(|c| RubricCriterion {
                    options: grouped.remove(&c.id).unwrap_or_default(),
                    id: c.id,
                    order_num: c.order_num,
                    name: c.name,
                    label: c.label,
                    prompt: c.prompt,
                })
                .collect(),
        })
    }

    /// 通过内容哈希获取评分标准
    pub async fn get_rubric_by_hash_impl(&self, content_hash: &str) -> Result<Option<Rubric>> {
        let result = Rubrics::find()
            .filter(Column::ContentHash.eq(content_hash))
            .one(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询评分标准失败: {e}")))?;

        match result {
            Some(model) => Ok(Some(self.assemble_rubric(model).await?)),
            None => Ok(None),
        }
    }

    /// 通过 ID 获取评分标准
    pub async fn get_rubric_by_id_impl(&self, rubric_id: i64) -> Result<Option<Rubric>> {
        let result = Rubrics::find_by_id(rubric_id)
            .one(&self.db)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("查询评分标准失败: {e}")))?;

        match result {
            Some(model) => Ok(Some(self.assemble_rubric(model).await?)),
            None => Ok(None),
        }
    }

    /// 创建评分标准
    ///
    /// 相同内容哈希的并发创建以已有记录为准。
    pub async fn create_rubric_impl(
        &self,
        definition: &RubricDefinition,
        content_hash: &str,
    ) -> Result<Rubric> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("开启事务失败: {e}")))?;

        let model = ActiveModel {
            content_hash: Set(content_hash.to_string()),
            ..Default::default()
        };

        let rubric = match model.insert(&txn).await {
            Ok(rubric) => rubric,
            Err(e) if is_unique_violation(&e) => {
                txn.rollback().await.map_err(|e| {
                    PeerFlowError::database_operation(format!("回滚事务失败: {e}"))
                })?;
                debug!("Rubric {} already exists, reusing", content_hash);
                return self
                    .get_rubric_by_hash_impl(content_hash)
                    .await?
                    .ok_or_else(|| PeerFlowError::database_operation("评分标准创建冲突后未找到记录"));
            }
            Err(e) => {
                return Err(PeerFlowError::database_operation(format!(
                    "创建评分标准失败: {e}"
                )));
            }
        };

        for (ci, criterion) in definition.criteria.iter().enumerate() {
            let created = CriterionActiveModel {
                rubric_id: Set(rubric.id),
                order_num: Set(ci as i32),
                name: Set(criterion.name.clone()),
                label: Set(criterion.label.clone()),
                prompt: Set(criterion.prompt.clone()),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("创建评分维度失败: {e}")))?;

            if criterion.options.is_empty() {
                continue;
            }

            let options = criterion
                .options
                .iter()
                .enumerate()
                .map(|(oi, option)| OptionActiveModel {
                    criterion_id: Set(created.id),
                    order_num: Set(oi as i32),
                    name: Set(option.name.clone()),
                    label: Set(option.label.clone()),
                    points: Set(option.points),
                    explanation: Set(option.explanation.clone()),
                    ..Default::default()
                });
            RubricOptions::insert_many(options)
                .exec(&txn)
                .await
                .map_err(|e| PeerFlowError::database_operation(format!("创建评分选项失败: {e}")))?;
        }

        txn.commit()
            .await
            .map_err(|e| PeerFlowError::database_operation(format!("提交事务失败: {e}")))?;

        self.get_rubric_by_id_impl(rubric.id)
            .await?
            .ok_or_else(|| PeerFlowError::database_operation("评分标准创建后未找到记录"))
    }
}

//! 评分标准索引
//!
//! 评分标准按内容哈希去重存储，创建后不可变，因此可以放心缓存。

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::cache::ObjectCache;
use crate::errors::{PeerFlowError, Result};
use crate::models::rubrics::entities::{PartSelection, Rubric, RubricDefinition};
use crate::storage::Storage;

pub struct RubricIndex {
    storage: Arc<dyn Storage>,
    cache: Arc<dyn ObjectCache>,
}

impl RubricIndex {
    pub fn new(storage: Arc<dyn Storage>, cache: Arc<dyn ObjectCache>) -> Self {
        Self { storage, cache }
    }

    fn hash_key(content_hash: &str) -> String {
        format!("rubric:hash:{content_hash}")
    }

    fn id_key(rubric_id: i64) -> String {
        format!("rubric:id:{rubric_id}")
    }

    async fn remember(&self, rubric: &Rubric) {
        self.cache
            .insert_json(Self::hash_key(&rubric.content_hash), rubric, 0)
            .await;
        self.cache
            .insert_json(Self::id_key(rubric.id), rubric, 0)
            .await;
    }

    /// 获取或创建评分标准
    pub async fn get_or_create(&self, definition: &RubricDefinition) -> Result<Rubric> {
        definition.validate().map_err(PeerFlowError::request)?;
        let content_hash = definition.content_hash()?;

        if let Some(rubric) = self
            .cache
            .get_json::<Rubric>(&Self::hash_key(&content_hash))
            .await
        {
            return Ok(rubric);
        }

        let rubric = match self.storage.get_rubric_by_hash(&content_hash).await? {
            Some(rubric) => rubric,
            None => {
                debug!("Creating rubric {}", content_hash);
                self.storage.create_rubric(definition, &content_hash).await?
            }
        };

        self.remember(&rubric).await;
        Ok(rubric)
    }

    /// 通过 ID 获取评分标准
    pub async fn get(&self, rubric_id: i64) -> Result<Rubric> {
        if let Some(rubric) = self.cache.get_json::<Rubric>(&Self::id_key(rubric_id)).await {
            return Ok(rubric);
        }

        let rubric = self
            .storage
            .get_rubric_by_id(rubric_id)
            .await?
            .ok_or_else(|| PeerFlowError::not_found(format!("Rubric {rubric_id} not found")))?;

        self.remember(&rubric).await;
        Ok(rubric)
    }

    /// 将选项名解析为选项 ID
    pub fn resolve(
        &self,
        rubric: &Rubric,
        options_selected: &BTreeMap<String, String>,
        criterion_feedback: &BTreeMap<String, String>,
    ) -> Result<Vec<PartSelection>> {
        rubric.resolve(options_selected, criterion_feedback)
    }

    /// 将分数解析为选项 ID
    pub fn resolve_points(
        &self,
        rubric: &Rubric,
        selected_points: &BTreeMap<String, i32>,
    ) -> Result<BTreeMap<String, i64>> {
        rubric.resolve_points(selected_points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::object_cache::moka::MokaCacheWrapper;
    use crate::models::rubrics::entities::tests::sample_definition;
    use crate::storage::sea_orm_storage::SeaOrmStorage;

    async fn index() -> RubricIndex {
        let storage = Arc::new(SeaOrmStorage::new_in_memory().await.unwrap());
        RubricIndex::new(storage, Arc::new(MokaCacheWrapper::with_settings(64, 300)))
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let index = index().await;
        let first = index.get_or_create(&sample_definition()).await.unwrap();
        let second = index.get_or_create(&sample_definition()).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.criteria.len(), 3);
        assert_eq!(first.criteria[0].name, "clarity");
        assert_eq!(first.criteria[0].options.len(), 3);
        assert_eq!(first.criteria[0].options[2].name, "good");
        assert!(first.criteria[2].is_feedback_only());
        assert_eq!(first.points_possible(), 13);

        let by_id = index.get(first.id).await.unwrap();
        assert_eq!(by_id, first);
    }

    #[tokio::test]
    async fn test_storage_dedupes_without_cache() {
        let storage = SeaOrmStorage::new_in_memory().await.unwrap();
        let definition = sample_definition();
        let hash = definition.content_hash().unwrap();

        let first = storage.create_rubric_impl(&definition, &hash).await.unwrap();
        let second = storage.create_rubric_impl(&definition, &hash).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_invalid_definition_is_request_error() {
        let index = index().await;
        let err = index
            .get_or_create(&RubricDefinition { criteria: vec![] })
            .await
            .unwrap_err();
        assert!(err.is_request_error());

        let missing = index.get(9999).await.unwrap_err();
        assert!(matches!(missing, PeerFlowError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_resolve_points_against_stored_rubric() {
        let index = index().await;
        let rubric = index.get_or_create(&sample_definition()).await.unwrap();

        let points: BTreeMap<String, i32> = [("clarity".to_string(), 3), ("ideas".to_string(), 5)]
            .into_iter()
            .collect();
        let resolved = index.resolve_points(&rubric, &points).unwrap();
        let (_, option) = rubric.find_option(resolved["ideas"]).unwrap();
        assert_eq!(option.name, "solid");
    }
}

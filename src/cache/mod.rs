//! 对象缓存
//!
//! 缓存值统一为字符串，结构化数据以 JSON 序列化后存入。
//! 后端以插件形式注册，按配置中的 `cache.type` 选择。

pub mod object_cache;
pub mod register;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

/// 缓存查询结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheResult<T> {
    Found(T),
    NotFound,
    // 键存在但值不可用（后端错误等）
    ExistsButNoValue,
}

#[async_trait]
pub trait ObjectCache: Send + Sync {
    async fn get_raw(&self, key: &str) -> CacheResult<String>;
    // ttl 为 0 时使用后端默认值
    async fn insert_raw(&self, key: String, value: String, ttl: u64);
    async fn remove(&self, key: &str);
    async fn invalidate_all(&self);
}

impl dyn ObjectCache {
    /// 读取并反序列化缓存值，反序列化失败视为未命中
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.get_raw(key).await {
            CacheResult::Found(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Failed to deserialize cached value for key '{}': {}", key, e);
                    None
                }
            },
            _ => None,
        }
    }

    /// 序列化并写入缓存，序列化失败时跳过
    pub async fn insert_json<T: Serialize>(&self, key: String, value: &T, ttl: u64) {
        match serde_json::to_string(value) {
            Ok(raw) => self.insert_raw(key, raw, ttl).await,
            Err(e) => warn!("Failed to serialize value for cache key '{}': {}", key, e),
        }
    }
}

/// 声明对象缓存插件
///
/// 生成 `register_plugin()`，在启动时由 [`object_cache::register_builtin_plugins`] 调用。
#[macro_export]
macro_rules! declare_object_cache_plugin {
    ($name:literal, $ty:ty) => {
        pub fn register_plugin() {
            $crate::cache::register::register_object_cache_plugin(
                $name,
                std::sync::Arc::new(|| -> $crate::cache::register::BoxedObjectCacheFuture {
                    Box::pin(async {
                        let cache = <$ty>::new()?;
                        Ok::<Box<dyn $crate::cache::ObjectCache>, $crate::errors::PeerFlowError>(
                            Box::new(cache),
                        )
                    })
                }),
            );
        }
    };
}

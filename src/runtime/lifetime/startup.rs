use crate::cache::{
    ObjectCache, object_cache::register_builtin_plugins, register::get_object_cache_plugin,
};
use crate::config::AppConfig;
use crate::errors::{PeerFlowError, Result};
use crate::services::{PeerAssessmentService, PeerSettings};
use crate::storage::{Storage, SubmissionApi};
use crate::utils::SystemClock;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct StartupContext {
    pub storage: Arc<dyn Storage>,
    pub submissions: Arc<dyn SubmissionApi>,
    pub cache: Arc<dyn ObjectCache>,
    pub service: Arc<PeerAssessmentService>,
}

/// 按名称构造缓存后端
async fn build_cache(name: &str) -> Result<Arc<dyn ObjectCache>> {
    let constructor = get_object_cache_plugin(name).ok_or_else(|| {
        PeerFlowError::cache_plugin_not_found(format!(
            "Cache backend '{name}' not found in registry"
        ))
    })?;
    let cache = constructor().await?;
    Ok(Arc::from(cache))
}

/// 创建缓存实例
async fn create_cache() -> Result<Arc<dyn ObjectCache>> {
    let config = AppConfig::get();
    let cache_type = &config.cache.cache_type;

    warn!("Attempting to create {} cache backend", cache_type);

    match build_cache(cache_type).await {
        Ok(cache) => {
            warn!("Successfully created {} cache backend", cache_type);
            return Ok(cache);
        }
        Err(e) => warn!("Failed to create {} cache: {}", cache_type, e),
    }

    // 配置的缓存不可用时回退到内存缓存
    if cache_type != "moka" {
        warn!("Falling back to memory cache");
        match build_cache("moka").await {
            Ok(cache) => {
                warn!("Successfully created fallback Moka (in-memory) cache backend");
                return Ok(cache);
            }
            Err(fallback_e) => warn!("Failed to create fallback Moka cache: {}", fallback_e),
        }
    }

    Err(PeerFlowError::cache_connection(format!(
        "No cache backend available (tried: {cache_type})"
    )))
}

/// 准备服务器启动的上下文
/// 包括存储、缓存和互评服务
pub async fn prepare_server_startup() -> StartupContext {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    register_builtin_plugins();
    if cfg!(debug_assertions) {
        crate::cache::register::debug_object_cache_registry();
        debug!("Debug mode: Cache registry is enabled");
    }

    let backend = crate::storage::create_storage()
        .await
        .expect("Failed to create storage backend");
    warn!("Storage backend initialized and migrations completed");

    let storage: Arc<dyn Storage> = backend.clone();
    let submissions: Arc<dyn SubmissionApi> = backend;

    // 创建缓存实例
    let cache = create_cache().await.expect("Failed to create cache");
    warn!("Cache backend initialized");

    let settings = PeerSettings::from_config(&AppConfig::get().peer);
    info!(
        "Peer assessment settings: time limit {}h, feedback limit {} chars",
        settings.time_limit.num_hours(),
        settings.max_feedback_chars
    );

    let service = Arc::new(PeerAssessmentService::new(
        storage.clone(),
        submissions.clone(),
        cache.clone(),
        settings,
        Arc::new(SystemClock),
    ));

    StartupContext {
        storage,
        submissions,
        cache,
        service,
    }
}

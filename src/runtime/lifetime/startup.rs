use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::services::{UnlockRateLimit, unlock_rate_limit};
use crate::resolver::{RedirectResolver, UnlockService};
use crate::services::ExperimentService;
use crate::storage::{ResolverStore, SeaOrmStorage, StorageFactory};

pub struct StartupContext {
    pub storage: Arc<SeaOrmStorage>,
    pub resolver: Arc<RedirectResolver>,
    pub experiment_service: Arc<ExperimentService>,
    pub unlock_limit: UnlockRateLimit,
    pub route_config: RouteConfig,
}

#[derive(Clone, Debug)]
pub struct RouteConfig {
    pub scan_prefix: String,
    pub api_prefix: String,
}

/// 准备服务器启动的上下文
/// 包括存储、解析器、实验服务和路由配置
pub async fn prepare_server_startup() -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    // 多个 rustls 后端同时编译进来时需要显式指定
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    let storage = StorageFactory::create()
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.backend_name());

    let config = crate::config::get_config();
    if config.security.admin_token.is_empty() {
        warn!("Admin token not configured, experiment API is disabled");
    }

    let unlock = Arc::new(UnlockService::from_config());
    let store: Arc<dyn ResolverStore> = storage.clone();
    let resolver = Arc::new(RedirectResolver::new(store, unlock));
    let experiment_service = Arc::new(ExperimentService::new(storage.clone()));
    let unlock_limit = unlock_rate_limit(
        config.security.unlock_rate_burst,
        config.security.unlock_rate_seconds,
    )
    .context("Failed to build unlock rate limiter")?;

    let route_config = RouteConfig {
        scan_prefix: config.routes.scan_prefix.clone(),
        api_prefix: config.routes.api_prefix.clone(),
    };

    info!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        storage,
        resolver,
        experiment_service,
        unlock_limit,
        route_config,
    })
}

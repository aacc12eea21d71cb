//! Server mode
//!
//! This module contains the HTTP server startup logic.
//! It configures and starts the HTTP server with all necessary routes.

use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::middleware::AdminAuth;
use crate::api::services::{
    AppStartTime, admin::routes::admin_v1_routes, health_routes, scan_routes,
};
use crate::runtime::lifetime;

/// Run the HTTP server
///
/// This function:
/// 1. Records startup time
/// 2. Prepares server components (storage, resolver, services)
/// 3. Configures and starts the HTTP server
/// 4. Stops gracefully on Ctrl+C
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    // Record application start time
    let app_start_time = AppStartTime {
        start_datetime: chrono::Utc::now(),
    };

    let startup = lifetime::startup::prepare_server_startup()
        .await
        .inspect_err(|e| tracing::error!("Server startup failed: {}", e))?;

    let storage = startup.storage.clone();
    let resolver = startup.resolver.clone();
    let experiment_service = startup.experiment_service.clone();
    let scan_prefix = startup.route_config.scan_prefix.clone();
    let api_prefix = startup.route_config.api_prefix.clone();
    // 所有 worker 共享同一份限流状态
    let unlock_limit = Arc::new(startup.unlock_limit);

    let config = crate::config::get_config();
    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Compress::default())
            .app_data(web::Data::new(storage.clone()))
            .app_data(web::Data::new(resolver.clone()))
            .app_data(web::Data::new(experiment_service.clone()))
            .app_data(web::Data::new(app_start_time.clone()))
            .app_data(web::PayloadConfig::new(64 * 1024))
            .wrap(
                DefaultHeaders::new()
                    .add(("Connection", "keep-alive"))
                    .add(("Keep-Alive", "timeout=30, max=1000")),
            )
            .service(
                web::scope(&api_prefix)
                    .wrap(AdminAuth::from_config())
                    .service(admin_v1_routes()),
            )
            .service(health_routes())
            .service(scan_routes(&scan_prefix, &unlock_limit))
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .client_disconnect_timeout(std::time::Duration::from_millis(1000))
    .workers(cpu_count);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{}", bind_address);
    let server = server
        .bind(&bind_address)
        .with_context(|| format!("Server binding failed: {}", bind_address))?
        .run();
    let handle = server.handle();

    tokio::select! {
        res = server => {
            res?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, stopping server...");
            handle.stop(true).await;
        }
    }

    Ok(())
}

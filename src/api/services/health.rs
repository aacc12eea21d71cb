use actix_web::{HttpResponse, Responder, web};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, trace};

use crate::storage::SeaOrmStorage;

// 应用启动时间结构体
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

pub struct HealthService;

impl HealthService {
    pub async fn health_check(
        storage: web::Data<Arc<SeaOrmStorage>>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        let start_time = Instant::now();
        trace!("Received health check request");

        // 检查存储健康状况
        let storage_status = match tokio::time::timeout(Duration::from_secs(5), storage.ping()).await
        {
            Ok(Ok(())) => json!({
                "status": "healthy",
                "backend": storage.backend_name(),
            }),
            Ok(Err(e)) => {
                error!("Storage health check failed: {}", e);
                json!({
                    "status": "unhealthy",
                    "error": e.message(),
                    "backend": storage.backend_name(),
                })
            }
            Err(_) => {
                error!("Storage health check timeout");
                json!({
                    "status": "unhealthy",
                    "error": "timeout",
                    "backend": storage.backend_name(),
                })
            }
        };

        let now = chrono::Utc::now();
        let uptime_seconds = (now - app_start_time.start_datetime).num_seconds().max(0) as u64;
        let is_healthy = storage_status["status"] == "healthy";

        let health_response = json!({
            "status": if is_healthy { "healthy" } else { "unhealthy" },
            "timestamp": now.to_rfc3339(),
            "uptime": uptime_seconds,
            "checks": {
                "storage": storage_status,
            },
            "response_time_ms": start_time.elapsed().as_millis()
        });

        let response_status = if is_healthy {
            actix_web::http::StatusCode::OK
        } else {
            actix_web::http::StatusCode::SERVICE_UNAVAILABLE
        };

        info!(
            "Health check completed in {:?}, status: {}, uptime: {}s",
            start_time.elapsed(),
            if is_healthy { "healthy" } else { "unhealthy" },
            uptime_seconds
        );

        HttpResponse::build(response_status)
            .append_header(("Content-Type", "application/json; charset=utf-8"))
            .json(health_response)
    }
}

pub fn health_routes() -> actix_web::Scope {
    web::scope("/health").route("", web::get().to(HealthService::health_check))
}

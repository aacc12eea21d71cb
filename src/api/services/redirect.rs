use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, web};
use std::sync::Arc;
use tracing::{error, trace};

use crate::api::constants::NO_STORE;
use crate::api::services::{UnlockHandler, UnlockRateLimit, unlock_rate_limiter};
use crate::config::get_config;
use crate::resolver::{RedirectResolver, ScanRequest, UnlockService};
use crate::utils::{ScanHeaders, is_valid_token};

pub struct RedirectService {}

impl RedirectService {
    /// `GET /r/{token}`
    pub async fn handle_scan(
        req: HttpRequest,
        path: web::Path<String>,
        resolver: web::Data<Arc<RedirectResolver>>,
    ) -> HttpResponse {
        let token = path.into_inner();
        let config = get_config();
        let routes = &config.routes;

        if !is_valid_token(&token) {
            // 非法 token 不查库
            trace!("Invalid token rejected: {}", token);
            return Self::redirect(&routes.site_root);
        }

        let scan = ScanRequest {
            unlock_token: req
                .cookie(&UnlockService::cookie_name(&token))
                .map(|c| c.value().to_string()),
            visitor_hash: ScanHeaders::visitor_hash(&req),
            context: ScanHeaders::scan_context(&req),
            token,
        };

        match resolver.resolve(&scan).await {
            Ok(resolution) => {
                trace!(
                    "Resolved {} -> {:?} (variant: {:?})",
                    scan.token, resolution.outcome, resolution.variant_id
                );
                Self::redirect(&resolution.outcome.location(routes))
            }
            Err(e) => {
                error!("Resolution failed for {}: {}", scan.token, e);
                Self::error_response()
            }
        }
    }

    #[inline]
    fn redirect(location: &str) -> HttpResponse {
        HttpResponse::TemporaryRedirect()
            .insert_header(("Location", location))
            .insert_header(("Cache-Control", NO_STORE))
            .finish()
    }

    #[inline]
    fn error_response() -> HttpResponse {
        HttpResponse::build(StatusCode::INTERNAL_SERVER_ERROR)
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .body("Internal Server Error")
    }
}

/// 扫码路由 `{scan_prefix}`
///
/// - GET /{token} - 解析并跳转
/// - GET /{token}/unlock - 密码表单
/// - POST /{token}/unlock - 提交密码（按 IP 限流）
pub fn scan_routes(scan_prefix: &str, unlock_limit: &UnlockRateLimit) -> actix_web::Scope {
    web::scope(scan_prefix)
        .route("/{token}/unlock", web::get().to(UnlockHandler::show_form))
        .route(
            "/{token}/unlock",
            web::post()
                .to(UnlockHandler::submit)
                .wrap(unlock_rate_limiter(unlock_limit)),
        )
        .route("/{token}", web::get().to(RedirectService::handle_scan))
}

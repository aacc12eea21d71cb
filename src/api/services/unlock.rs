//! 密码保护 code 的解锁端点

use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, KeyExtractor, SimpleKeyExtractionError,
};
use actix_web::cookie::{Cookie, SameSite};
use actix_web::dev::ServiceRequest;
use actix_web::{HttpRequest, HttpResponse, web};
use governor::middleware::NoOpMiddleware;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::api::constants::{NO_STORE, UNLOCK_ERROR_QUERY, UNLOCK_PASSWORD_FIELD};
use crate::config::{SecurityConfig, get_config};
use crate::errors::{QrlinkerError, Result};
use crate::resolver::{RedirectResolver, UnlockAttempt, UnlockService};
use crate::utils::is_valid_token;

/// 按连接 IP 限流解锁提交
///
/// 使用 TCP peer address，不读取 X-Forwarded-For
#[derive(Clone, Copy)]
pub struct UnlockKeyExtractor;

impl KeyExtractor for UnlockKeyExtractor {
    type Key = String;
    type KeyExtractionError = SimpleKeyExtractionError<&'static str>;

    fn extract(
        &self,
        req: &ServiceRequest,
    ) -> std::result::Result<Self::Key, Self::KeyExtractionError> {
        req.connection_info()
            .peer_addr()
            .map(str::to_string)
            .ok_or_else(|| SimpleKeyExtractionError::new("Unable to extract peer IP"))
    }
}

pub type UnlockRateLimit = GovernorConfig<UnlockKeyExtractor, NoOpMiddleware>;

/// 解锁提交的限流配置
///
/// 配置只构建一次并在所有 worker 间共享，计数器才是全局的
pub fn unlock_rate_limit(burst: u32, seconds_per_request: u64) -> Result<UnlockRateLimit> {
    let config = GovernorConfigBuilder::default()
        .seconds_per_request(seconds_per_request)
        .burst_size(burst)
        .key_extractor(UnlockKeyExtractor)
        .finish()
        .ok_or_else(|| {
            QrlinkerError::validation(format!(
                "invalid unlock rate limit: burst={}, seconds={}",
                burst, seconds_per_request
            ))
        })?;

    debug!(
        "Unlock rate limiter created: 1 req/{}s, burst {}",
        seconds_per_request, burst
    );
    Ok(config)
}

pub fn unlock_rate_limiter(
    config: &UnlockRateLimit,
) -> Governor<UnlockKeyExtractor, NoOpMiddleware> {
    Governor::new(config)
}

#[derive(Deserialize, Debug)]
pub struct UnlockForm {
    pub password: String,
}

pub struct UnlockHandler;

impl UnlockHandler {
    /// `GET /r/{token}/unlock`：最简密码表单
    pub async fn show_form(req: HttpRequest, path: web::Path<String>) -> HttpResponse {
        let token = path.into_inner();
        if !is_valid_token(&token) {
            return HttpResponse::NotFound().body("Not Found");
        }

        let failed = req.query_string() == UNLOCK_ERROR_QUERY;
        let notice = if failed {
            "<p role=\"alert\">Incorrect password.</p>"
        } else {
            ""
        };
        let body = format!(
            "<!doctype html><html><body>{notice}<form method=\"post\" action=\"{action}\">\
             <input type=\"password\" name=\"{field}\" autofocus required>\
             <button type=\"submit\">Unlock</button></form></body></html>",
            notice = notice,
            action = Self::unlock_path(&token),
            field = UNLOCK_PASSWORD_FIELD,
        );

        HttpResponse::Ok()
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .insert_header(("Cache-Control", NO_STORE))
            .body(body)
    }

    /// `POST /r/{token}/unlock`
    pub async fn submit(
        path: web::Path<String>,
        form: web::Form<UnlockForm>,
        resolver: web::Data<Arc<RedirectResolver>>,
    ) -> HttpResponse {
        let token = path.into_inner();
        if !is_valid_token(&token) {
            return Self::see_other(&get_config().routes.site_root);
        }

        match resolver.unlock(&token, &form.password).await {
            Ok(UnlockAttempt::Unlocked(unlock_token)) => {
                info!("Code {} unlocked", token);
                let ttl = resolver.unlock_service().ttl_minutes();
                let config = get_config();
                HttpResponse::SeeOther()
                    .insert_header(("Location", Self::scan_path(&token)))
                    .insert_header(("Cache-Control", NO_STORE))
                    .cookie(Self::unlock_cookie(&token, unlock_token, ttl, &config.security))
                    .finish()
            }
            Ok(UnlockAttempt::NotProtected) => Self::see_other(&Self::scan_path(&token)),
            Ok(UnlockAttempt::Rejected) => Self::see_other(&format!(
                "{}?{}",
                Self::unlock_path(&token),
                UNLOCK_ERROR_QUERY
            )),
            Err(e) => {
                error!("Unlock failed for {}: {}", token, e);
                HttpResponse::InternalServerError().body("Internal Server Error")
            }
        }
    }

    fn scan_path(token: &str) -> String {
        format!("{}/{}", get_config().routes.scan_prefix, token)
    }

    fn unlock_path(token: &str) -> String {
        format!("{}/unlock", Self::scan_path(token))
    }

    fn unlock_cookie(
        token: &str,
        value: String,
        ttl_minutes: u64,
        security: &SecurityConfig,
    ) -> Cookie<'static> {
        let mut cookie = Cookie::new(UnlockService::cookie_name(token), value);
        cookie.set_path(Self::scan_path(token));
        cookie.set_http_only(true);
        cookie.set_secure(security.cookie_secure);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_max_age(actix_web::cookie::time::Duration::minutes(ttl_minutes as i64));
        cookie
    }

    fn see_other(location: &str) -> HttpResponse {
        HttpResponse::SeeOther()
            .insert_header(("Location", location))
            .insert_header(("Cache-Control", NO_STORE))
            .finish()
    }
}

//! 访客标识与上游请求头
//!
//! 访客哈希与设备/地理字段都由上游（边缘网关）计算后以请求头传入，
//! 本服务只在缺失访客哈希时用 IP + User-Agent 兜底派生。

use actix_web::HttpRequest;
use sha2::{Digest, Sha256};

use crate::storage::ScanContext;

pub const VISITOR_HASH_HEADER: &str = "X-Visitor-Hash";
pub const DEVICE_TYPE_HEADER: &str = "X-Device-Type";
pub const BROWSER_HEADER: &str = "X-Browser";
pub const OS_HEADER: &str = "X-OS";
pub const COUNTRY_HEADER: &str = "X-Country";
pub const CITY_HEADER: &str = "X-City";

/// 访客哈希最大长度（与 assignments.visitor_hash 列宽一致）
const MAX_VISITOR_HASH_LEN: usize = 128;

/// 由 IP 与 User-Agent 派生访客哈希（SHA-256 十六进制）
pub fn derive_visitor_hash(ip: &str, user_agent: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ip.as_bytes());
    hasher.update(b"|");
    hasher.update(user_agent.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// 从请求头提取扫码所需的上游字段
pub struct ScanHeaders;

impl ScanHeaders {
    fn header(req: &HttpRequest, name: &str) -> Option<String> {
        req.headers()
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    }

    /// 访客哈希：优先上游头，否则兜底派生
    pub fn visitor_hash(req: &HttpRequest) -> String {
        if let Some(hash) = Self::header(req, VISITOR_HASH_HEADER)
            && hash.len() <= MAX_VISITOR_HASH_LEN
        {
            return hash;
        }

        let conn = req.connection_info();
        let ip = conn.realip_remote_addr().unwrap_or("unknown");
        let user_agent = req
            .headers()
            .get("user-agent")
            .and_then(|h| h.to_str().ok())
            .unwrap_or("");
        derive_visitor_hash(ip, user_agent)
    }

    pub fn scan_context(req: &HttpRequest) -> ScanContext {
        ScanContext {
            device_type: Self::header(req, DEVICE_TYPE_HEADER),
            browser: Self::header(req, BROWSER_HEADER),
            os: Self::header(req, OS_HEADER),
            country: Self::header(req, COUNTRY_HEADER),
            city: Self::header(req, CITY_HEADER),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_derive_visitor_hash_is_stable() {
        let a = derive_visitor_hash("203.0.113.7", "Mozilla/5.0");
        let b = derive_visitor_hash("203.0.113.7", "Mozilla/5.0");
        let c = derive_visitor_hash("203.0.113.8", "Mozilla/5.0");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|ch| matches!(ch, '0'..='9' | 'a'..='f')));
    }

    #[test]
    fn test_upstream_header_wins() {
        let req = TestRequest::default()
            .insert_header((VISITOR_HASH_HEADER, "v-123"))
            .to_http_request();
        assert_eq!(ScanHeaders::visitor_hash(&req), "v-123");
    }

    #[test]
    fn test_fallback_when_header_missing() {
        let req = TestRequest::default()
            .insert_header(("user-agent", "curl/8.0"))
            .to_http_request();
        let hash = ScanHeaders::visitor_hash(&req);
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_scan_context_ignores_blank_headers() {
        let req = TestRequest::default()
            .insert_header((DEVICE_TYPE_HEADER, "mobile"))
            .insert_header((COUNTRY_HEADER, "  "))
            .to_http_request();
        let ctx = ScanHeaders::scan_context(&req);
        assert_eq!(ctx.device_type.as_deref(), Some("mobile"));
        assert!(ctx.country.is_none());
        assert!(ctx.browser.is_none());
    }
}

//! 密码保护 code 的解锁凭证
//!
//! 密码校验成功后签发 HS256 JWT，写入 `qr_unlock_{token}` cookie。
//! 凭证绑定 code token 与当前密码哈希的指纹，修改密码即令旧凭证失效。

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::errors::Result;
use crate::storage::Code;

pub const UNLOCK_COOKIE_PREFIX: &str = "qr_unlock_";

#[derive(Debug, Serialize, Deserialize)]
pub struct UnlockClaims {
    /// code token
    pub sub: String,
    /// 密码哈希指纹
    pub fp: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct UnlockService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_minutes: u64,
}

impl UnlockService {
    pub fn new(secret: &str, ttl_minutes: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_minutes,
        }
    }

    pub fn from_config() -> Self {
        let config = crate::config::get_config();

        // 未配置密钥时随机生成，重启后旧凭证全部失效
        let secret = if config.security.unlock_secret.is_empty() {
            warn!("Unlock secret not configured, generating secure random token");
            crate::utils::generate_secure_token(32)
        } else {
            config.security.unlock_secret.clone()
        };

        Self::new(&secret, config.security.unlock_ttl_minutes)
    }

    pub fn cookie_name(token: &str) -> String {
        format!("{}{}", UNLOCK_COOKIE_PREFIX, token)
    }

    /// 密码哈希指纹：SHA-256 前 16 位十六进制
    pub fn fingerprint(password_hash: &str) -> String {
        let mut hex = format!("{:x}", Sha256::digest(password_hash.as_bytes()));
        hex.truncate(16);
        hex
    }

    /// 为 code 签发解锁凭证
    pub fn issue(&self, code: &Code) -> Result<String> {
        let now = Utc::now();
        let claims = UnlockClaims {
            sub: code.token.clone(),
            fp: Self::fingerprint(code.password_hash.as_deref().unwrap_or_default()),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.ttl_minutes as i64)).timestamp(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// 凭证对该 code 是否有效
    pub fn verify(&self, code: &Code, unlock_token: &str) -> bool {
        let Some(password_hash) = code.password_hash.as_deref() else {
            return true;
        };

        match decode::<UnlockClaims>(unlock_token, &self.decoding_key, &Validation::default()) {
            Ok(data) => {
                let valid =
                    data.claims.sub == code.token && data.claims.fp == Self::fingerprint(password_hash);
                if !valid {
                    debug!("Unlock token for {} does not match current code", code.token);
                }
                valid
            }
            Err(e) => {
                debug!("Unlock token rejected for {}: {}", code.token, e);
                false
            }
        }
    }

    pub fn ttl_minutes(&self) -> u64 {
        self.ttl_minutes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ContentPayload;

    fn create_test_service() -> UnlockService {
        UnlockService::new("test_unlock_secret_32_bytes_long", 60)
    }

    fn protected_code(token: &str, hash: &str) -> Code {
        let mut code = Code::new(
            "acct-1",
            token,
            &ContentPayload::Url {
                url: Some("https://example.com".to_string()),
            },
        );
        code.password_hash = Some(hash.to_string());
        code
    }

    #[test]
    fn test_issue_and_verify() {
        let service = create_test_service();
        let code = protected_code("menu", "$argon2id$v=19$m=19456,t=2,p=1$abc$def");
        let token = service.issue(&code).unwrap();
        assert!(service.verify(&code, &token));
    }

    #[test]
    fn test_token_bound_to_code() {
        let service = create_test_service();
        let hash = "$argon2id$v=19$m=19456,t=2,p=1$abc$def";
        let menu = protected_code("menu", hash);
        let other = protected_code("other", hash);

        let token = service.issue(&menu).unwrap();
        assert!(!service.verify(&other, &token));
    }

    #[test]
    fn test_password_change_invalidates() {
        let service = create_test_service();
        let mut code = protected_code("menu", "$argon2id$old");
        let token = service.issue(&code).unwrap();

        code.password_hash = Some("$argon2id$new".to_string());
        assert!(!service.verify(&code, &token));
    }

    #[test]
    fn test_wrong_secret_and_garbage_rejected() {
        let code = protected_code("menu", "$argon2id$hash");
        let token = create_test_service().issue(&code).unwrap();

        let other = UnlockService::new("different_secret_key_32_bytes!!!", 60);
        assert!(!other.verify(&code, &token));
        assert!(!create_test_service().verify(&code, "invalid.token.here"));
    }

    #[test]
    fn test_expired_token_rejected() {
        let code = protected_code("menu", "$argon2id$hash");
        let now = Utc::now();
        let claims = UnlockClaims {
            sub: "menu".to_string(),
            fp: UnlockService::fingerprint("$argon2id$hash"),
            iat: (now - Duration::hours(2)).timestamp(),
            exp: (now - Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test_unlock_secret_32_bytes_long"),
        )
        .unwrap();

        assert!(!create_test_service().verify(&code, &token));
    }

    #[test]
    fn test_cookie_name_and_fingerprint() {
        assert_eq!(UnlockService::cookie_name("menu"), "qr_unlock_menu");
        let fp = UnlockService::fingerprint("$argon2id$hash");
        assert_eq!(fp.len(), 16);
        assert_eq!(fp, UnlockService::fingerprint("$argon2id$hash"));
        // SHA-256("") 的前 8 字节
        assert_eq!(UnlockService::fingerprint(""), "e3b0c44298fc1c14");
    }
}

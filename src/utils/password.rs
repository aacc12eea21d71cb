//! 密码哈希工具模块
//!
//! 使用 Argon2id 算法对 code 的访问密码进行哈希和验证

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::errors::{QrlinkerError, Result};

/// 对密码进行 Argon2id 哈希
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| QrlinkerError::password_hash(e.to_string()))
}

/// 验证密码是否匹配哈希
///
/// 哈希本身无法解析时返回错误（存储数据损坏），密码不匹配返回 `Ok(false)`
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| QrlinkerError::password_hash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// 检测字符串是否是 Argon2 哈希格式
pub fn is_argon2_hash(s: &str) -> bool {
    s.starts_with("$argon2")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = "menu-2026";
        let hash = hash_password(password).expect("hash should succeed");

        assert!(is_argon2_hash(&hash));
        assert!(verify_password(password, &hash).expect("verify should succeed"));
        assert!(!verify_password("wrong", &hash).expect("verify should succeed"));
    }

    #[test]
    fn test_verify_rejects_corrupt_hash() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }
}

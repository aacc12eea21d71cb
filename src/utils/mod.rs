pub mod password;
pub mod visitor;

pub use visitor::{ScanHeaders, derive_visitor_hash};

/// token 允许的最大长度
pub const MAX_TOKEN_LENGTH: usize = 64;

/// 校验公开 token 格式：1-64 位字母、数字、`-`、`_`
///
/// 非法 token 直接按不存在处理，不触达数据库
pub fn is_valid_token(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= MAX_TOKEN_LENGTH
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// 生成随机字母数字串（用于未配置密钥时的兜底）
pub fn generate_secure_token(length: usize) -> String {
    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

    std::iter::repeat_with(|| CHARS[rand::random_range(0..CHARS.len())] as char)
        .take(length)
        .collect()
}

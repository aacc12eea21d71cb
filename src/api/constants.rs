//! API 模块常量定义

/// Admin API 版本段
pub const API_VERSION: &str = "/v1";

/// 解锁表单中的密码字段
pub const UNLOCK_PASSWORD_FIELD: &str = "password";

/// 解锁失败时附加到解锁页的查询参数
pub const UNLOCK_ERROR_QUERY: &str = "error=invalid";

/// 扫码跳转不允许被缓存，否则扫码不会到达服务端
pub const NO_STORE: &str = "no-cache, no-store, must-revalidate";

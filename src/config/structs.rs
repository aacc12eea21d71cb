use serde::{Deserialize, Serialize};

/// 静态配置（从 TOML + 环境变量加载，启动时使用）
///
/// - server: 监听地址、端口、worker 数量
/// - database: 数据库连接与重试
/// - logging: 日志输出
/// - routes: 各终态的跳转路径
/// - security: 解锁 token 与 Admin API token
/// - experiment: 实验统计参数
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub experiment: ExperimentConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：QR，分隔符：__
    /// 示例：QR__SERVER__PORT=9999
    pub fn load() -> Self {
        Self::load_from("config.toml")
    }

    pub fn load_from(path: &str) -> Self {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("QR")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 终态跳转路径
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutesConfig {
    /// code 不存在时跳转的站点首页
    #[serde(default = "default_site_root")]
    pub site_root: String,
    #[serde(default = "default_expired_path")]
    pub expired_path: String,
    #[serde(default = "default_not_active_path")]
    pub not_active_path: String,
    /// 公开扫码路径前缀，/r/{token}
    #[serde(default = "default_scan_prefix")]
    pub scan_prefix: String,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

/// 安全相关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// 解锁 token 的 HS256 密钥，留空则启动时随机生成（重启后旧解锁失效）
    #[serde(default)]
    pub unlock_secret: String,
    #[serde(default = "default_unlock_ttl_minutes")]
    pub unlock_ttl_minutes: u64,
    /// Admin API Bearer token，留空则禁用 Admin API
    #[serde(default)]
    pub admin_token: String,
    /// 解锁 cookie 是否带 Secure（HTTPS 部署时开启）
    #[serde(default)]
    pub cookie_secure: bool,
    /// 解锁提交限流：每个 IP 的突发上限
    #[serde(default = "default_unlock_rate_burst")]
    pub unlock_rate_burst: u32,
    /// 解锁提交限流：令牌补充间隔（秒）
    #[serde(default = "default_unlock_rate_seconds")]
    pub unlock_rate_seconds: u64,
}

/// 实验统计配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default = "default_target_confidence")]
    pub default_target_confidence: f64,
    #[serde(default = "default_min_sample")]
    pub min_sample: u64,
    #[serde(default = "default_max_scans_needed")]
    pub max_scans_needed: u64,
}

// ============================================================
// Default value functions
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_database_url() -> String {
    "sqlite://qrlinker.db?mode=rwc".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_database_timeout() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_site_root() -> String {
    "/".to_string()
}

fn default_expired_path() -> String {
    "/expired".to_string()
}

fn default_not_active_path() -> String {
    "/not-active".to_string()
}

fn default_scan_prefix() -> String {
    "/r".to_string()
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_unlock_ttl_minutes() -> u64 {
    60 * 24
}

fn default_unlock_rate_burst() -> u32 {
    5
}

fn default_unlock_rate_seconds() -> u64 {
    1
}

fn default_target_confidence() -> f64 {
    0.95
}

fn default_min_sample() -> u64 {
    30
}

fn default_max_scans_needed() -> u64 {
    10_000
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_database_timeout(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            site_root: default_site_root(),
            expired_path: default_expired_path(),
            not_active_path: default_not_active_path(),
            scan_prefix: default_scan_prefix(),
            api_prefix: default_api_prefix(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            unlock_secret: String::new(),
            unlock_ttl_minutes: default_unlock_ttl_minutes(),
            admin_token: String::new(),
            cookie_secure: false,
            unlock_rate_burst: default_unlock_rate_burst(),
            unlock_rate_seconds: default_unlock_rate_seconds(),
        }
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            default_target_confidence: default_target_confidence(),
            min_sample: default_min_sample(),
            max_scans_needed: default_max_scans_needed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_public_routes() {
        let config = StaticConfig::default();
        assert_eq!(config.routes.site_root, "/");
        assert_eq!(config.routes.expired_path, "/expired");
        assert_eq!(config.routes.not_active_path, "/not-active");
        assert_eq!(config.routes.scan_prefix, "/r");
        assert_eq!(config.experiment.min_sample, 30);
        assert_eq!(config.experiment.max_scans_needed, 10_000);
    }

    #[test]
    fn test_sample_config_roundtrips_through_toml() {
        let sample = StaticConfig::generate_sample_config();
        assert!(sample.contains("[server]"));
        assert!(sample.contains("[experiment]"));

        let parsed: StaticConfig = toml::from_str(&sample).expect("sample config should parse");
        assert_eq!(parsed.server.port, 8080);
        assert_eq!(parsed.security.unlock_ttl_minutes, 60 * 24);
        assert!(!parsed.security.cookie_secure);
        assert_eq!(parsed.security.unlock_rate_burst, 5);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: StaticConfig = toml::from_str(
            r#"
            [routes]
            site_root = "https://qr.example.com"
            "#,
        )
        .expect("partial config should parse");
        assert_eq!(parsed.routes.site_root, "https://qr.example.com");
        assert_eq!(parsed.routes.expired_path, "/expired");
        assert_eq!(parsed.database.retry_count, 3);
    }
}

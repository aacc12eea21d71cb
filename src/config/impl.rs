use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::StaticConfig;

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Returns an Arc pointer to the configuration, which is cheap to clone
/// and doesn't hold any locks. Falls back to defaults if `init_config()`
/// was never called (library / test usage).
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get_or_init(|| ArcSwap::from_pointee(StaticConfig::default()))
        .load_full()
}

/// Initialize the global configuration
///
/// Loads configuration from "config.toml" in the current directory,
/// overlaid by `QR__*` environment variables.
///
/// # Examples
/// ```no_run
/// use qrlinker::config::init_config;
/// init_config();
/// ```
pub fn init_config() {
    init_config_with(StaticConfig::load());
}

/// 使用给定配置初始化（测试中用于注入自定义配置）
///
/// 若已初始化则原子替换。
pub fn init_config_with(config: StaticConfig) {
    match CONFIG.get() {
        Some(current) => current.store(Arc::new(config)),
        None => {
            if let Err(config) = CONFIG.set(ArcSwap::from_pointee(config)) {
                // 并发初始化时另一方先写入，覆盖之
                if let Some(current) = CONFIG.get() {
                    current.store(config.load_full());
                }
            }
        }
    }
}

pub mod admin;
mod health;
mod redirect;
mod unlock;

pub use health::{AppStartTime, HealthService, health_routes};
pub use redirect::{RedirectService, scan_routes};
pub use unlock::{
    UnlockForm, UnlockHandler, UnlockKeyExtractor, UnlockRateLimit, unlock_rate_limit,
    unlock_rate_limiter,
};

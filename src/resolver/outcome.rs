use serde::Serialize;

use crate::config::RoutesConfig;

/// 解析的终态
///
/// 门禁失败也是正常结果，不是错误。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    NotFound,
    Expired,
    NotYetActive,
    NotActive,
    PasswordRequired { token: String },
    Landing { token: String, content_type: String },
    Redirect { location: String },
}

impl Outcome {
    /// 对应的 Location
    pub fn location(&self, routes: &RoutesConfig) -> String {
        match self {
            Outcome::NotFound => routes.site_root.clone(),
            Outcome::Expired => routes.expired_path.clone(),
            Outcome::NotYetActive => format!("{}?reason=early", routes.not_active_path),
            Outcome::NotActive => format!("{}?reason=ended", routes.not_active_path),
            Outcome::PasswordRequired { token } => {
                format!("{}/{}/unlock", routes.scan_prefix, urlencoding::encode(token))
            }
            Outcome::Landing {
                token,
                content_type,
            } => format!(
                "{}/{}/{}",
                routes.scan_prefix,
                urlencoding::encode(token),
                content_type
            ),
            Outcome::Redirect { location } => location.clone(),
        }
    }

    /// 是否产生了目标（只有这种情况才记录扫码）
    pub fn is_destination(&self) -> bool {
        matches!(self, Outcome::Landing { .. } | Outcome::Redirect { .. })
    }
}

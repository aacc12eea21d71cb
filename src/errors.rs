use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone)]
pub enum QrlinkerError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Validation(String),
    NotFound(String),
    Conflict(String),
    Serialization(String),
    /// 运行中的实验没有任何 variant（数据完整性问题，需要告警）
    NoVariantsConfigured(String),
    /// 存储的 content 与 content_type 不匹配
    MalformedContent(String),
    PasswordHash(String),
    Token(String),
}

impl QrlinkerError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            QrlinkerError::DatabaseConfig(_) => "E001",
            QrlinkerError::DatabaseConnection(_) => "E002",
            QrlinkerError::DatabaseOperation(_) => "E003",
            QrlinkerError::Validation(_) => "E004",
            QrlinkerError::NotFound(_) => "E005",
            QrlinkerError::Conflict(_) => "E006",
            QrlinkerError::Serialization(_) => "E007",
            QrlinkerError::NoVariantsConfigured(_) => "E008",
            QrlinkerError::MalformedContent(_) => "E009",
            QrlinkerError::PasswordHash(_) => "E010",
            QrlinkerError::Token(_) => "E011",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            QrlinkerError::DatabaseConfig(_) => "Database Configuration Error",
            QrlinkerError::DatabaseConnection(_) => "Database Connection Error",
            QrlinkerError::DatabaseOperation(_) => "Database Operation Error",
            QrlinkerError::Validation(_) => "Validation Error",
            QrlinkerError::NotFound(_) => "Resource Not Found",
            QrlinkerError::Conflict(_) => "Conflict",
            QrlinkerError::Serialization(_) => "Serialization Error",
            QrlinkerError::NoVariantsConfigured(_) => "No Variants Configured",
            QrlinkerError::MalformedContent(_) => "Malformed Content",
            QrlinkerError::PasswordHash(_) => "Password Hash Error",
            QrlinkerError::Token(_) => "Token Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            QrlinkerError::DatabaseConfig(msg)
            | QrlinkerError::DatabaseConnection(msg)
            | QrlinkerError::DatabaseOperation(msg)
            | QrlinkerError::Validation(msg)
            | QrlinkerError::NotFound(msg)
            | QrlinkerError::Conflict(msg)
            | QrlinkerError::Serialization(msg)
            | QrlinkerError::NoVariantsConfigured(msg)
            | QrlinkerError::MalformedContent(msg)
            | QrlinkerError::PasswordHash(msg)
            | QrlinkerError::Token(msg) => msg,
        }
    }

    /// 需要通知 code 所有者 / 运维的错误
    pub fn needs_operator_alert(&self) -> bool {
        matches!(
            self,
            QrlinkerError::NoVariantsConfigured(_) | QrlinkerError::MalformedContent(_)
        )
    }

    /// 映射为 HTTP 状态码（Admin API 使用）
    pub fn http_status(&self) -> StatusCode {
        match self {
            QrlinkerError::Validation(_) | QrlinkerError::NoVariantsConfigured(_) => {
                StatusCode::BAD_REQUEST
            }
            QrlinkerError::NotFound(_) => StatusCode::NOT_FOUND,
            QrlinkerError::Conflict(_) => StatusCode::CONFLICT,
            QrlinkerError::Token(_) => StatusCode::UNAUTHORIZED,
            QrlinkerError::DatabaseConfig(_)
            | QrlinkerError::DatabaseConnection(_)
            | QrlinkerError::DatabaseOperation(_)
            | QrlinkerError::Serialization(_)
            | QrlinkerError::MalformedContent(_)
            | QrlinkerError::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为彩色输出（用于 Server 模式）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出（用于 CLI 模式）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for QrlinkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for QrlinkerError {}

// 便捷的构造函数
impl QrlinkerError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        QrlinkerError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        QrlinkerError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        QrlinkerError::DatabaseOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        QrlinkerError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        QrlinkerError::NotFound(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        QrlinkerError::Conflict(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        QrlinkerError::Serialization(msg.into())
    }

    pub fn no_variants_configured<T: Into<String>>(msg: T) -> Self {
        QrlinkerError::NoVariantsConfigured(msg.into())
    }

    pub fn malformed_content<T: Into<String>>(msg: T) -> Self {
        QrlinkerError::MalformedContent(msg.into())
    }

    pub fn password_hash<T: Into<String>>(msg: T) -> Self {
        QrlinkerError::PasswordHash(msg.into())
    }

    pub fn token<T: Into<String>>(msg: T) -> Self {
        QrlinkerError::Token(msg.into())
    }
}

impl From<sea_orm::DbErr> for QrlinkerError {
    fn from(err: sea_orm::DbErr) -> Self {
        QrlinkerError::DatabaseOperation(err.to_string())
    }
}

impl From<serde_json::Error> for QrlinkerError {
    fn from(err: serde_json::Error) -> Self {
        QrlinkerError::Serialization(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for QrlinkerError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        QrlinkerError::Token(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, QrlinkerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let errors = [
            QrlinkerError::database_config("x"),
            QrlinkerError::database_connection("x"),
            QrlinkerError::database_operation("x"),
            QrlinkerError::validation("x"),
            QrlinkerError::not_found("x"),
            QrlinkerError::conflict("x"),
            QrlinkerError::serialization("x"),
            QrlinkerError::no_variants_configured("x"),
            QrlinkerError::malformed_content("x"),
            QrlinkerError::password_hash("x"),
            QrlinkerError::token("x"),
        ];
        let mut codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_operator_alert_only_for_integrity_faults() {
        assert!(QrlinkerError::no_variants_configured("exp-1").needs_operator_alert());
        assert!(QrlinkerError::malformed_content("sms").needs_operator_alert());
        assert!(!QrlinkerError::not_found("abc").needs_operator_alert());
        assert!(!QrlinkerError::database_operation("boom").needs_operator_alert());
    }

    #[test]
    fn test_display_uses_simple_format() {
        let err = QrlinkerError::conflict("experiment already running");
        assert_eq!(err.to_string(), "Conflict: experiment already running");
        assert_eq!(err.http_status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_db_err_conversion() {
        let err: QrlinkerError = sea_orm::DbErr::Custom("locked".to_string()).into();
        assert!(matches!(err, QrlinkerError::DatabaseOperation(_)));
        assert!(err.message().contains("locked"));
    }
}

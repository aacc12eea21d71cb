//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::QrlinkerError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字。按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 3000-3099: 实验错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    Unauthorized = 1001,
    NotFound = 1004,
    InternalServerError = 1005,
    DatabaseError = 1006,
    Conflict = 1009,

    // 实验错误 3000-3099
    ExperimentNoVariants = 3000,
}

impl From<&QrlinkerError> for ErrorCode {
    fn from(err: &QrlinkerError) -> Self {
        match err {
            QrlinkerError::Validation(_) => ErrorCode::BadRequest,
            QrlinkerError::NotFound(_) => ErrorCode::NotFound,
            QrlinkerError::Conflict(_) => ErrorCode::Conflict,
            QrlinkerError::NoVariantsConfigured(_) => ErrorCode::ExperimentNoVariants,
            QrlinkerError::Token(_) => ErrorCode::Unauthorized,
            QrlinkerError::DatabaseConfig(_)
            | QrlinkerError::DatabaseConnection(_)
            | QrlinkerError::DatabaseOperation(_) => ErrorCode::DatabaseError,
            QrlinkerError::Serialization(_)
            | QrlinkerError::MalformedContent(_)
            | QrlinkerError::PasswordHash(_) => ErrorCode::InternalServerError,
        }
    }
}

//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::errors::TrackerError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字。按千位分域：
/// - 1000-1099: 通用错误
/// - 2000-2099: 认证错误
/// - 3000-3099: 短码错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    // 通用错误 1000-1099
    BadRequest = 1000,
    NotFound = 1004,
    InternalServerError = 1005,
    ServiceUnavailable = 1030,

    // 认证错误 2000-2099
    Unauthorized = 2000,
    Forbidden = 2001,

    // 短码错误 3000-3099
    CodeInvalid = 3000,
    CodeTaken = 3001,
    CodeAlreadyCustomized = 3002,
    CodeFinalized = 3003,
    CodeExhausted = 3004,
}

impl From<&TrackerError> for ErrorCode {
    fn from(err: &TrackerError) -> Self {
        match err {
            TrackerError::InvalidFormat(_) => ErrorCode::CodeInvalid,
            TrackerError::CodeTaken(_) => ErrorCode::CodeTaken,
            TrackerError::AlreadyCustomized(_) => ErrorCode::CodeAlreadyCustomized,
            TrackerError::Finalized(_) => ErrorCode::CodeFinalized,
            TrackerError::RegistrationExhausted(_) => ErrorCode::CodeExhausted,
            TrackerError::NotFound(_) => ErrorCode::NotFound,
            TrackerError::Unauthenticated(_) => ErrorCode::Unauthorized,
            TrackerError::Forbidden(_) => ErrorCode::Forbidden,
            TrackerError::StorageUnavailable(_) | TrackerError::DatabaseConnection(_) => {
                ErrorCode::ServiceUnavailable
            }
            TrackerError::DatabaseConfig(_)
            | TrackerError::Serialization(_)
            | TrackerError::FileOperation(_) => ErrorCode::InternalServerError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_number() {
        assert_eq!(serde_json::to_string(&ErrorCode::CodeTaken).unwrap(), "3001");
        let parsed: ErrorCode = serde_json::from_str("3002").unwrap();
        assert_eq!(parsed, ErrorCode::CodeAlreadyCustomized);
    }

    #[test]
    fn test_taken_and_already_customized_are_distinct() {
        assert_ne!(
            ErrorCode::from(&TrackerError::code_taken("x")),
            ErrorCode::from(&TrackerError::already_customized("x"))
        );
    }
}

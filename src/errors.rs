use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    InvalidFormat(String),
    CodeTaken(String),
    AlreadyCustomized(String),
    Finalized(String),
    NotFound(String),
    Unauthenticated(String),
    Forbidden(String),
    StorageUnavailable(String),
    RegistrationExhausted(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    Serialization(String),
    FileOperation(String),
}

impl TrackerError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            TrackerError::InvalidFormat(_) => "E001",
            TrackerError::CodeTaken(_) => "E002",
            TrackerError::AlreadyCustomized(_) => "E003",
            TrackerError::Finalized(_) => "E004",
            TrackerError::NotFound(_) => "E005",
            TrackerError::Unauthenticated(_) => "E006",
            TrackerError::Forbidden(_) => "E007",
            TrackerError::StorageUnavailable(_) => "E008",
            TrackerError::RegistrationExhausted(_) => "E009",
            TrackerError::DatabaseConfig(_) => "E010",
            TrackerError::DatabaseConnection(_) => "E011",
            TrackerError::Serialization(_) => "E012",
            TrackerError::FileOperation(_) => "E013",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            TrackerError::InvalidFormat(_) => "Invalid Format",
            TrackerError::CodeTaken(_) => "Code Taken",
            TrackerError::AlreadyCustomized(_) => "Already Customized",
            TrackerError::Finalized(_) => "Code Finalized",
            TrackerError::NotFound(_) => "Resource Not Found",
            TrackerError::Unauthenticated(_) => "Unauthenticated",
            TrackerError::Forbidden(_) => "Forbidden",
            TrackerError::StorageUnavailable(_) => "Storage Unavailable",
            TrackerError::RegistrationExhausted(_) => "Registration Exhausted",
            TrackerError::DatabaseConfig(_) => "Database Configuration Error",
            TrackerError::DatabaseConnection(_) => "Database Connection Error",
            TrackerError::Serialization(_) => "Serialization Error",
            TrackerError::FileOperation(_) => "File Operation Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            TrackerError::InvalidFormat(msg)
            | TrackerError::CodeTaken(msg)
            | TrackerError::AlreadyCustomized(msg)
            | TrackerError::Finalized(msg)
            | TrackerError::NotFound(msg)
            | TrackerError::Unauthenticated(msg)
            | TrackerError::Forbidden(msg)
            | TrackerError::StorageUnavailable(msg)
            | TrackerError::RegistrationExhausted(msg)
            | TrackerError::DatabaseConfig(msg)
            | TrackerError::DatabaseConnection(msg)
            | TrackerError::Serialization(msg)
            | TrackerError::FileOperation(msg) => msg,
        }
    }

    /// HTTP 状态码映射
    pub fn http_status(&self) -> StatusCode {
        match self {
            TrackerError::InvalidFormat(_)
            | TrackerError::CodeTaken(_)
            | TrackerError::AlreadyCustomized(_)
            | TrackerError::Finalized(_) => StatusCode::BAD_REQUEST,
            TrackerError::RegistrationExhausted(_) => StatusCode::CONFLICT,
            TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
            TrackerError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            TrackerError::Forbidden(_) => StatusCode::FORBIDDEN,
            TrackerError::StorageUnavailable(_)
            | TrackerError::DatabaseConfig(_)
            | TrackerError::DatabaseConnection(_)
            | TrackerError::Serialization(_)
            | TrackerError::FileOperation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 调用方可自行修正的错误（无需重试）
    pub fn is_client_error(&self) -> bool {
        self.http_status().is_client_error()
    }

    /// 格式化为彩色输出（用于 Server 模式）
    #[cfg(feature = "server")]
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

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for TrackerError {}

// 便捷的构造函数
impl TrackerError {
    pub fn invalid_format<T: Into<String>>(msg: T) -> Self {
        TrackerError::InvalidFormat(msg.into())
    }

    pub fn code_taken<T: Into<String>>(msg: T) -> Self {
        TrackerError::CodeTaken(msg.into())
    }

    pub fn already_customized<T: Into<String>>(msg: T) -> Self {
        TrackerError::AlreadyCustomized(msg.into())
    }

    pub fn finalized<T: Into<String>>(msg: T) -> Self {
        TrackerError::Finalized(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        TrackerError::NotFound(msg.into())
    }

    pub fn unauthenticated<T: Into<String>>(msg: T) -> Self {
        TrackerError::Unauthenticated(msg.into())
    }

    pub fn forbidden<T: Into<String>>(msg: T) -> Self {
        TrackerError::Forbidden(msg.into())
    }

    pub fn storage_unavailable<T: Into<String>>(msg: T) -> Self {
        TrackerError::StorageUnavailable(msg.into())
    }

    pub fn registration_exhausted<T: Into<String>>(msg: T) -> Self {
        TrackerError::RegistrationExhausted(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        TrackerError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        TrackerError::DatabaseConnection(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        TrackerError::Serialization(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        TrackerError::FileOperation(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for TrackerError {
    fn from(err: sea_orm::DbErr) -> Self {
        TrackerError::StorageUnavailable(err.to_string())
    }
}

impl From<std::io::Error> for TrackerError {
    fn from(err: std::io::Error) -> Self {
        TrackerError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::Serialization(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for TrackerError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        TrackerError::Unauthenticated(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_400() {
        for err in [
            TrackerError::invalid_format("x"),
            TrackerError::code_taken("x"),
            TrackerError::already_customized("x"),
            TrackerError::finalized("x"),
        ] {
            assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
            assert!(err.is_client_error());
        }
    }

    #[test]
    fn test_storage_error_is_500() {
        let err: TrackerError = sea_orm::DbErr::Custom("boom".to_string()).into();
        assert!(matches!(err, TrackerError::StorageUnavailable(_)));
        assert_eq!(err.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_code_taken_distinct_from_already_customized() {
        let taken = TrackerError::code_taken("jane");
        let customized = TrackerError::already_customized("jane");
        assert_ne!(taken.code(), customized.code());
        assert_ne!(taken.error_type(), customized.error_type());
    }

    #[test]
    fn test_format_simple() {
        let err = TrackerError::not_found("profile p-1");
        assert_eq!(err.format_simple(), "Resource Not Found: profile p-1");
        assert_eq!(err.to_string(), err.format_simple());
    }
}

//! URL 验证模块
//!
//! 验证短链接目标地址，阻止危险协议

use url::Url;

/// URL 验证错误
#[derive(Debug)]
pub enum UrlValidationError {
    EmptyUrl,
    InvalidProtocol(String),
    DangerousProtocol(String),
    InvalidFormat(String),
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "URL cannot be empty"),
            Self::InvalidProtocol(proto) => write!(
                f,
                "Invalid protocol: {}. Only http://, https:// or a site path are allowed",
                proto
            ),
            Self::DangerousProtocol(proto) => {
                write!(f, "Dangerous protocol blocked: {}", proto)
            }
            Self::InvalidFormat(msg) => write!(f, "Invalid URL format: {}", msg),
        }
    }
}

impl std::error::Error for UrlValidationError {}

const DANGEROUS_PROTOCOLS: &[&str] = &[
    "javascript:",
    "data:",
    "file:",
    "vbscript:",
    "about:",
    "blob:",
];

/// 站内相对路径（排除 `//host` 这种协议相对地址）
pub fn is_site_path(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//") && !url.contains('\\')
}

/// 验证短链接目标
///
/// 允许 `http(s)://` 绝对地址或以 `/` 开头的站内路径。
pub fn validate_target_url(url: &str) -> Result<(), UrlValidationError> {
    let url = url.trim();

    if url.is_empty() {
        return Err(UrlValidationError::EmptyUrl);
    }

    if is_site_path(url) {
        return Url::parse("http://localhost")
            .and_then(|base| base.join(url))
            .map(|_| ())
            .map_err(|e| UrlValidationError::InvalidFormat(e.to_string()));
    }

    let url_lower = url.to_lowercase();

    for proto in DANGEROUS_PROTOCOLS {
        if url_lower.starts_with(proto) {
            return Err(UrlValidationError::DangerousProtocol(proto.to_string()));
        }
    }

    if !url_lower.starts_with("http://") && !url_lower.starts_with("https://") {
        let proto = url_lower
            .split(':')
            .next()
            .map(|s| format!("{}:", s))
            .unwrap_or_default();
        return Err(UrlValidationError::InvalidProtocol(proto));
    }

    Url::parse(url).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    Ok(())
}

/// 将站内路径拼接到 base URL；绝对地址原样返回
pub fn resolve_target(base_url: &str, target: &str) -> String {
    if !is_site_path(target) {
        return target.to_string();
    }
    match Url::parse(base_url).and_then(|base| base.join(target)) {
        Ok(joined) => joined.to_string(),
        Err(_) => format!("{}{}", base_url.trim_end_matches('/'), target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_targets() {
        assert!(validate_target_url("https://example.com").is_ok());
        assert!(validate_target_url("https://example.com/path?query=1").is_ok());
        assert!(validate_target_url("http://localhost:8080").is_ok());
        assert!(validate_target_url("/start-filing").is_ok());
        assert!(validate_target_url("/").is_ok());
    }

    #[test]
    fn test_dangerous_protocols() {
        assert!(matches!(
            validate_target_url("javascript:alert(1)"),
            Err(UrlValidationError::DangerousProtocol(_))
        ));
        assert!(matches!(
            validate_target_url("JAVASCRIPT:alert(1)"),
            Err(UrlValidationError::DangerousProtocol(_))
        ));
        assert!(matches!(
            validate_target_url("data:text/html,<script>alert(1)</script>"),
            Err(UrlValidationError::DangerousProtocol(_))
        ));
    }

    #[test]
    fn test_rejected_targets() {
        assert!(matches!(
            validate_target_url(""),
            Err(UrlValidationError::EmptyUrl)
        ));
        assert!(matches!(
            validate_target_url("ftp://example.com"),
            Err(UrlValidationError::InvalidProtocol(_))
        ));
        assert!(validate_target_url("//evil.example").is_err());
        assert!(validate_target_url("start-filing").is_err());
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(
            resolve_target("https://tax.example", "/start-filing"),
            "https://tax.example/start-filing"
        );
        assert_eq!(
            resolve_target("https://tax.example/", "https://other.example/x"),
            "https://other.example/x"
        );
    }
}

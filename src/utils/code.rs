//! 短码校验与生成
//!
//! Tracking codes, short-link codes and derived slugs share one grammar:
//! `[a-z0-9-]{3,30}`.

use serde::Serialize;

pub const MIN_CODE_LEN: usize = 3;
pub const MAX_CODE_LEN: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeValidationError {
    Empty,
    TooShort(usize),
    TooLong(usize),
    InvalidChar(char),
}

impl std::fmt::Display for CodeValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Code cannot be empty"),
            Self::TooShort(len) => write!(
                f,
                "Code must be at least {} characters (got {})",
                MIN_CODE_LEN, len
            ),
            Self::TooLong(len) => write!(
                f,
                "Code must be at most {} characters (got {})",
                MAX_CODE_LEN, len
            ),
            Self::InvalidChar(c) => write!(
                f,
                "Invalid character '{}': only lowercase letters, digits and '-' are allowed",
                c.escape_default()
            ),
        }
    }
}

impl std::error::Error for CodeValidationError {}

fn is_code_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'
}

/// 校验短码格式（不做任何 I/O）
pub fn validate_code(code: &str) -> Result<(), CodeValidationError> {
    if code.is_empty() {
        return Err(CodeValidationError::Empty);
    }
    if let Some(bad) = code.chars().find(|c| !is_code_char(*c)) {
        return Err(CodeValidationError::InvalidChar(bad));
    }
    // 字符集已限定为 ASCII，字节长度即字符数
    let len = code.len();
    if len < MIN_CODE_LEN {
        return Err(CodeValidationError::TooShort(len));
    }
    if len > MAX_CODE_LEN {
        return Err(CodeValidationError::TooLong(len));
    }
    Ok(())
}

#[inline]
pub fn is_valid_code(code: &str) -> bool {
    validate_code(code).is_ok()
}

/// Result shape returned by the short-code format check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CodeValidation {
    pub fn check(code: &str) -> Self {
        match validate_code(code) {
            Ok(()) => Self {
                valid: true,
                error: None,
            },
            Err(e) => Self {
                valid: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// 大小写不敏感的比较键
pub fn normalize_code(input: &str) -> String {
    input.trim().to_ascii_lowercase()
}

/// Derive a code base from a display name.
///
/// Lowercase ASCII alphanumerics are kept, every run of anything else
/// collapses into a single `-`, and the result is trimmed and cut to
/// [`MAX_CODE_LEN`].
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    truncate_code(&slug, MAX_CODE_LEN)
}

/// 截断到 `max` 并去掉末尾的 '-'
fn truncate_code(code: &str, max: usize) -> String {
    let cut = if code.len() > max { &code[..max] } else { code };
    cut.trim_end_matches('-').to_string()
}

/// 第 `attempt` 次尝试的候选码：0 为 base，k ≥ 1 为 `<base>-<k+1>`
pub fn candidate_code(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        return truncate_code(base, MAX_CODE_LEN);
    }
    let suffix = format!("-{}", attempt + 1);
    let room = MAX_CODE_LEN.saturating_sub(suffix.len());
    format!("{}{}", truncate_code(base, room), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_codes() {
        for code in ["abc", "jane-doe", "abc123", "---", "a1-b2-c3", &"x".repeat(30)] {
            assert!(is_valid_code(code), "{} should be valid", code);
            assert!(CodeValidation::check(code).valid);
        }
    }

    #[test]
    fn test_invalid_codes() {
        assert_eq!(validate_code(""), Err(CodeValidationError::Empty));
        assert_eq!(validate_code("ab"), Err(CodeValidationError::TooShort(2)));
        assert_eq!(
            validate_code(&"a".repeat(31)),
            Err(CodeValidationError::TooLong(31))
        );
        assert_eq!(
            validate_code("Jane"),
            Err(CodeValidationError::InvalidChar('J'))
        );
        assert_eq!(
            validate_code("jane doe"),
            Err(CodeValidationError::InvalidChar(' '))
        );
        assert!(!is_valid_code("jane_doe"));
        assert!(!is_valid_code("jané"));

        let result = CodeValidation::check("ABC");
        assert!(!result.valid);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Jane Doe"), "jane-doe");
        assert_eq!(slugify("  O'Brien & Sons, LLC  "), "o-brien-sons-llc");
        assert_eq!(slugify("Zoë"), "zo");
        assert_eq!(slugify("!!!"), "");
        let long = slugify("Alexandria Catherine Montgomery-Smithson");
        assert!(long.len() <= MAX_CODE_LEN);
        assert!(!long.ends_with('-'));
        assert!(is_valid_code(&long));
    }

    #[test]
    fn test_candidate_code_suffixes() {
        assert_eq!(candidate_code("jane-doe", 0), "jane-doe");
        assert_eq!(candidate_code("jane-doe", 1), "jane-doe-2");
        assert_eq!(candidate_code("jane-doe", 9), "jane-doe-10");

        let base = "a".repeat(30);
        let c = candidate_code(&base, 1);
        assert_eq!(c.len(), 30);
        assert!(c.ends_with("-2"));
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  Jane-D \n"), "jane-d");
    }
}

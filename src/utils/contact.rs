//! Lead contact normalization used as lookup keys.

use crate::errors::{Result, TrackerError};

/// trim + lowercase；空字符串视为未提供
pub fn normalize_email(raw: Option<&str>) -> Result<Option<String>> {
    let Some(email) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let email = email.to_lowercase();

    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && domain.contains('.') && !domain.contains('@') =>
        {
            Ok(Some(email))
        }
        _ => Err(TrackerError::invalid_format(format!(
            "Invalid email address: '{}'",
            email
        ))),
    }
}

/// Keep digits only; an 11-digit number with a leading `1` loses the country code.
pub fn normalize_phone(raw: Option<&str>) -> Result<Option<String>> {
    let Some(phone) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let mut digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 11 && digits.starts_with('1') {
        digits.remove(0);
    }

    if !(7..=15).contains(&digits.len()) {
        return Err(TrackerError::invalid_format(format!(
            "Invalid phone number: '{}'",
            phone
        )));
    }
    Ok(Some(digits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email(Some("  Ann@Example.COM ")).unwrap(),
            Some("ann@example.com".to_string())
        );
        assert_eq!(normalize_email(Some("   ")).unwrap(), None);
        assert_eq!(normalize_email(None).unwrap(), None);
        assert!(normalize_email(Some("not-an-email")).is_err());
        assert!(normalize_email(Some("@example.com")).is_err());
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(
            normalize_phone(Some("+1 (555) 010-2030")).unwrap(),
            Some("5550102030".to_string())
        );
        assert_eq!(
            normalize_phone(Some("555.010.2030")).unwrap(),
            Some("5550102030".to_string())
        );
        assert_eq!(normalize_phone(Some("")).unwrap(), None);
        assert!(normalize_phone(Some("12")).is_err());
    }
}

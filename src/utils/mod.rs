pub mod code;
pub mod contact;
pub mod url_validator;

pub use code::{
    CodeValidation, CodeValidationError, candidate_code, is_valid_code, normalize_code, slugify,
    validate_code,
};
pub use contact::{normalize_email, normalize_phone};
pub use url_validator::{resolve_target, validate_target_url};

/// 生成随机小写字母数字码
pub fn generate_random_code(length: usize) -> String {
    use std::iter;

    let chars = b"abcdefghijklmnopqrstuvwxyz0123456789";

    iter::repeat_with(|| chars[rand::random_range(0..chars.len())] as char)
        .take(length)
        .collect()
}

/// 生成随机密钥（线程本地 CSPRNG）
pub fn generate_secure_token(length: usize) -> String {
    use std::iter;

    let chars = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

    iter::repeat_with(|| chars[rand::random_range(0..chars.len())] as char)
        .take(length)
        .collect()
}

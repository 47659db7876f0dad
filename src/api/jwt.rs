use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::AuthConfig;
use crate::errors::{Result, TrackerError};

/// Claims issued by the identity provider. `sub` is the profile id.
#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Verifies bearer tokens from the external identity provider (HS256).
pub struct IdentityVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: Option<String>,
    validation: Validation,
}

impl IdentityVerifier {
    pub fn new(secret: &str, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(iss) = issuer {
            validation.set_issuer(&[iss]);
            // set_issuer 只在 iss 存在时校验
            validation.required_spec_claims.insert("iss".to_string());
        }

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.map(str::to_string),
            validation,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        let secret = if config.jwt_secret.is_empty() {
            // 未配置时无法校验外部签发的 token，只能用于本地调试
            warn!("Identity JWT secret not configured, generating random secret");
            crate::utils::generate_secure_token(32)
        } else {
            config.jwt_secret.clone()
        };
        Self::new(&secret, config.issuer.as_deref())
    }

    /// 校验 token，返回 profile id
    pub fn verify(&self, token: &str) -> Result<String> {
        let data = decode::<IdentityClaims>(token, &self.decoding_key, &self.validation)?;
        if data.claims.sub.is_empty() {
            return Err(TrackerError::unauthenticated("Token has no subject"));
        }
        Ok(data.claims.sub)
    }

    /// Mint a token for local development and tests.
    pub fn issue(&self, profile_id: &str, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = IdentityClaims {
            sub: profile_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: self.issuer.clone(),
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_verifier() -> IdentityVerifier {
        IdentityVerifier::new("test_secret_key_32_bytes_long!!", None)
    }

    #[test]
    fn test_issue_and_verify() {
        let verifier = create_test_verifier();
        let token = verifier.issue("profile-1", Duration::minutes(5)).unwrap();
        assert_eq!(verifier.verify(&token).unwrap(), "profile-1");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_test_verifier()
            .issue("profile-1", Duration::minutes(5))
            .unwrap();
        let other = IdentityVerifier::new("different_secret_key_32_bytes!!", None);
        assert!(matches!(
            other.verify(&token),
            Err(TrackerError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let verifier = create_test_verifier();
        // 超过默认 leeway
        let token = verifier.issue("profile-1", Duration::hours(-1)).unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_issuer_enforced() {
        let verifier = IdentityVerifier::new("secret", Some("https://idp.example"));
        let token = verifier.issue("p", Duration::minutes(5)).unwrap();
        assert!(verifier.verify(&token).is_ok());

        let foreign = IdentityVerifier::new("secret", None)
            .issue("p", Duration::minutes(5))
            .unwrap();
        assert!(verifier.verify(&foreign).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(create_test_verifier().verify("invalid.token.here").is_err());
    }
}

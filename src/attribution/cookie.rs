//! Signed attribution cookie.
//!
//! The payload travels as an HS256 JWT. Anything that fails to verify,
//! violates `first_touch <= last_touch`, or falls outside the window is
//! read back as "no cookie".

use actix_web::HttpRequest;
use actix_web::cookie::{Cookie, SameSite, time::Duration as CookieDuration};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{debug, warn};

use crate::attribution::AttributionPayload;
use crate::config::{AttributionConfig, SameSitePolicy};
use crate::errors::Result;

pub struct AttributionCookies {
    name: String,
    window_days: u32,
    secure: bool,
    same_site: SameSite,
    domain: Option<String>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AttributionCookies {
    pub fn new(config: &AttributionConfig) -> Self {
        let secret = if config.cookie_secret.is_empty() {
            warn!("Attribution cookie secret not configured, generating random secret");
            crate::utils::generate_secure_token(32)
        } else {
            config.cookie_secret.clone()
        };

        let same_site = match config.cookie_same_site {
            SameSitePolicy::Strict => SameSite::Strict,
            SameSitePolicy::None => SameSite::None,
            SameSitePolicy::Lax => SameSite::Lax,
        };

        // 过期由 first_touch 窗口判断，不依赖 exp claim
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            name: config.cookie_name.clone(),
            window_days: config.window_days,
            secure: config.cookie_secure,
            same_site,
            domain: config.cookie_domain.clone(),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    pub fn encode(&self, payload: &AttributionPayload) -> Result<String> {
        Ok(encode(
            &Header::new(Algorithm::HS256),
            payload,
            &self.encoding_key,
        )?)
    }

    /// 解码并校验；任何失败都视为缺失
    pub fn decode(&self, token: &str, now_ms: i64) -> Option<AttributionPayload> {
        let payload = match decode::<AttributionPayload>(token, &self.decoding_key, &self.validation)
        {
            Ok(data) => data.claims,
            Err(e) => {
                debug!("Discarding unreadable attribution cookie: {}", e);
                return None;
            }
        };

        if !payload.is_consistent() {
            debug!("Discarding attribution cookie with first_touch > last_touch");
            return None;
        }
        if payload.is_expired(now_ms, self.window_days) {
            debug!(
                "Discarding expired attribution cookie for '{}'",
                payload.tracking_code
            );
            return None;
        }
        Some(payload)
    }

    pub fn read(&self, req: &HttpRequest, now_ms: i64) -> Option<AttributionPayload> {
        req.cookie(&self.name)
            .and_then(|cookie| self.decode(cookie.value(), now_ms))
    }

    fn build_cookie_base(&self, value: String, max_age: CookieDuration) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.name.clone(), value);
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_secure(self.secure);
        cookie.set_same_site(self.same_site);
        cookie.set_max_age(max_age);
        if let Some(ref domain) = self.domain {
            cookie.set_domain(domain.clone());
        }
        cookie
    }

    pub fn build_cookie(&self, payload: &AttributionPayload) -> Result<Cookie<'static>> {
        let token = self.encode(payload)?;
        Ok(self.build_cookie_base(token, CookieDuration::days(i64::from(self.window_days))))
    }

    pub fn removal_cookie(&self) -> Cookie<'static> {
        self.build_cookie_base(String::new(), CookieDuration::ZERO)
    }
}

//! Attribution precedence cascade.
//!
//! Sources are evaluated in order and the first one that names a
//! referrer wins; when none does the result is `DIRECT`. Resolution only
//! reads from the stores, and the cookie payload plus the clock are
//! passed in explicitly.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::attribution::{Attribution, AttributionMethod, AttributionPayload, AttributionResult};
use crate::errors::Result;
use crate::storage::models::{LeadRecord, ReferrerType};
use crate::storage::traits::{CodeRegistry, LeadDirectory, ProfileDirectory};

/// Everything known about the visitor at resolution time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolutionInput<'a> {
    pub cookie: Option<&'a AttributionPayload>,
    /// 已规范化的 email
    pub email: Option<&'a str>,
    /// 已规范化的电话（纯数字）
    pub phone: Option<&'a str>,
    pub now_ms: i64,
}

#[async_trait]
pub trait AttributionSource: Send + Sync {
    fn method(&self) -> AttributionMethod;

    /// `Ok(None)` passes control to the next source.
    async fn resolve(&self, input: &ResolutionInput<'_>) -> Result<Option<Attribution>>;
}

/// Step 1: a live cookie credits the current owner of its code.
pub struct CookieSource {
    registry: Arc<dyn CodeRegistry>,
    profiles: Arc<dyn ProfileDirectory>,
    window_days: u32,
}

impl CookieSource {
    pub fn new(
        registry: Arc<dyn CodeRegistry>,
        profiles: Arc<dyn ProfileDirectory>,
        window_days: u32,
    ) -> Self {
        Self {
            registry,
            profiles,
            window_days,
        }
    }
}

#[async_trait]
impl AttributionSource for CookieSource {
    fn method(&self) -> AttributionMethod {
        AttributionMethod::Cookie
    }

    async fn resolve(&self, input: &ResolutionInput<'_>) -> Result<Option<Attribution>> {
        let Some(payload) = input.cookie else {
            return Ok(None);
        };
        if !payload.is_consistent() || payload.is_expired(input.now_ms, self.window_days) {
            return Ok(None);
        }

        let owner = match self.registry.lookup_code(&payload.tracking_code).await? {
            Some(claim) => self.profiles.get_profile(&claim.owner_profile_id).await?,
            None => None,
        };

        let (referrer_username, referrer_type) = match owner {
            Some(profile) => (Some(profile.referrer_handle()), Some(profile.role)),
            // code 已被释放（例如自定义后的旧码），退回到 cookie 中记录的 referrer
            None => (payload.referrer_username.clone(), payload.referrer_type),
        };

        if referrer_username.is_none() {
            debug!(
                "Cookie code '{}' has no resolvable owner",
                payload.tracking_code
            );
            return Ok(None);
        }

        Ok(Some(Attribution {
            referrer_username,
            referrer_type,
            attribution_method: AttributionMethod::Cookie,
            tracking_code: Some(payload.tracking_code.clone()),
        }))
    }
}

/// Which contact field a [`LeadMatchSource`] matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadKey {
    Email,
    Phone,
}

/// Steps 2 and 3: reuse the attribution recorded on an existing lead.
pub struct LeadMatchSource {
    key: LeadKey,
    leads: Arc<dyn LeadDirectory>,
    profiles: Arc<dyn ProfileDirectory>,
}

impl LeadMatchSource {
    pub fn email(leads: Arc<dyn LeadDirectory>, profiles: Arc<dyn ProfileDirectory>) -> Self {
        Self {
            key: LeadKey::Email,
            leads,
            profiles,
        }
    }

    pub fn phone(leads: Arc<dyn LeadDirectory>, profiles: Arc<dyn ProfileDirectory>) -> Self {
        Self {
            key: LeadKey::Phone,
            leads,
            profiles,
        }
    }

    async fn find(&self, input: &ResolutionInput<'_>) -> Result<Option<LeadRecord>> {
        match self.key {
            LeadKey::Email => match input.email {
                Some(email) => self.leads.find_lead_by_email(email).await,
                None => Ok(None),
            },
            LeadKey::Phone => match input.phone {
                Some(phone) => self.leads.find_lead_by_phone(phone).await,
                None => Ok(None),
            },
        }
    }

    async fn referrer_type(&self, lead: &LeadRecord) -> Result<Option<ReferrerType>> {
        let Some(username) = lead.referrer_username.as_deref() else {
            return Ok(None);
        };
        Ok(self
            .profiles
            .find_profile_by_username(username)
            .await?
            .map(|p| p.role)
            .or(lead.referrer_type))
    }
}

#[async_trait]
impl AttributionSource for LeadMatchSource {
    fn method(&self) -> AttributionMethod {
        match self.key {
            LeadKey::Email => AttributionMethod::EmailMatch,
            LeadKey::Phone => AttributionMethod::PhoneMatch,
        }
    }

    async fn resolve(&self, input: &ResolutionInput<'_>) -> Result<Option<Attribution>> {
        let Some(lead) = self.find(input).await? else {
            return Ok(None);
        };
        if !lead.has_attribution() {
            trace!("Matched lead has no recorded attribution");
            return Ok(None);
        }

        let referrer_type = self.referrer_type(&lead).await?;
        Ok(Some(Attribution {
            referrer_username: lead.referrer_username,
            referrer_type,
            attribution_method: self.method(),
            tracking_code: lead.tracking_code,
        }))
    }
}

/// Ordered list of sources with early return.
#[derive(Clone)]
pub struct AttributionResolver {
    sources: Vec<Arc<dyn AttributionSource>>,
}

impl AttributionResolver {
    pub fn new(sources: Vec<Arc<dyn AttributionSource>>) -> Self {
        Self { sources }
    }

    /// COOKIE → EMAIL_MATCH → PHONE_MATCH → DIRECT
    pub fn standard<S>(storage: Arc<S>, window_days: u32) -> Self
    where
        S: CodeRegistry + ProfileDirectory + LeadDirectory + 'static,
    {
        let registry: Arc<dyn CodeRegistry> = storage.clone();
        let profiles: Arc<dyn ProfileDirectory> = storage.clone();
        let leads: Arc<dyn LeadDirectory> = storage;

        Self::new(vec![
            Arc::new(CookieSource::new(
                registry,
                Arc::clone(&profiles),
                window_days,
            )),
            Arc::new(LeadMatchSource::email(
                Arc::clone(&leads),
                Arc::clone(&profiles),
            )),
            Arc::new(LeadMatchSource::phone(leads, profiles)),
        ])
    }

    pub async fn resolve(&self, input: ResolutionInput<'_>) -> Result<AttributionResult> {
        for source in &self.sources {
            if let Some(attribution) = source.resolve(&input).await? {
                debug!(
                    "Attribution resolved via {}: {:?}",
                    source.method().as_ref(),
                    attribution.referrer_username
                );
                return Ok(attribution.into());
            }
        }
        Ok(Attribution::direct().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::payload::DAY_MS;
    use crate::storage::models::{CodeClaim, CodeKind, Profile, Role};
    use chrono::Utc;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeStore {
        claims: HashMap<String, CodeClaim>,
        profiles: HashMap<String, Profile>,
        leads: Vec<LeadRecord>,
    }

    impl FakeStore {
        fn with_owner(mut self, code: &str, id: &str, username: &str, role: Role) -> Self {
            self.claims.insert(
                code.to_string(),
                CodeClaim {
                    code: code.to_string(),
                    kind: CodeKind::ShortLink,
                    owner_profile_id: id.to_string(),
                },
            );
            self.profiles.insert(
                id.to_string(),
                Profile {
                    id: id.to_string(),
                    role,
                    display_name: username.to_string(),
                    username: Some(username.to_string()),
                },
            );
            self
        }

        fn with_lead(mut self, email: Option<&str>, phone: Option<&str>, referrer: &str) -> Self {
            let now = Utc::now();
            self.leads.push(LeadRecord {
                id: Some(self.leads.len() as i64 + 1),
                email: email.map(str::to_string),
                phone: phone.map(str::to_string),
                full_name: None,
                tracking_code: None,
                referrer_username: Some(referrer.to_string()),
                referrer_type: Some(Role::Referrer),
                attribution_method: AttributionMethod::Cookie,
                created_at: now,
                updated_at: now,
            });
            self
        }
    }

    #[async_trait]
    impl CodeRegistry for FakeStore {
        async fn lookup_code(&self, code: &str) -> Result<Option<CodeClaim>> {
            Ok(self.claims.get(code).cloned())
        }
    }

    #[async_trait]
    impl ProfileDirectory for FakeStore {
        async fn get_profile(&self, id: &str) -> Result<Option<Profile>> {
            Ok(self.profiles.get(id).cloned())
        }

        async fn find_profile_by_username(&self, username: &str) -> Result<Option<Profile>> {
            Ok(self
                .profiles
                .values()
                .find(|p| p.username.as_deref() == Some(username))
                .cloned())
        }

        async fn upsert_profile(&self, _profile: &Profile) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl LeadDirectory for FakeStore {
        async fn find_lead_by_email(&self, email: &str) -> Result<Option<LeadRecord>> {
            Ok(self
                .leads
                .iter()
                .find(|l| l.email.as_deref() == Some(email))
                .cloned())
        }

        async fn find_lead_by_phone(&self, phone: &str) -> Result<Option<LeadRecord>> {
            Ok(self
                .leads
                .iter()
                .find(|l| l.phone.as_deref() == Some(phone))
                .cloned())
        }

        async fn save_lead(&self, lead: &LeadRecord) -> Result<LeadRecord> {
            Ok(lead.clone())
        }
    }

    fn store() -> Arc<FakeStore> {
        Arc::new(
            FakeStore::default()
                .with_owner("abc123", "p-1", "jane", Role::TaxPreparer)
                .with_owner("sam-r", "p-2", "sam", Role::Affiliate)
                .with_lead(Some("ann@example.com"), Some("5550102030"), "sam"),
        )
    }

    const NOW: i64 = 1_700_000_000_000;

    #[tokio::test]
    async fn test_cookie_beats_email_match() {
        let resolver = AttributionResolver::standard(store(), 30);
        let cookie = AttributionPayload::new("abc123", NOW - DAY_MS, None, None);

        let result = resolver
            .resolve(ResolutionInput {
                cookie: Some(&cookie),
                email: Some("ann@example.com"),
                phone: None,
                now_ms: NOW,
            })
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.attribution.attribution_method, AttributionMethod::Cookie);
        assert_eq!(result.attribution.referrer_username.as_deref(), Some("jane"));
        assert_eq!(result.attribution.referrer_type, Some(Role::TaxPreparer));
    }

    #[tokio::test]
    async fn test_email_then_phone_then_direct() {
        let resolver = AttributionResolver::standard(store(), 30);

        let by_email = resolver
            .resolve(ResolutionInput {
                email: Some("ann@example.com"),
                now_ms: NOW,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            by_email.attribution.attribution_method,
            AttributionMethod::EmailMatch
        );
        assert_eq!(by_email.attribution.referrer_type, Some(Role::Affiliate));

        let by_phone = resolver
            .resolve(ResolutionInput {
                email: Some("nobody@example.com"),
                phone: Some("5550102030"),
                now_ms: NOW,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            by_phone.attribution.attribution_method,
            AttributionMethod::PhoneMatch
        );

        let direct = resolver
            .resolve(ResolutionInput {
                now_ms: NOW,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(direct.attribution.is_direct());
        assert_eq!(direct.attribution.referrer_username, None);
        assert_eq!(direct.attribution.referrer_type, None);
    }

    #[tokio::test]
    async fn test_expired_cookie_falls_through() {
        let resolver = AttributionResolver::standard(store(), 30);
        let stale = AttributionPayload::new("abc123", NOW - 31 * DAY_MS, None, None);

        let result = resolver
            .resolve(ResolutionInput {
                cookie: Some(&stale),
                now_ms: NOW,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(result.attribution.is_direct());
    }

    #[tokio::test]
    async fn test_released_code_uses_cookie_referrer() {
        let resolver = AttributionResolver::standard(store(), 30);
        let cookie = AttributionPayload::new(
            "old-code",
            NOW,
            Some("jane".into()),
            Some(Role::TaxPreparer),
        );

        let result = resolver
            .resolve(ResolutionInput {
                cookie: Some(&cookie),
                now_ms: NOW,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(result.attribution.attribution_method, AttributionMethod::Cookie);
        assert_eq!(result.attribution.referrer_username.as_deref(), Some("jane"));
    }

    #[tokio::test]
    async fn test_custom_source_order() {
        let store = store();
        let resolver = AttributionResolver::new(vec![Arc::new(LeadMatchSource::phone(
            store.clone(),
            store,
        ))]);
        let result = resolver
            .resolve(ResolutionInput {
                email: Some("ann@example.com"),
                phone: Some("5550102030"),
                now_ms: NOW,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            result.attribution.attribution_method,
            AttributionMethod::PhoneMatch
        );
    }
}

//! Short link engine
//!
//! Campaign links share the global code namespace with tracking codes.
//! `resolve` sits on every tracked visit and is fronted by a moka cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use super::{Availability, require_role};
use crate::analytics::VisitManager;
use crate::attribution::AttributionPayload;
use crate::config::{CacheConfig, TrackingConfig};
use crate::errors::{Result, TrackerError};
use crate::storage::models::{CodeKind, ShortLink, WriteOutcome};
use crate::storage::traits::{CodeRegistry, ProfileDirectory, ShortLinkStore};
use crate::utils::{
    CodeValidation, generate_random_code, is_valid_code, validate_code, validate_target_url,
};

const MAX_TITLE_LEN: usize = 200;

/// Where a code points and who owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub code: String,
    pub kind: CodeKind,
    /// 绝对地址或站内路径
    pub target_url: String,
    pub owner_profile_id: String,
}

pub type ResolveCache = Cache<String, Resolution>;

pub fn build_resolve_cache(config: &CacheConfig) -> ResolveCache {
    Cache::builder()
        .max_capacity(config.max_capacity)
        .time_to_live(Duration::from_secs(config.resolve_ttl_secs))
        .build()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkRequest {
    #[serde(default)]
    pub code: Option<String>,
    pub target_url: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Result of one tracked visit, used to write the attribution cookie.
#[derive(Debug, Clone)]
pub struct VisitOutcome {
    pub resolution: Resolution,
    pub payload: AttributionPayload,
    pub unique: bool,
}

pub struct ShortLinkService {
    registry: Arc<dyn CodeRegistry>,
    links: Arc<dyn ShortLinkStore>,
    profiles: Arc<dyn ProfileDirectory>,
    cache: ResolveCache,
    visits: Option<VisitManager>,
    random_code_length: usize,
    max_attempts: u32,
    landing_path: String,
}

impl ShortLinkService {
    pub fn new<S>(storage: Arc<S>, cache: ResolveCache, config: &TrackingConfig) -> Self
    where
        S: CodeRegistry + ShortLinkStore + ProfileDirectory + 'static,
    {
        Self {
            registry: storage.clone(),
            links: storage.clone(),
            profiles: storage,
            cache,
            visits: None,
            random_code_length: config.random_code_length.max(crate::utils::code::MIN_CODE_LEN),
            max_attempts: config.assign_max_attempts.max(1),
            landing_path: config.landing_path.clone(),
        }
    }

    /// 启用缓冲计数（定时批量刷盘）
    pub fn with_visit_manager(mut self, manager: VisitManager) -> Self {
        self.visits = Some(manager);
        self
    }

    pub fn cache(&self) -> &ResolveCache {
        &self.cache
    }

    /// 仅做格式校验，不访问存储
    pub fn validate_short_code(code: &str) -> CodeValidation {
        CodeValidation::check(code)
    }

    pub async fn is_short_code_available(&self, code: &str) -> Result<bool> {
        let code = code.trim();
        if !is_valid_code(code) {
            return Ok(false);
        }
        Ok(!self.registry.is_code_claimed(code).await?)
    }

    pub async fn check_availability(&self, code: &str) -> Result<Availability> {
        let code = code.trim();
        if let Err(e) = validate_code(code) {
            return Ok(Availability::unavailable(e.to_string()));
        }
        if self.registry.is_code_claimed(code).await? {
            return Ok(Availability::unavailable("This code is already taken"));
        }
        Ok(Availability::available())
    }

    pub async fn create(&self, profile_id: &str, req: CreateLinkRequest) -> Result<ShortLink> {
        require_role(self.profiles.as_ref(), profile_id, |r| r.can_refer(), "create short links")
            .await?;

        let target_url = req.target_url.trim().to_string();
        validate_target_url(&target_url)
            .map_err(|e| TrackerError::invalid_format(e.to_string()))?;

        let title = req
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if title.as_ref().is_some_and(|t| t.chars().count() > MAX_TITLE_LEN) {
            return Err(TrackerError::invalid_format(format!(
                "Title must be at most {} characters",
                MAX_TITLE_LEN
            )));
        }

        let requested = req
            .code
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let mut link = ShortLink {
            code: String::new(),
            creator_profile_id: profile_id.to_string(),
            target_url,
            title,
            clicks: 0,
            unique_clicks: 0,
            conversions: 0,
            is_active: true,
            created_at: Utc::now(),
        };

        match requested {
            Some(code) => {
                validate_code(&code).map_err(|e| TrackerError::invalid_format(e.to_string()))?;
                link.code = code;
                match self.links.insert_short_link(&link).await? {
                    WriteOutcome::Applied => {}
                    _ => {
                        return Err(TrackerError::code_taken(format!(
                            "Code '{}' is already taken",
                            link.code
                        )));
                    }
                }
            }
            None => {
                let mut inserted = false;
                for attempt in 0..self.max_attempts {
                    link.code = generate_random_code(self.random_code_length);
                    if self.links.insert_short_link(&link).await? == WriteOutcome::Applied {
                        inserted = true;
                        break;
                    }
                    debug!("Random code collision on attempt {}", attempt + 1);
                }
                if !inserted {
                    return Err(TrackerError::registration_exhausted(format!(
                        "Could not allocate a free code after {} attempts",
                        self.max_attempts
                    )));
                }
            }
        }

        info!(
            "ShortLinkService: created link '{}' -> '{}'",
            link.code, link.target_url
        );
        Ok(link)
    }

    pub async fn list(&self, profile_id: &str) -> Result<Vec<ShortLink>> {
        self.links.list_short_links(profile_id).await
    }

    /// Retire a link. Only its creator may do so.
    pub async fn deactivate(&self, profile_id: &str, code: &str) -> Result<ShortLink> {
        match self
            .links
            .set_short_link_active(profile_id, code, false)
            .await?
        {
            WriteOutcome::Applied => {}
            _ => {
                return Err(TrackerError::not_found(format!(
                    "Short link '{}' not found",
                    code
                )));
            }
        }
        self.cache.invalidate(code).await;

        self.links
            .get_short_link(code)
            .await?
            .ok_or_else(|| TrackerError::not_found(format!("Short link '{}' not found", code)))
    }

    /// Hot path: code → target and owner.
    pub async fn resolve(&self, code: &str) -> Result<Resolution> {
        if !is_valid_code(code) {
            return Err(TrackerError::not_found(format!("Unknown code '{}'", code)));
        }

        if let Some(hit) = self.cache.get(code).await {
            trace!("Resolve cache hit: {}", code);
            return Ok(hit);
        }

        let claim = self
            .registry
            .lookup_code(code)
            .await?
            .ok_or_else(|| TrackerError::not_found(format!("Unknown code '{}'", code)))?;

        let resolution = match claim.kind {
            CodeKind::ShortLink => {
                let link = self
                    .links
                    .get_short_link(code)
                    .await?
                    .filter(|l| l.is_active)
                    .ok_or_else(|| TrackerError::not_found(format!("Unknown code '{}'", code)))?;
                Resolution {
                    code: link.code,
                    kind: CodeKind::ShortLink,
                    target_url: link.target_url,
                    owner_profile_id: link.creator_profile_id,
                }
            }
            CodeKind::Tracking => Resolution {
                code: claim.code.clone(),
                kind: CodeKind::Tracking,
                target_url: self.landing_target(&claim.code),
                owner_profile_id: claim.owner_profile_id,
            },
        };

        self.cache
            .insert(code.to_string(), resolution.clone())
            .await;
        Ok(resolution)
    }

    fn landing_target(&self, code: &str) -> String {
        let sep = if self.landing_path.contains('?') { '&' } else { '?' };
        format!(
            "{}{}ref={}",
            self.landing_path,
            sep,
            urlencoding::encode(code)
        )
    }

    /// `clicks` always, `unique_clicks` only for a first-time visitor.
    pub async fn record_visit(&self, code: &str, is_unique_visitor: bool) -> Result<()> {
        match &self.visits {
            Some(manager) => {
                manager.record(code, is_unique_visitor);
                Ok(())
            }
            None => {
                self.links
                    .increment_visits(code, 1, u64::from(is_unique_visitor))
                    .await
            }
        }
    }

    pub async fn record_conversion(&self, code: &str) -> Result<()> {
        self.links.increment_conversions(code, 1).await?;
        info!("Conversion recorded for short link '{}'", code);
        Ok(())
    }

    /// Resolve, count and build the refreshed cookie payload for one visit.
    pub async fn visit(
        &self,
        code: &str,
        previous: Option<&AttributionPayload>,
        now_ms: i64,
    ) -> Result<VisitOutcome> {
        let resolution = self.resolve(code).await?;
        let unique = previous.is_none_or(|p| p.tracking_code != resolution.code);

        if resolution.kind == CodeKind::ShortLink {
            self.record_visit(&resolution.code, unique).await?;
        }

        let owner = self
            .profiles
            .get_profile(&resolution.owner_profile_id)
            .await?;
        let (username, role) = match owner {
            Some(p) => (Some(p.referrer_handle()), Some(p.role)),
            None => (None, None),
        };

        let payload =
            AttributionPayload::touch(previous, &resolution.code, now_ms, username, role);

        Ok(VisitOutcome {
            resolution,
            payload,
            unique,
        })
    }
}

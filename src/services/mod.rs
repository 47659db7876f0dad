//! Service layer for business logic
//!
//! Services own validation, role gating and state-machine decisions; the
//! storage seams only provide atomic writes. HTTP handlers and the CLI
//! share the same instances through [`AppServices`].

mod lead;
mod qr;
mod short_link;
mod tracking_code;
mod vanity_slug;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

pub use lead::{LeadService, LeadSubmission, LeadSubmissionResult};
pub use qr::QrUrlBuilder;
pub use short_link::{
    CreateLinkRequest, Resolution, ResolveCache, ShortLinkService, VisitOutcome,
    build_resolve_cache,
};
pub use tracking_code::{FinalizedTrackingCode, TrackingCodeService, TrackingCodeView};
pub use vanity_slug::{SlugClaim, VanitySlugService};

use crate::analytics::VisitManager;
use crate::attribution::AttributionCookies;
use crate::config::StaticConfig;
use crate::errors::{Result, TrackerError};
use crate::storage::SeaOrmStorage;
use crate::storage::models::{Profile, Role};
use crate::storage::traits::ProfileDirectory;

/// `{available, reason?}` answer shared by the availability checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Availability {
    pub fn available() -> Self {
        Self {
            available: true,
            reason: None,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            reason: Some(reason.into()),
        }
    }
}

pub(crate) async fn require_profile(
    profiles: &dyn ProfileDirectory,
    profile_id: &str,
) -> Result<Profile> {
    profiles
        .get_profile(profile_id)
        .await?
        .ok_or_else(|| TrackerError::not_found(format!("Profile '{}' not found", profile_id)))
}

/// 角色校验失败返回 Forbidden
pub(crate) async fn require_role(
    profiles: &dyn ProfileDirectory,
    profile_id: &str,
    allowed: fn(&Role) -> bool,
    action: &str,
) -> Result<Profile> {
    let profile = require_profile(profiles, profile_id).await?;
    if !allowed(&profile.role) {
        return Err(TrackerError::forbidden(format!(
            "Role {} is not allowed to {}",
            profile.role, action
        )));
    }
    Ok(profile)
}

/// Everything the HTTP layer needs, built once at startup.
#[derive(Clone)]
pub struct AppServices {
    pub storage: Arc<SeaOrmStorage>,
    pub tracking_codes: Arc<TrackingCodeService>,
    pub short_links: Arc<ShortLinkService>,
    pub vanity_slugs: Arc<VanitySlugService>,
    pub leads: Arc<LeadService>,
    pub cookies: Arc<AttributionCookies>,
    pub visits: Option<VisitManager>,
}

impl AppServices {
    pub fn new(storage: Arc<SeaOrmStorage>, config: &StaticConfig) -> Self {
        let cache = build_resolve_cache(&config.cache);

        let visits = config.visits.buffered.then(|| {
            VisitManager::new(
                storage.as_visit_sink(),
                Duration::from_secs(config.visits.flush_interval_secs.max(1)),
                config.visits.max_visits_before_flush.max(1),
            )
        });

        let mut short_links =
            ShortLinkService::new(Arc::clone(&storage), cache.clone(), &config.tracking);
        if let Some(ref manager) = visits {
            short_links = short_links.with_visit_manager(manager.clone());
        }
        let short_links = Arc::new(short_links);

        let tracking_codes = Arc::new(TrackingCodeService::new(
            Arc::clone(&storage),
            cache,
            &config.tracking,
        ));
        let vanity_slugs = Arc::new(VanitySlugService::new(Arc::clone(&storage)));
        let leads = Arc::new(LeadService::new(
            Arc::clone(&storage),
            Arc::clone(&short_links),
            &config.attribution,
        ));
        let cookies = Arc::new(AttributionCookies::new(&config.attribution));

        Self {
            storage,
            tracking_codes,
            short_links,
            vanity_slugs,
            leads,
            cookies,
            visits,
        }
    }
}

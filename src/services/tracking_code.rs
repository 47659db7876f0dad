//! Primary tracking code lifecycle: assign → customize (once) → finalize.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{Availability, QrUrlBuilder, ResolveCache, require_role};
use crate::config::TrackingConfig;
use crate::errors::{Result, TrackerError};
use crate::storage::models::{CodeKind, CodeState, ShortLink, TrackingCodeRecord, WriteOutcome};
use crate::storage::traits::{CodeRegistry, ProfileDirectory, ShortLinkStore, TrackingCodeStore};
use crate::utils::code::MIN_CODE_LEN;
use crate::utils::{candidate_code, generate_random_code, normalize_code, slugify, validate_code};

/// JSON shape of a tracking code returned to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingCodeView {
    pub code: String,
    pub is_custom: bool,
    pub finalized: bool,
    pub qr_url: Option<String>,
    pub tracking_url: String,
    pub changed_at: Option<DateTime<Utc>>,
}

impl TrackingCodeView {
    pub fn from_record(record: &TrackingCodeRecord, base_url: &str) -> Self {
        Self {
            code: record.code.clone(),
            is_custom: record.state.is_custom(),
            finalized: record.state.is_finalized(),
            qr_url: record.qr_url.clone(),
            tracking_url: QrUrlBuilder::tracking_url(base_url, &record.code),
            changed_at: record.state.changed_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedTrackingCode {
    pub tracking_code: TrackingCodeView,
    pub short_links: Vec<ShortLink>,
}

pub struct TrackingCodeService {
    registry: Arc<dyn CodeRegistry>,
    store: Arc<dyn TrackingCodeStore>,
    links: Arc<dyn ShortLinkStore>,
    profiles: Arc<dyn ProfileDirectory>,
    cache: ResolveCache,
    qr: QrUrlBuilder,
    max_attempts: u32,
    random_code_length: usize,
}

impl TrackingCodeService {
    pub fn new<S>(storage: Arc<S>, cache: ResolveCache, config: &TrackingConfig) -> Self
    where
        S: CodeRegistry + TrackingCodeStore + ShortLinkStore + ProfileDirectory + 'static,
    {
        Self {
            registry: storage.clone(),
            store: storage.clone(),
            links: storage.clone(),
            profiles: storage,
            cache,
            qr: QrUrlBuilder::new(config.qr_url_template.clone()),
            max_attempts: config.assign_max_attempts.max(1),
            random_code_length: config.random_code_length.max(MIN_CODE_LEN),
        }
    }

    /// Lazily give the profile its code; a profile that has one gets it back.
    pub async fn assign(&self, profile_id: &str, base_url: &str) -> Result<TrackingCodeRecord> {
        if let Some(existing) = self.store.get_tracking_code(profile_id).await? {
            return Ok(existing);
        }

        let profile = require_role(
            self.profiles.as_ref(),
            profile_id,
            |r| r.can_refer(),
            "hold a tracking code",
        )
        .await?;

        let base = slugify(&profile.display_name);
        for attempt in 0..self.max_attempts {
            let code = if base.len() < MIN_CODE_LEN {
                generate_random_code(self.random_code_length)
            } else {
                candidate_code(&base, attempt)
            };

            let record = TrackingCodeRecord {
                profile_id: profile_id.to_string(),
                qr_url: Some(self.qr.build(base_url, &code)),
                code,
                state: CodeState::Generated,
                created_at: Utc::now(),
            };

            match self.store.insert_tracking_code(&record).await? {
                WriteOutcome::Applied => {
                    info!(
                        "Assigned tracking code '{}' to profile {}",
                        record.code, profile_id
                    );
                    return Ok(record);
                }
                WriteOutcome::Conflict => {
                    debug!(
                        "Tracking code candidate '{}' taken (attempt {})",
                        record.code,
                        attempt + 1
                    );
                }
                // 并发的 assign 已经写入
                WriteOutcome::Unchanged => {
                    return self.require_record(profile_id).await;
                }
            }
        }

        warn!(
            "Tracking code assignment exhausted after {} attempts for profile {}",
            self.max_attempts, profile_id
        );
        Err(TrackerError::registration_exhausted(format!(
            "Could not find a free tracking code after {} attempts",
            self.max_attempts
        )))
    }

    /// One-time change of the primary code.
    pub async fn customize(
        &self,
        profile_id: &str,
        desired: &str,
        base_url: &str,
    ) -> Result<TrackingCodeRecord> {
        let desired = normalize_code(desired);
        validate_code(&desired).map_err(|e| TrackerError::invalid_format(e.to_string()))?;

        let current = self.assign(profile_id, base_url).await?;
        let now = Utc::now();
        current.state.customize(now)?;

        let swapping = desired != current.code;
        if swapping && self.registry.is_code_claimed(&desired).await? {
            return Err(TrackerError::code_taken(format!(
                "Code '{}' is already taken",
                desired
            )));
        }

        let qr_url = swapping.then(|| self.qr.build(base_url, &desired));
        match self
            .store
            .customize_tracking_code(profile_id, &current.code, &desired, qr_url, now)
            .await?
        {
            WriteOutcome::Applied => {
                self.cache.invalidate(current.code.as_str()).await;
                self.cache.invalidate(desired.as_str()).await;
                info!(
                    "Tracking code for profile {} customized: '{}' -> '{}'",
                    profile_id, current.code, desired
                );
                self.require_record(profile_id).await
            }
            WriteOutcome::Conflict => Err(TrackerError::code_taken(format!(
                "Code '{}' is already taken",
                desired
            ))),
            WriteOutcome::Unchanged => {
                // 条件写入失败：状态已被并发请求推进
                let latest = self.require_record(profile_id).await?;
                Err(latest.state.customize(now).err().unwrap_or_else(|| {
                    TrackerError::already_customized("Tracking code has already been customized")
                }))
            }
        }
    }

    /// Lock the code permanently. Finalizing twice succeeds both times.
    pub async fn finalize(&self, profile_id: &str, base_url: &str) -> Result<FinalizedTrackingCode> {
        self.require_record(profile_id).await?;

        match self.store.finalize_tracking_code(profile_id).await? {
            WriteOutcome::Applied => info!("Tracking code for profile {} finalized", profile_id),
            _ => debug!("Tracking code for profile {} already finalized", profile_id),
        }

        let record = self.require_record(profile_id).await?;
        let short_links = self.links.list_short_links(profile_id).await?;

        Ok(FinalizedTrackingCode {
            tracking_code: TrackingCodeView::from_record(&record, base_url),
            short_links,
        })
    }

    /// Free when no profile holds it. Input is trimmed and lower-cased.
    pub async fn is_available(&self, code: &str) -> Result<bool> {
        Ok(self.check_availability(code, None).await?.available)
    }

    /// Like `is_available`, but the requester's own tracking code counts as free.
    pub async fn check_availability(
        &self,
        code: &str,
        requester: Option<&str>,
    ) -> Result<Availability> {
        let code = normalize_code(code);
        if let Err(e) = validate_code(&code) {
            return Ok(Availability::unavailable(e.to_string()));
        }

        match self.registry.lookup_code(&code).await? {
            None => Ok(Availability::available()),
            Some(claim)
                if claim.kind == CodeKind::Tracking
                    && requester == Some(claim.owner_profile_id.as_str()) =>
            {
                Ok(Availability::available())
            }
            Some(_) => Ok(Availability::unavailable("This code is already taken")),
        }
    }

    async fn require_record(&self, profile_id: &str) -> Result<TrackingCodeRecord> {
        self.store
            .get_tracking_code(profile_id)
            .await?
            .ok_or_else(|| {
                TrackerError::not_found(format!("No tracking code for profile '{}'", profile_id))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_from_record() {
        let changed = Utc::now();
        let record = TrackingCodeRecord {
            profile_id: "p1".into(),
            code: "jane-d".into(),
            state: CodeState::Finalized {
                changed_at: Some(changed),
            },
            qr_url: Some("https://qr.example/x".into()),
            created_at: changed,
        };

        let view = TrackingCodeView::from_record(&record, "https://tax.example/");
        assert!(view.is_custom);
        assert!(view.finalized);
        assert_eq!(view.tracking_url, "https://tax.example/jane-d");
        assert_eq!(view.changed_at, Some(changed));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["isCustom"], true);
        assert_eq!(json["qrUrl"], "https://qr.example/x");
    }
}

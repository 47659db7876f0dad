//! Referrer usernames (vanity slugs).
//!
//! Slugs keep the casing the owner typed but collide case-insensitively.
//! A profile may claim one and change it exactly once afterwards.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::{Availability, require_role};
use crate::errors::{Result, TrackerError};
use crate::storage::models::{Profile, VanitySlug, WriteOutcome};
use crate::storage::traits::{ProfileDirectory, VanitySlugStore};
use crate::utils::validate_code;

/// Outcome of [`VanitySlugService::claim`].
///
/// A rejection carries `can_change` so callers can tell "taken" (pick
/// another one) from "you already used your change".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlugClaim {
    Claimed(VanitySlug),
    Rejected {
        reason: TrackerError,
        can_change: bool,
    },
}

pub struct VanitySlugService {
    store: Arc<dyn VanitySlugStore>,
    profiles: Arc<dyn ProfileDirectory>,
}

impl VanitySlugService {
    pub fn new<S>(storage: Arc<S>) -> Self
    where
        S: VanitySlugStore + ProfileDirectory + 'static,
    {
        Self {
            store: storage.clone(),
            profiles: storage,
        }
    }

    fn validate(slug: &str) -> Result<String> {
        let slug = slug.trim();
        validate_code(&slug.to_ascii_lowercase())
            .map_err(|e| TrackerError::invalid_format(e.to_string()))?;
        Ok(slug.to_string())
    }

    pub async fn get(&self, profile_id: &str) -> Result<Option<VanitySlug>> {
        self.store.get_vanity_slug(profile_id).await
    }

    pub async fn check_availability(
        &self,
        slug: &str,
        requester: Option<&str>,
    ) -> Result<Availability> {
        let slug = match Self::validate(slug) {
            Ok(slug) => slug,
            Err(e) => return Ok(Availability::unavailable(e.message())),
        };

        match self.store.find_vanity_slug(&slug).await? {
            None => Ok(Availability::available()),
            Some(existing) if requester == Some(existing.profile_id.as_str()) => {
                Ok(Availability::available())
            }
            Some(_) => Ok(Availability::unavailable("This username is already taken")),
        }
    }

    pub async fn claim(&self, profile_id: &str, slug: &str) -> Result<SlugClaim> {
        let slug = Self::validate(slug)?;
        let profile = require_role(
            self.profiles.as_ref(),
            profile_id,
            |r| r.is_referrer_type(),
            "claim a username",
        )
        .await?;

        let taken = || SlugClaim::Rejected {
            reason: TrackerError::code_taken(format!("Username '{}' is already taken", slug)),
            can_change: true,
        };
        let spent = || SlugClaim::Rejected {
            reason: TrackerError::already_customized("Username can only be changed once"),
            can_change: false,
        };

        if let Some(holder) = self.store.find_vanity_slug(&slug).await?
            && holder.profile_id != profile_id
        {
            return Ok(taken());
        }

        let now = Utc::now();
        let claimed = match self.store.get_vanity_slug(profile_id).await? {
            None => {
                let record = VanitySlug {
                    profile_id: profile_id.to_string(),
                    slug: slug.clone(),
                    changed_at: None,
                    created_at: now,
                };
                match self.store.insert_vanity_slug(&record).await? {
                    WriteOutcome::Applied => record,
                    WriteOutcome::Conflict => return Ok(taken()),
                    // 并发请求已为该 profile 写入
                    WriteOutcome::Unchanged => {
                        debug!("Concurrent first claim for profile {}", profile_id);
                        return Ok(SlugClaim::Rejected {
                            reason: TrackerError::already_customized(
                                "A username was already claimed for this profile",
                            ),
                            can_change: true,
                        });
                    }
                }
            }
            Some(existing) if existing.slug == slug => return Ok(SlugClaim::Claimed(existing)),
            Some(existing) if !existing.can_change() => return Ok(spent()),
            Some(existing) => match self
                .store
                .change_vanity_slug(profile_id, &slug, now)
                .await?
            {
                WriteOutcome::Applied => VanitySlug {
                    slug: slug.clone(),
                    changed_at: Some(now),
                    ..existing
                },
                WriteOutcome::Conflict => return Ok(taken()),
                WriteOutcome::Unchanged => return Ok(spent()),
            },
        };

        self.profiles
            .upsert_profile(&Profile {
                username: Some(claimed.slug.clone()),
                ..profile
            })
            .await?;

        info!(
            "Profile {} now uses username '{}'",
            profile_id, claimed.slug
        );
        Ok(SlugClaim::Claimed(claimed))
    }
}

//! Lead capture: resolve attribution, persist the snapshot, count conversions.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::ShortLinkService;
use crate::attribution::{
    Attribution, AttributionMethod, AttributionPayload, AttributionResolver, AttributionResult,
    ResolutionInput,
};
use crate::config::AttributionConfig;
use crate::errors::{Result, TrackerError};
use crate::storage::models::{CodeKind, LeadRecord};
use crate::storage::traits::{CodeRegistry, LeadDirectory, ProfileDirectory};
use crate::utils::{normalize_email, normalize_phone};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSubmission {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSubmissionResult {
    pub lead: LeadRecord,
    pub attribution: AttributionResult,
    pub created: bool,
}

pub struct LeadService {
    registry: Arc<dyn CodeRegistry>,
    leads: Arc<dyn LeadDirectory>,
    resolver: AttributionResolver,
    short_links: Arc<ShortLinkService>,
    reattribute_on_resubmit: bool,
}

impl LeadService {
    pub fn new<S>(
        storage: Arc<S>,
        short_links: Arc<ShortLinkService>,
        config: &AttributionConfig,
    ) -> Self
    where
        S: CodeRegistry + ProfileDirectory + LeadDirectory + 'static,
    {
        Self {
            registry: storage.clone(),
            leads: storage.clone(),
            resolver: AttributionResolver::standard(storage, config.window_days),
            short_links,
            reattribute_on_resubmit: config.reattribute_on_resubmit,
        }
    }

    /// Swap in a custom resolver (different source order, extra sources).
    pub fn with_resolver(mut self, resolver: AttributionResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Read-only attribution lookup; nothing is persisted.
    pub async fn get_attribution(
        &self,
        cookie: Option<&AttributionPayload>,
        email: Option<&str>,
        phone: Option<&str>,
        now_ms: i64,
    ) -> Result<AttributionResult> {
        let email = normalize_email(email)?;
        let phone = normalize_phone(phone)?;

        self.resolver
            .resolve(ResolutionInput {
                cookie,
                email: email.as_deref(),
                phone: phone.as_deref(),
                now_ms,
            })
            .await
    }

    pub async fn submit_lead(
        &self,
        submission: LeadSubmission,
        cookie: Option<&AttributionPayload>,
        now_ms: i64,
    ) -> Result<LeadSubmissionResult> {
        let email = normalize_email(submission.email.as_deref())?;
        let phone = normalize_phone(submission.phone.as_deref())?;
        if email.is_none() && phone.is_none() {
            return Err(TrackerError::invalid_format(
                "An email address or phone number is required",
            ));
        }
        let full_name = submission
            .full_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let result = self
            .resolver
            .resolve(ResolutionInput {
                cookie,
                email: email.as_deref(),
                phone: phone.as_deref(),
                now_ms,
            })
            .await?;

        let contact = Contact {
            email,
            phone,
            full_name,
        };

        let (lead, created) = match self.find_existing(&contact).await? {
            Some(existing) => (
                self.update_existing(existing, &contact, &result.attribution)
                    .await?,
                false,
            ),
            None => {
                let now = Utc::now();
                let mut lead = LeadRecord {
                    id: None,
                    email: contact.email.clone(),
                    phone: contact.phone.clone(),
                    full_name: contact.full_name.clone(),
                    tracking_code: None,
                    referrer_username: None,
                    referrer_type: None,
                    attribution_method: AttributionMethod::Direct,
                    created_at: now,
                    updated_at: now,
                };
                apply_attribution(&mut lead, &result.attribution);

                match self.leads.save_lead(&lead).await {
                    Ok(saved) => (saved, true),
                    // 并发提交同一联系方式，改为更新已写入的那一行
                    Err(TrackerError::CodeTaken(_)) => {
                        let existing = self.find_existing(&contact).await?.ok_or_else(|| {
                            TrackerError::storage_unavailable("Lead vanished after conflict")
                        })?;
                        (
                            self.update_existing(existing, &contact, &result.attribution)
                                .await?,
                            false,
                        )
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        if created {
            self.count_conversion(&result.attribution).await?;
            info!(
                "New lead {:?} attributed via {}",
                lead.id,
                result.attribution.attribution_method.as_ref()
            );
        }

        Ok(LeadSubmissionResult {
            lead,
            attribution: result,
            created,
        })
    }

    /// Leads are keyed by email, or by phone when no email was given.
    async fn find_existing(&self, contact: &Contact) -> Result<Option<LeadRecord>> {
        match (&contact.email, &contact.phone) {
            (Some(email), _) => self.leads.find_lead_by_email(email).await,
            (None, Some(phone)) => self.leads.find_lead_by_phone(phone).await,
            (None, None) => Ok(None),
        }
    }

    async fn update_existing(
        &self,
        mut lead: LeadRecord,
        contact: &Contact,
        attribution: &Attribution,
    ) -> Result<LeadRecord> {
        if contact.email.is_some() {
            lead.email = contact.email.clone();
        }
        if contact.phone.is_some() {
            lead.phone = contact.phone.clone();
        }
        if contact.full_name.is_some() {
            lead.full_name = contact.full_name.clone();
        }

        if !lead.has_attribution() || self.reattribute_on_resubmit {
            apply_attribution(&mut lead, attribution);
        } else {
            debug!(
                "Lead {:?} keeps its first attribution ({:?})",
                lead.id, lead.referrer_username
            );
        }

        lead.updated_at = Utc::now();
        self.leads.save_lead(&lead).await
    }

    async fn count_conversion(&self, attribution: &Attribution) -> Result<()> {
        if attribution.attribution_method != AttributionMethod::Cookie {
            return Ok(());
        }
        let Some(code) = attribution.tracking_code.as_deref() else {
            return Ok(());
        };

        match self.registry.lookup_code(code).await? {
            Some(claim) if claim.kind == CodeKind::ShortLink => {
                self.short_links.record_conversion(code).await
            }
            _ => Ok(()),
        }
    }
}

struct Contact {
    email: Option<String>,
    phone: Option<String>,
    full_name: Option<String>,
}

fn apply_attribution(lead: &mut LeadRecord, attribution: &Attribution) {
    lead.tracking_code = attribution.tracking_code.clone();
    lead.referrer_username = attribution.referrer_username.clone();
    lead.referrer_type = attribution.referrer_type;
    lead.attribution_method = attribution.attribution_method;
}

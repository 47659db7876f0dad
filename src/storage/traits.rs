//! Storage seams consumed by the services.
//!
//! Every method that enforces an invariant (code uniqueness, one-time
//! change, terminal finalization) is a single conditional write or a
//! short transaction whose first statement is the claim-if-free insert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::Result;
use crate::storage::models::{
    CodeClaim, LeadRecord, Profile, ShortLink, TrackingCodeRecord, VanitySlug, WriteOutcome,
};

/// Global namespace shared by tracking codes and short-link codes.
#[async_trait]
pub trait CodeRegistry: Send + Sync {
    async fn lookup_code(&self, code: &str) -> Result<Option<CodeClaim>>;

    async fn is_code_claimed(&self, code: &str) -> Result<bool> {
        Ok(self.lookup_code(code).await?.is_some())
    }
}

#[async_trait]
pub trait TrackingCodeStore: Send + Sync {
    async fn get_tracking_code(&self, profile_id: &str) -> Result<Option<TrackingCodeRecord>>;

    /// 认领 code 并写入记录
    ///
    /// - `Conflict`: code 已被占用
    /// - `Unchanged`: 该 profile 已有 tracking code
    async fn insert_tracking_code(&self, record: &TrackingCodeRecord) -> Result<WriteOutcome>;

    /// 一次性替换 code，仅当当前状态为 generated 且 code 仍为 `current_code`
    ///
    /// - `Conflict`: `new_code` 已被其他人占用
    /// - `Unchanged`: 状态已变化（已自定义或已锁定）
    async fn customize_tracking_code(
        &self,
        profile_id: &str,
        current_code: &str,
        new_code: &str,
        qr_url: Option<String>,
        changed_at: DateTime<Utc>,
    ) -> Result<WriteOutcome>;

    /// `Unchanged` when the record is already finalized or missing.
    async fn finalize_tracking_code(&self, profile_id: &str) -> Result<WriteOutcome>;
}

#[async_trait]
pub trait ShortLinkStore: Send + Sync {
    async fn get_short_link(&self, code: &str) -> Result<Option<ShortLink>>;

    async fn list_short_links(&self, creator_profile_id: &str) -> Result<Vec<ShortLink>>;

    /// `Conflict` when the code is already claimed in the registry.
    async fn insert_short_link(&self, link: &ShortLink) -> Result<WriteOutcome>;

    /// Atomic `clicks = clicks + n` style increment.
    async fn increment_visits(&self, code: &str, clicks: u64, unique_clicks: u64) -> Result<()>;

    async fn increment_conversions(&self, code: &str, conversions: u64) -> Result<()>;

    /// 仅当 creator 匹配时生效；不匹配或不存在返回 `Unchanged`
    async fn set_short_link_active(
        &self,
        creator_profile_id: &str,
        code: &str,
        active: bool,
    ) -> Result<WriteOutcome>;
}

#[async_trait]
pub trait VanitySlugStore: Send + Sync {
    async fn get_vanity_slug(&self, profile_id: &str) -> Result<Option<VanitySlug>>;

    /// Case-insensitive lookup.
    async fn find_vanity_slug(&self, slug: &str) -> Result<Option<VanitySlug>>;

    /// 首次认领。`Conflict`: slug 被占用；`Unchanged`: 该 profile 已有 slug
    async fn insert_vanity_slug(&self, slug: &VanitySlug) -> Result<WriteOutcome>;

    /// 唯一一次修改，仅当 `changed_at` 仍为空
    async fn change_vanity_slug(
        &self,
        profile_id: &str,
        new_slug: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<WriteOutcome>;
}

/// Profile lookup owned by the surrounding application.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn get_profile(&self, profile_id: &str) -> Result<Option<Profile>>;

    async fn find_profile_by_username(&self, username: &str) -> Result<Option<Profile>>;

    async fn upsert_profile(&self, profile: &Profile) -> Result<()>;
}

/// Lead persistence owned by the surrounding application.
#[async_trait]
pub trait LeadDirectory: Send + Sync {
    async fn find_lead_by_email(&self, email: &str) -> Result<Option<LeadRecord>>;

    async fn find_lead_by_phone(&self, phone: &str) -> Result<Option<LeadRecord>>;

    /// Insert when `lead.id` is `None`, update otherwise. Returns the stored row.
    async fn save_lead(&self, lead: &LeadRecord) -> Result<LeadRecord>;
}

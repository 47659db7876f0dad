use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};

use crate::errors::{Result, TrackerError};

/// 账户角色，同时也是归因结果中的 referrer 类型
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Role {
    Client,
    TaxPreparer,
    Referrer,
    Affiliate,
    Admin,
}

pub type ReferrerType = Role;

impl Role {
    /// 可以拥有 tracking code 与短链接的角色
    pub fn can_refer(&self) -> bool {
        matches!(
            self,
            Role::TaxPreparer | Role::Referrer | Role::Affiliate | Role::Admin
        )
    }

    /// vanity slug 只开放给 referrer 类账户
    pub fn is_referrer_type(&self) -> bool {
        matches!(self, Role::Referrer | Role::Affiliate)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// Profile as returned by the external directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub role: Role,
    pub display_name: String,
    pub username: Option<String>,
}

impl Profile {
    /// 归因中记录的 referrer 标识：优先 username，否则用 profile id
    pub fn referrer_handle(&self) -> String {
        self.username.clone().unwrap_or_else(|| self.id.clone())
    }
}

/// 短码在全局命名空间中的归属类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CodeKind {
    Tracking,
    ShortLink,
}

/// A row of the global code namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeClaim {
    pub code: String,
    pub kind: CodeKind,
    pub owner_profile_id: String,
}

/// Lifecycle of a primary tracking code.
///
/// `Generated` may move to `Customized` exactly once; either may move to
/// `Finalized`, which is terminal. Finalized remembers whether the code
/// had been customized before locking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeState {
    Generated,
    Customized { changed_at: DateTime<Utc> },
    Finalized { changed_at: Option<DateTime<Utc>> },
}

impl CodeState {
    pub const GENERATED: &'static str = "generated";
    pub const CUSTOM: &'static str = "custom";
    pub const FINALIZED: &'static str = "finalized";

    pub fn is_custom(&self) -> bool {
        self.changed_at().is_some()
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self, CodeState::Finalized { .. })
    }

    pub fn changed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            CodeState::Generated => None,
            CodeState::Customized { changed_at } => Some(*changed_at),
            CodeState::Finalized { changed_at } => *changed_at,
        }
    }

    /// 数据库中 state 列的取值
    pub fn as_db_str(&self) -> &'static str {
        match self {
            CodeState::Generated => Self::GENERATED,
            CodeState::Customized { .. } => Self::CUSTOM,
            CodeState::Finalized { .. } => Self::FINALIZED,
        }
    }

    pub fn from_db(state: &str, changed_at: Option<DateTime<Utc>>) -> Result<Self> {
        match (state, changed_at) {
            (Self::GENERATED, _) => Ok(CodeState::Generated),
            (Self::CUSTOM, Some(changed_at)) => Ok(CodeState::Customized { changed_at }),
            (Self::FINALIZED, changed_at) => Ok(CodeState::Finalized { changed_at }),
            (other, _) => Err(TrackerError::storage_unavailable(format!(
                "Corrupt tracking code state: '{}'",
                other
            ))),
        }
    }

    /// 一次性自定义：只有 Generated 可以转为 Customized
    pub fn customize(self, now: DateTime<Utc>) -> Result<Self> {
        match self {
            CodeState::Generated => Ok(CodeState::Customized { changed_at: now }),
            CodeState::Customized { .. } => Err(TrackerError::already_customized(
                "Tracking code has already been customized",
            )),
            CodeState::Finalized { .. } => Err(TrackerError::finalized(
                "Tracking code is finalized and can no longer be changed",
            )),
        }
    }

    /// Finalize is idempotent.
    pub fn finalize(self) -> Self {
        match self {
            CodeState::Finalized { .. } => self,
            other => CodeState::Finalized {
                changed_at: other.changed_at(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingCodeRecord {
    pub profile_id: String,
    pub code: String,
    pub state: CodeState,
    pub qr_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortLink {
    pub code: String,
    pub creator_profile_id: String,
    pub target_url: String,
    pub title: Option<String>,
    pub clicks: u64,
    pub unique_clicks: u64,
    pub conversions: u64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VanitySlug {
    pub profile_id: String,
    pub slug: String,
    pub changed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl VanitySlug {
    /// 是否还可以修改一次
    pub fn can_change(&self) -> bool {
        self.changed_at.is_none()
    }

    pub fn slug_key(&self) -> String {
        self.slug.to_lowercase()
    }
}

/// Lead as persisted by the lead-capture flow, carrying its attribution snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRecord {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub full_name: Option<String>,
    pub tracking_code: Option<String>,
    pub referrer_username: Option<String>,
    pub referrer_type: Option<ReferrerType>,
    pub attribution_method: crate::attribution::AttributionMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeadRecord {
    /// 插入时的唯一身份键：有 email 用 email，否则用 phone
    pub fn contact_key(&self) -> Option<String> {
        match (&self.email, &self.phone) {
            (Some(email), _) => Some(format!("email:{}", email)),
            (None, Some(phone)) => Some(format!("phone:{}", phone)),
            (None, None) => None,
        }
    }

    /// 是否已有可用的归因记录（非 DIRECT 且有 referrer）
    pub fn has_attribution(&self) -> bool {
        self.referrer_username.is_some()
            && self.attribution_method != crate::attribution::AttributionMethod::Direct
    }
}

/// 条件写入的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// 写入成功
    Applied,
    /// 唯一约束冲突（码已被占用）
    Conflict,
    /// 条件不满足（行不存在或状态已变化）
    Unchanged,
}

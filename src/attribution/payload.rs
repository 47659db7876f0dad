use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::storage::models::ReferrerType;

/// 一天的毫秒数
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributionMethod {
    Cookie,
    EmailMatch,
    PhoneMatch,
    Direct,
}

/// Client-held attribution state, carried in a signed cookie.
///
/// Timestamps are epoch milliseconds and `first_touch <= last_touch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributionPayload {
    pub tracking_code: String,
    pub first_touch: i64,
    pub last_touch: i64,
    pub referrer_username: Option<String>,
    pub referrer_type: Option<ReferrerType>,
    pub attribution_method: AttributionMethod,
}

impl AttributionPayload {
    pub fn new(
        tracking_code: impl Into<String>,
        now_ms: i64,
        referrer_username: Option<String>,
        referrer_type: Option<ReferrerType>,
    ) -> Self {
        Self {
            tracking_code: tracking_code.into(),
            first_touch: now_ms,
            last_touch: now_ms,
            referrer_username,
            referrer_type,
            attribution_method: AttributionMethod::Cookie,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.first_touch <= self.last_touch
    }

    /// 以 first_touch 计算窗口，超出即视为不存在
    pub fn is_expired(&self, now_ms: i64, window_days: u32) -> bool {
        now_ms - self.first_touch > i64::from(window_days) * DAY_MS
    }

    /// A fresh visit for `code`.
    ///
    /// The same code keeps `first_touch` and advances `last_touch`; a
    /// different code starts a new payload.
    pub fn touch(
        previous: Option<&AttributionPayload>,
        code: &str,
        now_ms: i64,
        referrer_username: Option<String>,
        referrer_type: Option<ReferrerType>,
    ) -> Self {
        match previous {
            Some(prev) if prev.tracking_code == code => Self {
                tracking_code: prev.tracking_code.clone(),
                first_touch: prev.first_touch,
                last_touch: now_ms.max(prev.last_touch),
                referrer_username,
                referrer_type,
                attribution_method: AttributionMethod::Cookie,
            },
            _ => Self::new(code, now_ms, referrer_username, referrer_type),
        }
    }
}

/// Who gets credit and how it was determined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribution {
    pub referrer_username: Option<String>,
    pub referrer_type: Option<ReferrerType>,
    pub attribution_method: AttributionMethod,
    /// 归因来源的短码
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_code: Option<String>,
}

impl Attribution {
    pub fn direct() -> Self {
        Self {
            referrer_username: None,
            referrer_type: None,
            attribution_method: AttributionMethod::Direct,
            tracking_code: None,
        }
    }

    pub fn is_direct(&self) -> bool {
        self.attribution_method == AttributionMethod::Direct
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionResult {
    pub success: bool,
    pub attribution: Attribution,
}

impl From<Attribution> for AttributionResult {
    fn from(attribution: Attribution) -> Self {
        Self {
            success: true,
            attribution,
        }
    }
}

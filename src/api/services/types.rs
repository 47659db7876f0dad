//! API 请求 / 响应类型定义

use serde::{Deserialize, Serialize};

use crate::attribution::{Attribution, AttributionMethod, AttributionResult};
use crate::services::LeadSubmissionResult;
use crate::storage::models::{ShortLink, VanitySlug};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomizeCodeRequest {
    pub custom_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeQuery {
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckAvailabilityRequest {
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlugQuery {
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClaimSlugRequest {
    pub slug: String,
}

/// `POST /api/leads` 的公开响应
///
/// 只回显调用方自己 cookie 得出的归因；email / phone 匹配到的是别人的
/// 历史记录，对匿名调用方一律显示为 DIRECT。
#[derive(Debug, Clone, Serialize)]
pub struct LeadReceipt {
    pub created: bool,
    pub attribution: AttributionResult,
}

impl From<LeadSubmissionResult> for LeadReceipt {
    fn from(result: LeadSubmissionResult) -> Self {
        let attribution = match result.attribution.attribution.attribution_method {
            AttributionMethod::Cookie => result.attribution,
            _ => AttributionResult::from(Attribution::direct()),
        };
        Self {
            created: result.created,
            attribution,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkListResponse {
    pub links: Vec<ShortLink>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkResponse {
    pub link: ShortLink,
}

/// 当前 vanity slug 及是否还能修改
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsernameResponse {
    pub username: Option<VanitySlug>,
    pub can_change: bool,
}

impl From<Option<VanitySlug>> for UsernameResponse {
    fn from(slug: Option<VanitySlug>) -> Self {
        let can_change = slug.as_ref().is_none_or(VanitySlug::can_change);
        Self {
            username: slug,
            can_change,
        }
    }
}

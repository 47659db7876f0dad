use std::str::FromStr;

use crate::attribution::AttributionMethod;
use crate::errors::{Result, TrackerError};
use crate::storage::models::{
    CodeClaim, CodeKind, CodeState, LeadRecord, Profile, Role, ShortLink, TrackingCodeRecord,
    VanitySlug,
};
use migration::entities::{code_registry, lead, profile, short_link, tracking_code, vanity_slug};

fn corrupt(what: &str, value: &str) -> TrackerError {
    TrackerError::storage_unavailable(format!("Corrupt {} value in database: '{}'", what, value))
}

pub fn model_to_claim(model: code_registry::Model) -> Result<CodeClaim> {
    let kind = CodeKind::from_str(&model.kind).map_err(|_| corrupt("code kind", &model.kind))?;
    Ok(CodeClaim {
        code: model.code,
        kind,
        owner_profile_id: model.owner_profile_id,
    })
}

pub fn model_to_tracking_code(model: tracking_code::Model) -> Result<TrackingCodeRecord> {
    Ok(TrackingCodeRecord {
        state: CodeState::from_db(&model.state, model.changed_at)?,
        profile_id: model.profile_id,
        code: model.code,
        qr_url: model.qr_url,
        created_at: model.created_at,
    })
}

pub fn tracking_code_to_active_model(record: &TrackingCodeRecord) -> tracking_code::ActiveModel {
    use sea_orm::ActiveValue::Set;

    tracking_code::ActiveModel {
        profile_id: Set(record.profile_id.clone()),
        code: Set(record.code.clone()),
        state: Set(record.state.as_db_str().to_string()),
        changed_at: Set(record.state.changed_at()),
        qr_url: Set(record.qr_url.clone()),
        created_at: Set(record.created_at),
    }
}

/// 计数器在数据库中为 i64，负值按 0 处理
pub fn model_to_short_link(model: short_link::Model) -> ShortLink {
    ShortLink {
        code: model.code,
        creator_profile_id: model.creator_profile_id,
        target_url: model.target_url,
        title: model.title,
        clicks: model.clicks.max(0) as u64,
        unique_clicks: model.unique_clicks.max(0) as u64,
        conversions: model.conversions.max(0) as u64,
        is_active: model.is_active,
        created_at: model.created_at,
    }
}

pub fn short_link_to_active_model(link: &ShortLink) -> short_link::ActiveModel {
    use sea_orm::ActiveValue::Set;

    short_link::ActiveModel {
        code: Set(link.code.clone()),
        creator_profile_id: Set(link.creator_profile_id.clone()),
        target_url: Set(link.target_url.clone()),
        title: Set(link.title.clone()),
        clicks: Set(link.clicks as i64),
        unique_clicks: Set(link.unique_clicks as i64),
        conversions: Set(link.conversions as i64),
        is_active: Set(link.is_active),
        created_at: Set(link.created_at),
    }
}

pub fn model_to_vanity_slug(model: vanity_slug::Model) -> VanitySlug {
    VanitySlug {
        profile_id: model.profile_id,
        slug: model.slug,
        changed_at: model.changed_at,
        created_at: model.created_at,
    }
}

pub fn vanity_slug_to_active_model(slug: &VanitySlug) -> vanity_slug::ActiveModel {
    use sea_orm::ActiveValue::Set;

    vanity_slug::ActiveModel {
        profile_id: Set(slug.profile_id.clone()),
        slug: Set(slug.slug.clone()),
        slug_key: Set(slug.slug_key()),
        changed_at: Set(slug.changed_at),
        created_at: Set(slug.created_at),
    }
}

pub fn model_to_profile(model: profile::Model) -> Result<Profile> {
    let role = Role::from_str(&model.role).map_err(|_| corrupt("role", &model.role))?;
    Ok(Profile {
        id: model.id,
        role,
        display_name: model.display_name,
        username: model.username,
    })
}

pub fn model_to_lead(model: lead::Model) -> Result<LeadRecord> {
    let referrer_type = match model.referrer_type.as_deref() {
        Some(raw) => Some(Role::from_str(raw).map_err(|_| corrupt("referrer type", raw))?),
        None => None,
    };
    let attribution_method = AttributionMethod::from_str(&model.attribution_method)
        .map_err(|_| corrupt("attribution method", &model.attribution_method))?;

    Ok(LeadRecord {
        id: Some(model.id),
        email: model.email,
        phone: model.phone,
        full_name: model.full_name,
        tracking_code: model.tracking_code,
        referrer_username: model.referrer_username,
        referrer_type,
        attribution_method,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

/// `id` 为空时生成插入用的 ActiveModel（自增主键 NotSet）
pub fn lead_to_active_model(record: &LeadRecord) -> lead::ActiveModel {
    use sea_orm::ActiveValue::{NotSet, Set};

    lead::ActiveModel {
        id: match record.id {
            Some(id) => Set(id),
            None => NotSet,
        },
        email: Set(record.email.clone()),
        phone: Set(record.phone.clone()),
        // 身份键只在插入时写入，之后补充的联系方式不改变它
        contact_key: match record.id {
            Some(_) => NotSet,
            None => Set(record.contact_key()),
        },
        full_name: Set(record.full_name.clone()),
        tracking_code: Set(record.tracking_code.clone()),
        referrer_username: Set(record.referrer_username.clone()),
        referrer_type: Set(record.referrer_type.map(|r| r.as_ref().to_string())),
        attribution_method: Set(record.attribution_method.as_ref().to_string()),
        created_at: Set(record.created_at),
        updated_at: Set(record.updated_at),
    }
}

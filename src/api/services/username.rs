//! `/api/username` handlers

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};

use super::error_code::ErrorCode;
use super::helpers::{AuthenticatedProfile, ErrorBody, api_result, json_response};
use super::types::{ClaimSlugRequest, SlugQuery, UsernameResponse};
use crate::services::{AppServices, SlugClaim};

pub async fn check_username(
    profile: AuthenticatedProfile,
    services: web::Data<AppServices>,
    query: web::Query<SlugQuery>,
) -> HttpResponse {
    api_result(
        services
            .vanity_slugs
            .check_availability(&query.slug, Some(profile.id()))
            .await,
    )
}

pub async fn get_username(
    profile: AuthenticatedProfile,
    services: web::Data<AppServices>,
) -> HttpResponse {
    api_result(
        services
            .vanity_slugs
            .get(profile.id())
            .await
            .map(UsernameResponse::from),
    )
}

pub async fn claim_username(
    profile: AuthenticatedProfile,
    services: web::Data<AppServices>,
    body: web::Json<ClaimSlugRequest>,
) -> HttpResponse {
    match services.vanity_slugs.claim(profile.id(), &body.slug).await {
        Ok(SlugClaim::Claimed(slug)) => api_result(Ok(UsernameResponse::from(Some(slug)))),
        // 拒绝时附带 canChange，让前端区分"被占用"和"已用完修改次数"
        Ok(SlugClaim::Rejected { reason, can_change }) => json_response(
            StatusCode::BAD_REQUEST,
            &ErrorBody {
                error: reason.message(),
                code: ErrorCode::from(&reason),
                can_change: Some(can_change),
            },
        ),
        Err(e) => api_result::<()>(Err(e)),
    }
}

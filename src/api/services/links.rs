//! `/api/links` handlers

use actix_web::{HttpResponse, web};
use tracing::info;

use super::helpers::{AuthenticatedProfile, api_result};
use super::types::{CheckAvailabilityRequest, LinkListResponse, LinkResponse};
use crate::services::{AppServices, CreateLinkRequest};

pub async fn check_availability(
    _profile: AuthenticatedProfile,
    services: web::Data<AppServices>,
    body: web::Json<CheckAvailabilityRequest>,
) -> HttpResponse {
    api_result(services.short_links.check_availability(&body.code).await)
}

pub async fn list_links(
    profile: AuthenticatedProfile,
    services: web::Data<AppServices>,
) -> HttpResponse {
    let result = services
        .short_links
        .list(profile.id())
        .await
        .map(|links| LinkListResponse { links });
    api_result(result)
}

pub async fn create_link(
    profile: AuthenticatedProfile,
    services: web::Data<AppServices>,
    body: web::Json<CreateLinkRequest>,
) -> HttpResponse {
    let result = services
        .short_links
        .create(profile.id(), body.into_inner())
        .await
        .map(|link| {
            info!("API: profile {} created link '{}'", profile.id(), link.code);
            LinkResponse { link }
        });
    api_result(result)
}

pub async fn deactivate_link(
    profile: AuthenticatedProfile,
    services: web::Data<AppServices>,
    path: web::Path<String>,
) -> HttpResponse {
    let code = path.into_inner();
    let result = services
        .short_links
        .deactivate(profile.id(), &code)
        .await
        .map(|link| LinkResponse { link });
    api_result(result)
}

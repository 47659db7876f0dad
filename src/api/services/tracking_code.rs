//! `/api/tracking-code` handlers

use actix_web::{HttpRequest, HttpResponse, Responder, web};
use tracing::trace;

use super::helpers::{AuthenticatedProfile, api_result, base_url};
use super::types::{CodeQuery, CustomizeCodeRequest};
use crate::services::{AppServices, TrackingCodeView};

/// 获取当前 tracking code（首次访问时分配）
pub async fn get_tracking_code(
    req: HttpRequest,
    profile: AuthenticatedProfile,
    services: web::Data<AppServices>,
) -> impl Responder {
    let base = base_url(&req);
    let result = services
        .tracking_codes
        .assign(profile.id(), &base)
        .await
        .map(|record| TrackingCodeView::from_record(&record, &base));
    api_result(result)
}

pub async fn customize_tracking_code(
    req: HttpRequest,
    profile: AuthenticatedProfile,
    services: web::Data<AppServices>,
    body: web::Json<CustomizeCodeRequest>,
) -> impl Responder {
    trace!(
        "Customize tracking code request from {}: {}",
        profile.id(),
        body.custom_code
    );
    let base = base_url(&req);
    let result = services
        .tracking_codes
        .customize(profile.id(), &body.custom_code, &base)
        .await
        .map(|record| TrackingCodeView::from_record(&record, &base));
    api_result(result)
}

pub async fn finalize_tracking_code(
    req: HttpRequest,
    profile: AuthenticatedProfile,
    services: web::Data<AppServices>,
) -> impl Responder {
    let base = base_url(&req);
    api_result(services.tracking_codes.finalize(profile.id(), &base).await)
}

pub async fn check_tracking_code(
    profile: AuthenticatedProfile,
    services: web::Data<AppServices>,
    query: web::Query<CodeQuery>,
) -> HttpResponse {
    api_result(
        services
            .tracking_codes
            .check_availability(&query.code, Some(profile.id()))
            .await,
    )
}

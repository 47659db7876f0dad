//! Public attribution and lead-capture handlers.
//!
//! Both read the attribution cookie; neither requires authentication, so
//! neither reveals attribution recorded for someone else's contact.

use actix_web::{HttpRequest, HttpResponse, web};

use super::helpers::{api_result, now_ms};
use super::types::LeadReceipt;
use crate::services::{AppServices, LeadSubmission};

/// 只根据请求自带的 cookie 归因
pub async fn get_attribution(req: HttpRequest, services: web::Data<AppServices>) -> HttpResponse {
    let now = now_ms();
    let cookie = services.cookies.read(&req, now);

    api_result(
        services
            .leads
            .get_attribution(cookie.as_ref(), None, None, now)
            .await,
    )
}

pub async fn submit_lead(
    req: HttpRequest,
    services: web::Data<AppServices>,
    body: web::Json<LeadSubmission>,
) -> HttpResponse {
    let now = now_ms();
    let cookie = services.cookies.read(&req, now);

    api_result(
        services
            .leads
            .submit_lead(body.into_inner(), cookie.as_ref(), now)
            .await
            .map(LeadReceipt::from),
    )
}

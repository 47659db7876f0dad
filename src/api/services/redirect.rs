use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, web};
use tracing::{debug, error, trace, warn};

use super::helpers::{base_url, now_ms};
use crate::errors::TrackerError;
use crate::services::{AppServices, VisitOutcome};
use crate::utils::{is_valid_code, resolve_target};

pub struct RedirectService;

impl RedirectService {
    pub async fn handle_redirect(
        req: HttpRequest,
        path: web::Path<String>,
        services: web::Data<AppServices>,
    ) -> HttpResponse {
        let code = path.into_inner();

        if !is_valid_code(&code) {
            // 非法短码，直接 404（不查缓存、不查库）
            trace!("Invalid code rejected: {}", code);
            return Self::not_found_response();
        }

        let now = now_ms();
        let previous = services.cookies.read(&req, now);

        match services
            .short_links
            .visit(&code, previous.as_ref(), now)
            .await
        {
            Ok(outcome) => Self::finish_redirect(&req, &services, outcome),
            Err(TrackerError::NotFound(_)) => {
                debug!("Redirect code not found: {}", code);
                Self::not_found_response()
            }
            Err(e) => {
                error!("Redirect failed for '{}': {}", code, e);
                Self::error_response()
            }
        }
    }

    #[inline]
    fn not_found_response() -> HttpResponse {
        HttpResponse::build(StatusCode::NOT_FOUND)
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .insert_header(("Cache-Control", "public, max-age=60"))
            .body("Not Found")
    }

    #[inline]
    fn error_response() -> HttpResponse {
        HttpResponse::build(StatusCode::INTERNAL_SERVER_ERROR)
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .body("Internal Server Error")
    }

    fn finish_redirect(
        req: &HttpRequest,
        services: &AppServices,
        outcome: VisitOutcome,
    ) -> HttpResponse {
        let target = resolve_target(&base_url(req), &outcome.resolution.target_url);

        let mut builder = HttpResponse::build(StatusCode::TEMPORARY_REDIRECT);
        builder
            .insert_header(("Location", target))
            .insert_header(("Cache-Control", "no-store"));

        // cookie 写入失败不影响跳转
        match services.cookies.build_cookie(&outcome.payload) {
            Ok(cookie) => {
                builder.cookie(cookie);
            }
            Err(e) => warn!("Failed to encode attribution cookie: {}", e),
        }

        builder.finish()
    }
}

/// Redirect 路由配置
pub fn redirect_routes() -> actix_web::Scope {
    web::scope("")
        .route("/{code}", web::get().to(RedirectService::handle_redirect))
        .route("/{code}", web::head().to(RedirectService::handle_redirect))
}

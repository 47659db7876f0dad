//! `/api` 路由配置
//!
//! tracking-code / links / username 需要 Bearer token；attribution 与 leads
//! 面向匿名访客开放。

use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::web;
use std::sync::Arc;

use super::attribution::{get_attribution, submit_lead};
use super::error_code::ErrorCode;
use super::helpers::error_response;
use super::links::{check_availability, create_link, deactivate_link, list_links};
use super::tracking_code::{
    check_tracking_code, customize_tracking_code, finalize_tracking_code, get_tracking_code,
};
use super::username::{check_username, claim_username, get_username};
use crate::api::jwt::IdentityVerifier;
use crate::api::middleware::ProfileAuth;

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| {
            let resp = error_response(
                StatusCode::BAD_REQUEST,
                ErrorCode::BadRequest,
                &err.to_string(),
            );
            InternalError::from_response(err, resp).into()
        })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let resp = error_response(
            StatusCode::BAD_REQUEST,
            ErrorCode::BadRequest,
            &err.to_string(),
        );
        InternalError::from_response(err, resp).into()
    })
}

/// Tracking code 路由 `/tracking-code`
pub fn tracking_code_routes() -> actix_web::Scope {
    web::scope("/tracking-code")
        .route("", web::get().to(get_tracking_code))
        .route("", web::patch().to(customize_tracking_code))
        .route("/finalize", web::post().to(finalize_tracking_code))
        .route("/check", web::get().to(check_tracking_code))
}

/// 短链接路由 `/links`
pub fn links_routes() -> actix_web::Scope {
    web::scope("/links")
        .route("", web::get().to(list_links))
        .route("", web::post().to(create_link))
        .route("/check-availability", web::post().to(check_availability))
        .route("/{code}/deactivate", web::post().to(deactivate_link))
}

/// Vanity slug 路由 `/username`
pub fn username_routes() -> actix_web::Scope {
    web::scope("/username")
        .route("", web::get().to(get_username))
        .route("", web::post().to(claim_username))
        .route("/check", web::get().to(check_username))
}

pub fn api_routes(verifier: Arc<IdentityVerifier>) -> actix_web::Scope {
    web::scope("/api")
        .app_data(json_config())
        .app_data(query_config())
        .service(tracking_code_routes().wrap(ProfileAuth::new(Arc::clone(&verifier))))
        .service(links_routes().wrap(ProfileAuth::new(Arc::clone(&verifier))))
        .service(username_routes().wrap(ProfileAuth::new(verifier)))
        .route("/attribution", web::post().to(get_attribution))
        .route("/leads", web::post().to(submit_lead))
}

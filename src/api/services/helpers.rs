//! API 帮助函数

use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::{FromRequest, HttpMessage, HttpRequest, HttpResponse};
use futures_util::future::{Ready, ready};
use serde::Serialize;

use super::error_code::ErrorCode;
use crate::errors::TrackerError;

/// 错误响应体：`{ "error": ..., "code": ... }`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody<'a> {
    pub error: &'a str,
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_change: Option<bool>,
}

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(status: StatusCode, data: &T) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(data)
}

pub fn success_response<T: Serialize>(data: &T) -> HttpResponse {
    json_response(StatusCode::OK, data)
}

pub fn error_response(status: StatusCode, code: ErrorCode, message: &str) -> HttpResponse {
    json_response(
        status,
        &ErrorBody {
            error: message,
            code,
            can_change: None,
        },
    )
}

/// 从 TrackerError 构建错误响应（自动映射 HTTP 状态码和 ErrorCode）
pub fn error_from_tracker(err: &TrackerError) -> HttpResponse {
    error_response(err.http_status(), ErrorCode::from(err), err.message())
}

/// 统一 Result → HttpResponse 转换
pub fn api_result<T: Serialize>(result: crate::errors::Result<T>) -> HttpResponse {
    match result {
        Ok(data) => success_response(&data),
        Err(e) => {
            if !e.is_client_error() {
                tracing::error!("API request failed: {}", e);
            }
            error_from_tracker(&e)
        }
    }
}

/// Public base URL for tracking links: configured value, else derived from the request.
pub fn base_url(req: &HttpRequest) -> String {
    let config = crate::config::get_config();
    if let Some(ref base) = config.server.public_base_url
        && !base.is_empty()
    {
        return base.trim_end_matches('/').to_string();
    }
    let info = req.connection_info();
    format!("{}://{}", info.scheme(), info.host())
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Profile id placed in request extensions by `ProfileAuth`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedProfile(pub String);

impl AuthenticatedProfile {
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl FromRequest for AuthenticatedProfile {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let profile = req.extensions().get::<AuthenticatedProfile>().cloned();
        ready(profile.ok_or_else(|| {
            let err = TrackerError::unauthenticated("Missing authenticated profile");
            actix_web::error::InternalError::from_response(
                err.message().to_string(),
                error_from_tracker(&err),
            )
            .into()
        }))
    }
}

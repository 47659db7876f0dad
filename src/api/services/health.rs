use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{error, info, trace};

use crate::services::AppServices;

// 应用启动时间结构体
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStorageCheck {
    pub status: &'static str,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime: u64,
    pub storage: HealthStorageCheck,
    /// 缓冲中尚未刷盘的访问数（未启用缓冲时为空）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_visits: Option<usize>,
    pub response_time_ms: u64,
}

/// Health Service
///
/// 直接调用 storage 的 ping，不经过业务 service（探针需要快速响应）。
pub struct HealthService;

impl HealthService {
    async fn check_storage(services: &AppServices) -> HealthStorageCheck {
        let backend = services.storage.backend_name().to_string();
        match tokio::time::timeout(Duration::from_secs(5), services.storage.ping()).await {
            Ok(Ok(())) => HealthStorageCheck {
                status: "healthy",
                backend,
                error: None,
            },
            Ok(Err(e)) => {
                error!("Storage health check failed: {}", e);
                HealthStorageCheck {
                    status: "unhealthy",
                    backend,
                    error: Some(e.message().to_string()),
                }
            }
            Err(_) => {
                error!("Storage health check timeout");
                HealthStorageCheck {
                    status: "unhealthy",
                    backend,
                    error: Some("timeout".to_string()),
                }
            }
        }
    }

    pub async fn health_check(
        services: web::Data<AppServices>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        let start_time = Instant::now();
        trace!("Received health check request");

        let storage = Self::check_storage(&services).await;
        let is_healthy = storage.status == "healthy";

        let now = chrono::Utc::now();
        let uptime = (now - app_start_time.start_datetime).num_seconds().max(0) as u64;

        let body = HealthResponse {
            status: if is_healthy { "healthy" } else { "unhealthy" },
            timestamp: now.to_rfc3339(),
            uptime,
            storage,
            pending_visits: services.visits.as_ref().map(|m| m.buffer_size()),
            response_time_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            "Health check completed in {:?}, status: {}, uptime: {}s",
            start_time.elapsed(),
            body.status,
            uptime
        );

        let status = if is_healthy {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        HttpResponse::build(status)
            .append_header(("Content-Type", "application/json; charset=utf-8"))
            .json(body)
    }

    // 就绪检查：存储可用才返回 200
    pub async fn readiness_check(services: web::Data<AppServices>) -> impl Responder {
        trace!("Received readiness check request");

        if Self::check_storage(&services).await.status == "healthy" {
            HttpResponse::Ok()
                .append_header(("Content-Type", "text/plain"))
                .body("OK")
        } else {
            HttpResponse::ServiceUnavailable()
                .append_header(("Content-Type", "text/plain"))
                .body("Service Unavailable")
        }
    }

    // 活跃性检查
    pub async fn liveness_check() -> impl Responder {
        trace!("Received liveness check request");

        HttpResponse::NoContent().finish()
    }
}

/// Health 路由配置
pub fn health_routes() -> actix_web::Scope {
    web::scope("/health")
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
        .route("/ready", web::get().to(HealthService::readiness_check))
        .route("/ready", web::head().to(HealthService::readiness_check))
        .route("/live", web::get().to(HealthService::liveness_check))
        .route("/live", web::head().to(HealthService::liveness_check))
}

//! Server mode
//!
//! Wires storage, services and routes into an actix HTTP server.

use actix_cors::Cors;
use actix_web::{
    App, HttpServer,
    http::{Method, header},
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::warn;

use crate::api::jwt::IdentityVerifier;
use crate::api::middleware::RequestIdMiddleware;
use crate::api::services::{AppStartTime, api_routes, health_routes, redirect_routes};
use crate::config::{CorsConfig, get_config};
use crate::runtime::lifetime;

/// Validate CORS configuration at startup (runs once, not per worker)
fn validate_cors_config(cors_config: &CorsConfig) {
    if !cors_config.enabled {
        return;
    }

    if cors_config.allowed_origins.is_empty() {
        warn!(
            "CORS enabled but allowed_origins is empty. \
            No cross-origin requests will be allowed."
        );
    }

    let is_any_origin = cors_config.allowed_origins.iter().any(|o| o == "*");
    if is_any_origin && cors_config.allow_credentials {
        tracing::error!(
            "SECURITY WARNING: allow_any_origin + allow_credentials is a dangerous combination! \
            Disabling credentials for safety."
        );
    }
}

/// Build CORS middleware from configuration
fn build_cors_middleware(cors_config: &CorsConfig) -> Cors {
    // 未启用时保持同源策略
    if !cors_config.enabled {
        return Cors::default();
    }

    let is_any_origin = cors_config.allowed_origins.iter().any(|o| o == "*");

    let mut cors = Cors::default()
        .allowed_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allowed_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::HeaderName::from_static("x-request-id")])
        .max_age(cors_config.max_age as usize);

    if is_any_origin {
        cors = cors.allow_any_origin();
    } else {
        for origin in &cors_config.allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    // 通配 origin 时 actix-cors 会回显 Origin，不能再带凭据
    if cors_config.allow_credentials && !is_any_origin {
        cors = cors.supports_credentials();
    }

    cors
}

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    let app_start_time = AppStartTime {
        start_datetime: chrono::Utc::now(),
    };

    let startup = lifetime::startup::prepare_server_startup()
        .await
        .map_err(|e| {
            tracing::error!("Server startup failed: {}", e);
            e
        })?;
    let services = startup.services;

    let config = get_config();
    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    let cors_config = config.cors.clone();
    validate_cors_config(&cors_config);

    let verifier = Arc::new(IdentityVerifier::from_config(&config.auth));
    let visits_for_shutdown = services.visits.clone();

    let server = HttpServer::new(move || {
        let cors = build_cors_middleware(&cors_config);

        App::new()
            .wrap(RequestIdMiddleware)
            .wrap(cors)
            .wrap(Compress::default())
            .app_data(web::Data::new(services.clone()))
            .app_data(web::Data::new(app_start_time.clone()))
            .app_data(web::PayloadConfig::new(64 * 1024))
            .wrap(
                DefaultHeaders::new()
                    .add(("Cache-Control", "no-cache, no-store, must-revalidate")),
            )
            .service(health_routes())
            .service(api_routes(Arc::clone(&verifier)))
            .service(redirect_routes())
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .client_disconnect_timeout(std::time::Duration::from_millis(1000))
    .workers(cpu_count);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{}", bind_address);
    let server = server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run();

    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown(visits_for_shutdown) => {
            warn!("Graceful shutdown: all tasks completed");
        }
    }

    Ok(())
}

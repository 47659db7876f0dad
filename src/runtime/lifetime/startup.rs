use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::get_config;
use crate::services::AppServices;
use crate::storage::SeaOrmStorage;

pub struct StartupContext {
    pub storage: Arc<SeaOrmStorage>,
    pub services: AppServices,
}

/// 打开存储（含迁移）并组装业务 service
///
/// CLI 查询命令与 HTTP 服务共用同一条初始化路径。
pub async fn prepare_services() -> Result<StartupContext> {
    let config = get_config();

    let storage = SeaOrmStorage::from_config()
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.backend_name());

    let services = AppServices::new(Arc::clone(&storage), &config);
    Ok(StartupContext { storage, services })
}

/// 准备服务器启动的上下文
pub async fn prepare_server_startup() -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install rustls crypto provider: {:?}", e))?;

    let context = prepare_services().await?;

    if let Some(manager) = context.services.visits.clone() {
        tokio::spawn(async move {
            manager.start_background_task().await;
        });
        info!("Buffered visit counting enabled");
    } else {
        debug!("Visit counting writes through to storage");
    }

    info!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );
    Ok(context)
}

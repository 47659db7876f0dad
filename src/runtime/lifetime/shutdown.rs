use std::time::Duration;
use tokio::signal;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::analytics::VisitManager;

/// 关闭超时时间（秒）
const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// 等待 Ctrl+C，然后把缓冲中的访问计数落盘
pub async fn listen_for_shutdown(visits: Option<VisitManager>) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, flushing data...");
        }
        Err(e) => {
            warn!(
                "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
                e
            );
        }
    }

    let Some(manager) = visits else {
        info!("VisitManager is not enabled, nothing to flush");
        return;
    };

    let pending = manager.buffer_size();
    match timeout(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS), manager.flush()).await {
        Ok(()) => {
            info!("VisitManager flushed {} pending visits", pending);
        }
        Err(_) => {
            error!(
                "VisitManager flush timed out after {} seconds, {} visits may be lost",
                SHUTDOWN_TIMEOUT_SECS, pending
            );
        }
    }
}

//! SeaORM storage backend
//!
//! This module provides database storage using SeaORM,
//! supporting SQLite, MySQL/MariaDB, and PostgreSQL.

mod connection;
mod converters;
mod directory;
mod operations;
mod registry;
mod short_links;
mod tracking_codes;
mod vanity_slugs;
mod visit_sink;

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tracing::warn;

use crate::analytics::VisitSink;
use crate::errors::{Result, TrackerError};

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use converters::{
    model_to_lead, model_to_profile, model_to_short_link, model_to_tracking_code,
    model_to_vanity_slug,
};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite://")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(TrackerError::database_config(format!(
            "Cannot infer database type from URL: {}. Supported schemes: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// 把裸文件路径补全为 sqlite URL
fn normalize_sqlite_url(database_url: &str) -> String {
    if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else if database_url == ":memory:" {
        "sqlite::memory:".to_string()
    } else {
        format!("sqlite://{}?mode=rwc", database_url)
    }
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
}

impl SeaOrmStorage {
    pub async fn new(database_url: &str, backend_name: &str) -> Result<Self> {
        if database_url.is_empty() {
            return Err(TrackerError::database_config("database_url is not set"));
        }

        let db = if backend_name == "sqlite" {
            connect_sqlite(&normalize_sqlite_url(database_url)).await?
        } else {
            connect_generic(database_url, backend_name).await?
        };

        let storage = SeaOrmStorage {
            db,
            backend_name: backend_name.to_string(),
        };

        run_migrations(&storage.db).await?;

        warn!(
            "{} Storage initialized.",
            storage.backend_name.to_uppercase()
        );
        Ok(storage)
    }

    /// 根据全局配置创建存储
    pub async fn from_config() -> Result<Arc<Self>> {
        let config = crate::config::get_config();
        let database_url = &config.database.database_url;
        let backend_type = infer_backend_from_url(database_url)?;
        Ok(Arc::new(Self::new(database_url, &backend_type).await?))
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    pub fn as_visit_sink(&self) -> Arc<dyn VisitSink> {
        Arc::new(self.clone()) as Arc<dyn VisitSink>
    }

    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// 就绪探针：执行一次轻量查询
    pub async fn ping(&self) -> Result<()> {
        self.db
            .ping()
            .await
            .map_err(|e| TrackerError::storage_unavailable(format!("Database ping failed: {}", e)))
    }
}

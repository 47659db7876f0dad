//! Shared setup for integration tests: a throwaway SQLite database per test.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use tempfile::TempDir;

use tracklinker::config::{StaticConfig, init_config};
use tracklinker::services::AppServices;
use tracklinker::storage::traits::ProfileDirectory;
use tracklinker::storage::{Profile, Role, SeaOrmStorage};

pub const BASE_URL: &str = "https://go.example.com";
pub const COOKIE_SECRET: &str = "integration-cookie-secret";
pub const JWT_SECRET: &str = "integration-jwt-secret";

static INIT: Once = Once::new();

pub fn init_test_config() {
    INIT.call_once(|| {
        init_config();
    });
}

pub fn test_config() -> StaticConfig {
    let mut config = StaticConfig::default();
    config.attribution.cookie_secret = COOKIE_SECRET.to_string();
    config.attribution.cookie_secure = false;
    config.auth.jwt_secret = JWT_SECRET.to_string();
    config
}

pub struct TestEnv {
    // 持有 TempDir，drop 时删除数据库文件
    _dir: TempDir,
    pub storage: Arc<SeaOrmStorage>,
    pub services: AppServices,
}

pub async fn setup() -> TestEnv {
    setup_with(test_config()).await
}

pub async fn setup_with(config: StaticConfig) -> TestEnv {
    init_test_config();

    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("tracklinker_test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let storage = Arc::new(
        SeaOrmStorage::new(&db_url, "sqlite")
            .await
            .expect("Failed to create storage"),
    );
    let services = AppServices::new(Arc::clone(&storage), &config);

    TestEnv {
        _dir: dir,
        storage,
        services,
    }
}

impl TestEnv {
    pub async fn profile(&self, id: &str, role: Role, display_name: &str, username: Option<&str>) {
        self.storage
            .upsert_profile(&Profile {
                id: id.to_string(),
                role,
                display_name: display_name.to_string(),
                username: username.map(str::to_string),
            })
            .await
            .expect("Failed to seed profile");
    }
}

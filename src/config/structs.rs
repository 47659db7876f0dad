use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter};

/// Cookie SameSite 策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, EnumIter, AsRefStr)]
#[serde(rename_all = "PascalCase")]
#[strum(serialize_all = "PascalCase")]
pub enum SameSitePolicy {
    Strict,
    #[default]
    Lax,
    None,
}

impl std::fmt::Display for SameSitePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl std::str::FromStr for SameSitePolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lax" => Ok(Self::Lax),
            "none" => Ok(Self::None),
            _ => Err(format!(
                "Invalid SameSite policy: '{}'. Valid: Strict, Lax, None",
                s
            )),
        }
    }
}

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 优先级：ENV > config.toml > 默认值
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub attribution: AttributionConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub visits: VisitConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// ENV 前缀：TL，分隔符：__
    /// 示例：TL__SERVER__PORT=9999
    pub fn load(path: &str) -> Self {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("TL")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    /// 对外访问地址（如 https://go.example.com），未设置时从请求推导
    #[serde(default)]
    pub public_base_url: Option<String>,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// Tracking code 与短链接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// assign / 随机短码生成的最大尝试次数
    #[serde(default = "default_assign_max_attempts")]
    pub assign_max_attempts: u32,
    /// QR 图片地址模板，{url} 会被替换为 URL 编码后的追踪链接
    #[serde(default = "default_qr_url_template")]
    pub qr_url_template: String,
    /// 主 tracking code 跳转的落地页路径
    #[serde(default = "default_landing_path")]
    pub landing_path: String,
    #[serde(default = "default_random_code_length")]
    pub random_code_length: usize,
}

/// 归因 cookie 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// 用于签名 cookie 的密钥；为空时启动时随机生成（重启后旧 cookie 失效）
    #[serde(default)]
    pub cookie_secret: String,
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    #[serde(default = "default_cookie_secure")]
    pub cookie_secure: bool,
    #[serde(default)]
    pub cookie_same_site: SameSitePolicy,
    #[serde(default)]
    pub cookie_domain: Option<String>,
    /// 重复提交时是否覆盖已有归因（默认首次归因优先）
    #[serde(default)]
    pub reattribute_on_resubmit: bool,
}

/// 外部身份提供方的 JWT 校验配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default)]
    pub issuer: Option<String>,
}

/// 短码解析缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_resolve_ttl_secs")]
    pub resolve_ttl_secs: u64,
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,
}

/// 访问计数配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitConfig {
    #[serde(default)]
    pub buffered: bool,
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    #[serde(default = "default_max_visits_before_flush")]
    pub max_visits_before_flush: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub allow_credentials: bool,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

// ============================================================
// Default value functions
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_database_url() -> String {
    "tracklinker.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_database_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_assign_max_attempts() -> u32 {
    10
}

fn default_qr_url_template() -> String {
    "https://api.qrserver.com/v1/create-qr-code/?size=300x300&data={url}".to_string()
}

fn default_landing_path() -> String {
    "/".to_string()
}

fn default_random_code_length() -> usize {
    6
}

fn default_cookie_name() -> String {
    "tl_attribution".to_string()
}

fn default_window_days() -> u32 {
    30
}

fn default_cookie_secure() -> bool {
    true
}

fn default_resolve_ttl_secs() -> u64 {
    60
}

fn default_cache_capacity() -> u64 {
    10000
}

fn default_flush_interval_secs() -> u64 {
    30
}

fn default_max_visits_before_flush() -> usize {
    1000
}

fn default_cors_max_age() -> u64 {
    3600
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
            public_base_url: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_database_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            assign_max_attempts: default_assign_max_attempts(),
            qr_url_template: default_qr_url_template(),
            landing_path: default_landing_path(),
            random_code_length: default_random_code_length(),
        }
    }
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            cookie_secret: String::new(),
            window_days: default_window_days(),
            cookie_secure: default_cookie_secure(),
            cookie_same_site: SameSitePolicy::default(),
            cookie_domain: None,
            reattribute_on_resubmit: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            resolve_ttl_secs: default_resolve_ttl_secs(),
            max_capacity: default_cache_capacity(),
        }
    }
}

impl Default for VisitConfig {
    fn default() -> Self {
        Self {
            buffered: false,
            flush_interval_secs: default_flush_interval_secs(),
            max_visits_before_flush: default_max_visits_before_flush(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allowed_origins: Vec::new(),
            allow_credentials: false,
            max_age: default_cors_max_age(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_attribution_window() {
        let config = StaticConfig::default();
        assert_eq!(config.attribution.window_days, 30);
        assert_eq!(config.attribution.cookie_same_site, SameSitePolicy::Lax);
        assert!(config.attribution.cookie_secure);
        assert!(!config.attribution.reattribute_on_resubmit);
        assert_eq!(config.tracking.assign_max_attempts, 10);
    }

    #[test]
    fn test_sample_config_roundtrips_through_toml() {
        let sample = StaticConfig::generate_sample_config();
        let parsed: StaticConfig = toml::from_str(&sample).expect("sample config should parse");
        assert_eq!(parsed.server.port, 8080);
        assert_eq!(parsed.attribution.cookie_name, "tl_attribution");
    }

    #[test]
    fn test_same_site_from_str() {
        assert_eq!("lax".parse::<SameSitePolicy>(), Ok(SameSitePolicy::Lax));
        assert_eq!("STRICT".parse::<SameSitePolicy>(), Ok(SameSitePolicy::Strict));
        assert!("sometimes".parse::<SameSitePolicy>().is_err());
    }
}

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 环境变量前缀，例如 `IPLOC__RATE_LIMITER__KIND=distributed`
pub const ENV_PREFIX: &str = "IPLOC";

/// 静态配置（从 TOML 加载，启动时使用）
///
/// 包含：
/// - server: 监听地址、端口、worker 数量、可信代理
/// - logging: 日志配置
/// - cache: 查询结果缓存
/// - rate_limiter: 准入限流
/// - source: 地理位置数据源
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rate_limiter: RateLimiterConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > 配置文件 > 默认值
    /// ENV 前缀：IPLOC，分隔符：__
    pub fn load(path: Option<&str>) -> Result<Self> {
        use config::{Config, Environment, File};

        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.trusted_proxies")
                    .try_parsing(true),
            )
            .build()?;

        let config = settings.try_deserialize::<StaticConfig>()?;
        if std::path::Path::new(path).exists() {
            eprintln!("[INFO] Configuration loaded from: {}", path);
        }
        Ok(config)
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            crate::errors::IpLocatorError::serialization(format!(
                "Failed to render config as TOML: {}",
                e
            ))
        })?;

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
    /// 可信代理（单 IP 或 CIDR），来自这些地址的请求使用 X-Forwarded-For
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
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

/// 查询结果缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    /// 过期条目清扫间隔，0 表示不主动清扫（仅由 LRU 淘汰）
    #[serde(default)]
    pub purge_interval_secs: u64,
}

/// 限流配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimiterConfig {
    /// local | distributed
    #[serde(default = "default_limiter_kind")]
    pub kind: String,
    #[serde(default = "default_global_capacity")]
    pub global_capacity: u32,
    #[serde(default = "default_client_capacity")]
    pub client_capacity: u32,
    #[serde(default = "default_refill_interval_ms")]
    pub refill_interval_ms: u64,
    #[serde(default = "default_bucket_idle_ttl_ms")]
    pub bucket_idle_ttl_ms: u64,
    #[serde(default = "default_cleanup_interval_ms")]
    pub cleanup_interval_ms: u64,
    /// 单次共享存储调用超时
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    /// 拒绝时是否归还已占用的计数（仅 distributed）
    #[serde(default)]
    pub refund_on_deny: bool,
    #[serde(default)]
    pub redis: RedisConfig,
}

/// Redis 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,
}

/// 数据源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// disk | maxmind | mongo
    #[serde(default = "default_source_kind")]
    pub kind: String,
    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub disk: DiskSourceConfig,
    #[serde(default)]
    pub maxmind: MaxMindSourceConfig,
    #[serde(default)]
    pub mongo: MongoSourceConfig,
}

/// 本地 JSON 目录数据源
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskSourceConfig {
    #[serde(default = "default_disk_path")]
    pub path: String,
}

/// MaxMind GeoLite2 数据源
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaxMindSourceConfig {
    #[serde(default = "default_maxmind_path")]
    pub path: String,
}

/// MongoDB 集合数据源，文档结构 `{ip, country, city}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSourceConfig {
    #[serde(default = "default_mongo_uri")]
    pub uri: String,
    #[serde(default = "default_mongo_database")]
    pub database: String,
    #[serde(default = "default_mongo_collection")]
    pub collection: String,
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

fn default_cache_capacity() -> usize {
    10_000
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn default_limiter_kind() -> String {
    "local".to_string()
}

fn default_global_capacity() -> u32 {
    100
}

fn default_client_capacity() -> u32 {
    5
}

fn default_refill_interval_ms() -> u64 {
    1_000
}

fn default_bucket_idle_ttl_ms() -> u64 {
    10_000
}

fn default_cleanup_interval_ms() -> u64 {
    10_000
}

fn default_store_timeout_ms() -> u64 {
    500
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/".to_string()
}

fn default_redis_key_prefix() -> String {
    "rate_limiter:".to_string()
}

fn default_source_kind() -> String {
    "disk".to_string()
}

fn default_source_timeout_ms() -> u64 {
    2_000
}

fn default_disk_path() -> String {
    "data".to_string()
}

fn default_maxmind_path() -> String {
    "GeoLite2-City.mmdb".to_string()
}

fn default_mongo_uri() -> String {
    "mongodb://127.0.0.1:27017".to_string()
}

fn default_mongo_database() -> String {
    "iplocator".to_string()
}

fn default_mongo_collection() -> String {
    "ip_locations".to_string()
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
            trusted_proxies: Vec::new(),
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

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
            purge_interval_secs: 0,
        }
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            kind: default_limiter_kind(),
            global_capacity: default_global_capacity(),
            client_capacity: default_client_capacity(),
            refill_interval_ms: default_refill_interval_ms(),
            bucket_idle_ttl_ms: default_bucket_idle_ttl_ms(),
            cleanup_interval_ms: default_cleanup_interval_ms(),
            store_timeout_ms: default_store_timeout_ms(),
            refund_on_deny: false,
            redis: RedisConfig::default(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_redis_key_prefix(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: default_source_kind(),
            timeout_ms: default_source_timeout_ms(),
            disk: DiskSourceConfig::default(),
            maxmind: MaxMindSourceConfig::default(),
            mongo: MongoSourceConfig::default(),
        }
    }
}

impl Default for DiskSourceConfig {
    fn default() -> Self {
        Self {
            path: default_disk_path(),
        }
    }
}

impl Default for MaxMindSourceConfig {
    fn default() -> Self {
        Self {
            path: default_maxmind_path(),
        }
    }
}

impl Default for MongoSourceConfig {
    fn default() -> Self {
        Self {
            uri: default_mongo_uri(),
            database: default_mongo_database(),
            collection: default_mongo_collection(),
        }
    }
}

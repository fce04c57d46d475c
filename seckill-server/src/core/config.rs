use std::path::PathBuf;
use std::time::Duration;

use crate::seckill::{CacheTtls, Timeouts};

/// `DATABASE_PATH` value selecting the in-memory store
pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// 服务器配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | HTTP_PORT | 8080 | HTTP 服务端口 |
/// | WORK_DIR | ./data | 工作目录 |
/// | DATABASE_PATH | {WORK_DIR}/seckill.redb | 数据库文件 (`:memory:` 为内存库) |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 / EnvFilter 指令 |
/// | LOG_JSON | false | JSON 格式日志 |
/// | LOG_DIR | - | 日志目录 (按天滚动) |
/// | CACHE_OP_TIMEOUT_MS | 500 | 单次缓存操作超时 |
/// | STORE_TIMEOUT_MS | 3000 | 数据库读 / 写事务超时 |
/// | CAMPAIGN_CACHE_TTL_SECS | 1800 | 活动缓存 TTL |
/// | CAMPAIGN_LIST_CACHE_TTL_SECS | 300 | 活动列表缓存 TTL |
/// | ENTITY_CACHE_TTL_SECS | 1800 | 商品 / 用户 / 订单缓存 TTL |
/// | CACHE_SWEEP_INTERVAL_SECS | 60 | 过期 key 清理间隔 |
/// | SEED_DEMO_DATA | false | 启动时写入演示数据 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时 |
/// | SHUTDOWN_TIMEOUT_MS | 10000 | 优雅关闭超时 |
///
/// # 示例
///
/// ```ignore
/// HTTP_PORT=9000 DATABASE_PATH=:memory: SEED_DEMO_DATA=true cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub work_dir: String,
    pub database_path: Option<String>,
    /// development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    pub cache_op_timeout_ms: u64,
    pub store_timeout_ms: u64,
    pub campaign_cache_ttl_secs: u64,
    pub campaign_list_cache_ttl_secs: u64,
    pub entity_cache_ttl_secs: u64,
    pub cache_sweep_interval_secs: u64,
    pub seed_demo_data: bool,
    pub request_timeout_ms: u64,
    pub shutdown_timeout_ms: u64,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置，未设置或无法解析时使用默认值
    pub fn from_env() -> Self {
        Self {
            http_port: env_or("HTTP_PORT", 8080),
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            database_path: std::env::var("DATABASE_PATH").ok().filter(|p| !p.is_empty()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: env_or("LOG_JSON", false),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
            cache_op_timeout_ms: env_or("CACHE_OP_TIMEOUT_MS", 500),
            store_timeout_ms: env_or("STORE_TIMEOUT_MS", 3000),
            campaign_cache_ttl_secs: env_or("CAMPAIGN_CACHE_TTL_SECS", 1800),
            campaign_list_cache_ttl_secs: env_or("CAMPAIGN_LIST_CACHE_TTL_SECS", 300),
            entity_cache_ttl_secs: env_or("ENTITY_CACHE_TTL_SECS", 1800),
            cache_sweep_interval_secs: env_or("CACHE_SWEEP_INTERVAL_SECS", 60),
            seed_demo_data: env_or("SEED_DEMO_DATA", false),
            request_timeout_ms: env_or("REQUEST_TIMEOUT_MS", 30000),
            shutdown_timeout_ms: env_or("SHUTDOWN_TIMEOUT_MS", 10000),
        }
    }

    /// In-memory store on an ephemeral port, for tests
    pub fn for_tests() -> Self {
        Self {
            http_port: 0,
            work_dir: std::env::temp_dir().to_string_lossy().into_owned(),
            database_path: Some(IN_MEMORY_DATABASE.into()),
            environment: "test".into(),
            log_level: "warn".into(),
            log_json: false,
            log_dir: None,
            cache_op_timeout_ms: 500,
            store_timeout_ms: 3000,
            campaign_cache_ttl_secs: 1800,
            campaign_list_cache_ttl_secs: 300,
            entity_cache_ttl_secs: 1800,
            cache_sweep_interval_secs: 60,
            seed_demo_data: false,
            request_timeout_ms: 30000,
            shutdown_timeout_ms: 1000,
        }
    }

    /// Resolved database file, `None` for the in-memory store
    pub fn database_file(&self) -> Option<PathBuf> {
        match self.database_path.as_deref() {
            Some(IN_MEMORY_DATABASE) => None,
            Some(path) => Some(PathBuf::from(path)),
            None => Some(PathBuf::from(&self.work_dir).join("seckill.redb")),
        }
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            cache_op: Duration::from_millis(self.cache_op_timeout_ms),
            store: Duration::from_millis(self.store_timeout_ms),
        }
    }

    pub fn cache_ttls(&self) -> CacheTtls {
        CacheTtls {
            campaign: Duration::from_secs(self.campaign_cache_ttl_secs),
            campaign_list: Duration::from_secs(self.campaign_list_cache_ttl_secs),
            entity: Duration::from_secs(self.entity_cache_ttl_secs),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

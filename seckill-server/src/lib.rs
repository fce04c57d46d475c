//! Seckill Server - 秒杀 (flash sale) 后端
//!
//! # 架构概述
//!
//! 库存扣减完全在缓存计数器上完成 (原子 decrement)，数据库只负责
//! 持久化订单。订单写入失败时库存回补，保证不超卖。
//!
//! # 模块结构
//!
//! ```text
//! seckill-server/src/
//! ├── core/          # 配置、状态、错误、服务器
//! ├── cache/         # 计数器缓存 (CounterCache / MemoryCache)
//! ├── db/            # redb 存储 (活动、商品、用户、订单)
//! ├── seckill/       # 预热、下单流程、查询服务
//! ├── api/           # HTTP 路由和处理器
//! ├── middleware/    # 请求日志
//! └── utils/         # 日志初始化
//! ```

pub mod api;
pub mod cache;
pub mod core;
pub mod db;
pub mod middleware;
pub mod seckill;
pub mod utils;

// Re-export 公共类型
pub use cache::{CounterCache, MemoryCache};
pub use core::{Config, Server, ServerError, ServerState};
pub use db::{CatalogStore, OrderStore, RedbStore};
pub use seckill::{PurchaseOrchestrator, PurchaseOutcome, QueryService, StockPreloader};
pub use shared::{ApiResponse, AppError, AppResult, ErrorCode};
pub use utils::init_logger;

/// Load `.env` and build the config, then start logging with it
pub fn setup_environment() -> Config {
    // .env 文件是可选的
    let dotenv_loaded = dotenv::dotenv().is_ok();

    let config = Config::from_env();
    init_logger(
        &config.log_level,
        config.log_json,
        config.log_dir.as_deref(),
    );

    if dotenv_loaded {
        tracing::debug!("Loaded environment from .env");
    }
    config
}

pub fn print_banner() {
    println!(
        r#"
   _____           __   _ ____
  / ___/___  _____/ /__(_) / /
  \__ \/ _ \/ ___/ //_/ / / /
 ___/ /  __/ /__/ ,< / / / /
/____/\___/\___/_/|_/_/_/_/
    "#
    );
}

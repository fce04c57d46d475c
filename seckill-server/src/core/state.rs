use std::sync::Arc;

use crate::cache::{CounterCache, MemoryCache};
use crate::core::{Config, Result};
use crate::db::{CatalogStore, OrderStore, RedbStore};
use crate::seckill::{PurchaseOrchestrator, QueryService, StockPreloader};

/// 服务器状态 - 持有所有服务的共享引用
///
/// 所有字段都是 `Arc` 或内部持有 `Arc`，clone 只是浅拷贝。
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | cache | 计数器缓存 (进程内) |
/// | store | redb 持久化存储 |
/// | query | 查询 / 活动管理 |
/// | orchestrator | 秒杀下单 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub cache: Arc<MemoryCache>,
    pub store: Arc<RedbStore>,
    pub query: QueryService,
    pub orchestrator: PurchaseOrchestrator,
}

impl ServerState {
    /// Open the store named by the config and wire up the services
    pub fn initialize(config: &Config) -> Result<Self> {
        let txn_timeout = config.timeouts().store;
        let store = match config.database_file() {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                tracing::info!(path = %path.display(), "Opening database");
                RedbStore::open(&path, txn_timeout)?
            }
            None => {
                tracing::warn!("Using in-memory database, data is lost on exit");
                RedbStore::open_in_memory(txn_timeout)?
            }
        };

        Ok(Self::with_parts(
            config.clone(),
            Arc::new(MemoryCache::new()),
            Arc::new(store),
        ))
    }

    /// Wire services over existing cache and store
    pub fn with_parts(config: Config, cache: Arc<MemoryCache>, store: Arc<RedbStore>) -> Self {
        let timeouts = config.timeouts();
        let counter: Arc<dyn CounterCache> = cache.clone();
        let catalog: Arc<dyn CatalogStore> = store.clone();
        let orders: Arc<dyn OrderStore> = store.clone();

        let preloader = StockPreloader::new(counter.clone(), catalog.clone(), timeouts);
        let query = QueryService::new(
            counter.clone(),
            catalog,
            orders.clone(),
            preloader,
            timeouts,
            config.cache_ttls(),
        );
        let orchestrator = PurchaseOrchestrator::new(counter, orders, query.clone(), timeouts);

        Self {
            config,
            cache,
            store,
            query,
            orchestrator,
        }
    }

    pub fn catalog(&self) -> &dyn CatalogStore {
        self.store.as_ref()
    }
}

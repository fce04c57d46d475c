//! Durable Store
//!
//! 商品、秒杀活动、用户与订单的持久化层 (system of record)。
//!
//! 存储契约拆成两个 trait，调用方只依赖自己需要的那一半：
//!
//! - [`CatalogStore`] - 活动 / 商品 / 用户
//! - [`OrderStore`] - 订单 (显式事务，`(campaign, user)` 唯一)
//!
//! [`RedbStore`] 是基于 redb 的实现，两个 trait 都实现。

pub mod seed;
pub mod storage;

use async_trait::async_trait;
use shared::models::{
    Campaign, CampaignCreate, NewOrder, Product, ProductCreate, SeckillOrder, User, UserCreate,
};
use thiserror::Error;

pub use storage::RedbStore;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("User {user_id} already has order {order_no} for campaign {seckill_id}")]
    DuplicateOrder {
        seckill_id: i64,
        user_id: i64,
        /// The order already held by the user
        order_no: String,
    },

    #[error("Order number already exists: {0}")]
    DuplicateOrderNo(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Transaction deadline exceeded")]
    Timeout,

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Campaign, product and user persistence
#[async_trait]
pub trait CatalogStore: Send + Sync + 'static {
    async fn find_campaign(&self, id: i64) -> StoreResult<Option<Campaign>>;

    /// All campaigns ordered by id
    async fn list_campaigns(&self) -> StoreResult<Vec<Campaign>>;

    /// Persist a new active campaign; the store assigns the id
    async fn insert_campaign(&self, create: CampaignCreate) -> StoreResult<Campaign>;

    /// Transition `Active -> Closed`; closing a closed campaign is a no-op.
    /// Returns `None` if the campaign does not exist.
    async fn close_campaign(&self, id: i64) -> StoreResult<Option<Campaign>>;

    async fn find_product(&self, id: i64) -> StoreResult<Option<Product>>;

    async fn insert_product(&self, create: ProductCreate) -> StoreResult<Product>;

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;

    async fn insert_user(&self, create: UserCreate) -> StoreResult<User>;

    async fn count_users(&self) -> StoreResult<u64>;

    async fn count_products(&self) -> StoreResult<u64>;
}

/// Order persistence
#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    /// Persist an order in a single explicit transaction
    ///
    /// Fails with [`StoreError::DuplicateOrder`] if the user already holds an
    /// order for the campaign. A [`StoreError::Timeout`] means the
    /// transaction was aborted and nothing was written.
    async fn create_order(&self, order: NewOrder) -> StoreResult<SeckillOrder>;

    async fn find_order_by_no(&self, order_no: &str) -> StoreResult<Option<SeckillOrder>>;

    /// Orders of one user, newest first
    async fn list_orders_by_user(&self, user_id: i64) -> StoreResult<Vec<SeckillOrder>>;

    async fn count_orders_for_campaign(&self, seckill_id: i64) -> StoreResult<u64>;
}

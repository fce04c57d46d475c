//! redb-based durable store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `campaigns` | `campaign_id` | `Campaign` (JSON) | 秒杀活动 |
//! | `products` | `product_id` | `Product` (JSON) | 商品 |
//! | `users` | `user_id` | `User` (JSON) | 用户 (含密码哈希) |
//! | `orders` | `order_no` | `SeckillOrder` (JSON) | 订单 |
//! | `user_orders` | `(user_id, order_no)` | `()` | 用户订单索引 |
//! | `campaign_buyers` | `(campaign_id, user_id)` | `order_no` | 一人一单唯一约束 |
//! | `sequence_counter` | name | `u64` | 自增 id |
//!
//! redb 是单写者模型，所有写事务天然串行。调用都放在
//! `spawn_blocking` 中执行，不阻塞 async worker。

use async_trait::async_trait;
use chrono::Utc;
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{
    Campaign, CampaignCreate, CampaignStatus, NewOrder, Product, ProductCreate, ProductStatus,
    SeckillOrder, User, UserCreate, UserStatus,
};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{CatalogStore, OrderStore, StoreError, StoreResult};

type JsonTable = TableDefinition<'static, i64, &'static [u8]>;

const CAMPAIGNS_TABLE: JsonTable = TableDefinition::new("campaigns");
const PRODUCTS_TABLE: JsonTable = TableDefinition::new("products");
const USERS_TABLE: JsonTable = TableDefinition::new("users");

/// key = order_no, value = JSON-serialized SeckillOrder
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// key = (user_id, order_no), value = empty (index)
const USER_ORDERS_TABLE: TableDefinition<(i64, &str), ()> = TableDefinition::new("user_orders");

/// key = (campaign_id, user_id), value = order_no
const CAMPAIGN_BUYERS_TABLE: TableDefinition<(i64, i64), &str> =
    TableDefinition::new("campaign_buyers");

const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

const CAMPAIGN_SEQ: &str = "campaign";
const PRODUCT_SEQ: &str = "product";
const USER_SEQ: &str = "user";
const ORDER_SEQ: &str = "order";

/// Durable store backed by redb
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
    /// Deadline for order write transactions, checked before commit
    txn_timeout: Duration,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("txn_timeout", &self.txn_timeout)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create the database file at `path`
    ///
    /// redb commits with `Durability::Immediate` by default: once `commit()`
    /// returns the order is on disk.
    pub fn open(path: impl AsRef<Path>, txn_timeout: Duration) -> StoreResult<Self> {
        let db = Database::create(path)?;
        Self::init(db, txn_timeout)
    }

    /// Open a database that lives only in memory
    pub fn open_in_memory(txn_timeout: Duration) -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db, txn_timeout)
    }

    fn init(db: Database, txn_timeout: Duration) -> StoreResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CAMPAIGNS_TABLE)?;
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(USERS_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(USER_ORDERS_TABLE)?;
            let _ = write_txn.open_table(CAMPAIGN_BUYERS_TABLE)?;
            let _ = write_txn.open_table(SEQUENCE_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            txn_timeout,
        })
    }

    /// Run a blocking redb call off the async worker threads
    async fn blocking<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| StoreError::Unavailable(format!("store task failed: {e}")))?
    }
}

// ========== Helpers (run inside spawn_blocking) ==========

fn next_id(txn: &WriteTransaction, name: &str) -> StoreResult<i64> {
    let mut table = txn.open_table(SEQUENCE_TABLE)?;
    let current = table.get(name)?.map(|guard| guard.value()).unwrap_or(0);
    let next = current + 1;
    table.insert(name, next)?;
    Ok(next as i64)
}

fn get_json<T: DeserializeOwned>(db: &Database, def: JsonTable, id: i64) -> StoreResult<Option<T>> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(def)?;
    match table.get(id)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

/// Allocate an id, build the record and store it in one transaction
fn insert_json<T, F>(db: &Database, def: JsonTable, seq: &str, build: F) -> StoreResult<T>
where
    T: Serialize,
    F: FnOnce(i64) -> T,
{
    let txn = db.begin_write()?;
    let record = {
        let id = next_id(&txn, seq)?;
        let record = build(id);
        let bytes = serde_json::to_vec(&record)?;
        let mut table = txn.open_table(def)?;
        table.insert(id, bytes.as_slice())?;
        record
    };
    txn.commit()?;
    Ok(record)
}

fn count_rows(db: &Database, def: JsonTable) -> StoreResult<u64> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(def)?;
    Ok(table.len()?)
}

/// Write the order and both indexes; caller owns commit / abort
fn write_order(txn: &WriteTransaction, order: NewOrder) -> StoreResult<SeckillOrder> {
    let mut buyers = txn.open_table(CAMPAIGN_BUYERS_TABLE)?;
    let existing = buyers
        .get((order.seckill_id, order.user_id))?
        .map(|guard| guard.value().to_string());
    if let Some(order_no) = existing {
        return Err(StoreError::DuplicateOrder {
            seckill_id: order.seckill_id,
            user_id: order.user_id,
            order_no,
        });
    }

    let mut orders = txn.open_table(ORDERS_TABLE)?;
    if orders.get(order.order_no.as_str())?.is_some() {
        return Err(StoreError::DuplicateOrderNo(order.order_no));
    }

    let id = next_id(txn, ORDER_SEQ)?;
    let created = order.into_order(id);
    let bytes = serde_json::to_vec(&created)?;
    orders.insert(created.order_no.as_str(), bytes.as_slice())?;
    buyers.insert(
        (created.seckill_id, created.user_id),
        created.order_no.as_str(),
    )?;

    let mut by_user = txn.open_table(USER_ORDERS_TABLE)?;
    by_user.insert((created.user_id, created.order_no.as_str()), ())?;

    Ok(created)
}

fn create_order_blocking(
    db: &Database,
    order: NewOrder,
    deadline: Instant,
) -> StoreResult<SeckillOrder> {
    let txn = db.begin_write()?;
    match write_order(&txn, order) {
        Ok(created) => {
            if Instant::now() >= deadline {
                txn.abort()?;
                return Err(StoreError::Timeout);
            }
            txn.commit()?;
            Ok(created)
        }
        Err(e) => {
            if let Err(abort_err) = txn.abort() {
                tracing::warn!(error = %abort_err, "Failed to abort order transaction");
            }
            Err(e)
        }
    }
}

#[async_trait]
impl CatalogStore for RedbStore {
    async fn find_campaign(&self, id: i64) -> StoreResult<Option<Campaign>> {
        self.blocking(move |db| get_json(db, CAMPAIGNS_TABLE, id))
            .await
    }

    async fn list_campaigns(&self) -> StoreResult<Vec<Campaign>> {
        self.blocking(|db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(CAMPAIGNS_TABLE)?;

            let mut campaigns = Vec::new();
            for result in table.iter()? {
                let (_key, value) = result?;
                let campaign: Campaign = serde_json::from_slice(value.value())?;
                campaigns.push(campaign);
            }
            Ok(campaigns)
        })
        .await
    }

    async fn insert_campaign(&self, create: CampaignCreate) -> StoreResult<Campaign> {
        self.blocking(move |db| {
            insert_json(db, CAMPAIGNS_TABLE, CAMPAIGN_SEQ, |id| Campaign {
                id,
                product_id: create.product_id,
                seckill_price: create.seckill_price,
                stock_count: create.stock_count,
                start_time: create.start_time,
                end_time: create.end_time,
                status: CampaignStatus::Active,
                create_time: Utc::now(),
            })
        })
        .await
    }

    async fn close_campaign(&self, id: i64) -> StoreResult<Option<Campaign>> {
        self.blocking(move |db| {
            let txn = db.begin_write()?;
            let closed = {
                let mut table = txn.open_table(CAMPAIGNS_TABLE)?;
                let existing = table
                    .get(id)?
                    .map(|value| serde_json::from_slice::<Campaign>(value.value()))
                    .transpose()?;

                match existing {
                    Some(mut campaign) if campaign.is_active() => {
                        campaign.status = CampaignStatus::Closed;
                        let bytes = serde_json::to_vec(&campaign)?;
                        table.insert(id, bytes.as_slice())?;
                        Some(campaign)
                    }
                    other => other,
                }
            };
            txn.commit()?;
            Ok(closed)
        })
        .await
    }

    async fn find_product(&self, id: i64) -> StoreResult<Option<Product>> {
        self.blocking(move |db| get_json(db, PRODUCTS_TABLE, id))
            .await
    }

    async fn insert_product(&self, create: ProductCreate) -> StoreResult<Product> {
        self.blocking(move |db| {
            insert_json(db, PRODUCTS_TABLE, PRODUCT_SEQ, |id| Product {
                id,
                product_name: create.product_name,
                product_desc: create.product_desc,
                price: create.price,
                stock_count: create.stock_count,
                status: ProductStatus::OnSale,
                create_time: Utc::now(),
            })
        })
        .await
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        self.blocking(move |db| get_json(db, USERS_TABLE, id)).await
    }

    async fn insert_user(&self, create: UserCreate) -> StoreResult<User> {
        self.blocking(move |db| {
            insert_json(db, USERS_TABLE, USER_SEQ, |id| User {
                id,
                username: create.username,
                password_hash: create.password_hash,
                status: UserStatus::Normal,
                create_time: Utc::now(),
            })
        })
        .await
    }

    async fn count_users(&self) -> StoreResult<u64> {
        self.blocking(|db| count_rows(db, USERS_TABLE)).await
    }

    async fn count_products(&self) -> StoreResult<u64> {
        self.blocking(|db| count_rows(db, PRODUCTS_TABLE)).await
    }
}

#[async_trait]
impl OrderStore for RedbStore {
    async fn create_order(&self, order: NewOrder) -> StoreResult<SeckillOrder> {
        let deadline = Instant::now() + self.txn_timeout;
        self.blocking(move |db| create_order_blocking(db, order, deadline))
            .await
    }

    async fn find_order_by_no(&self, order_no: &str) -> StoreResult<Option<SeckillOrder>> {
        let order_no = order_no.to_string();
        self.blocking(move |db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(ORDERS_TABLE)?;
            match table.get(order_no.as_str())? {
                Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn list_orders_by_user(&self, user_id: i64) -> StoreResult<Vec<SeckillOrder>> {
        self.blocking(move |db| {
            let read_txn = db.begin_read()?;
            let index = read_txn.open_table(USER_ORDERS_TABLE)?;
            let orders_table = read_txn.open_table(ORDERS_TABLE)?;

            let mut orders = Vec::new();
            for result in index.range((user_id, "")..)? {
                let (key, _value) = result?;
                let (owner, order_no) = key.value();
                if owner != user_id {
                    break;
                }
                if let Some(value) = orders_table.get(order_no)? {
                    let order: SeckillOrder = serde_json::from_slice(value.value())?;
                    orders.push(order);
                }
            }

            orders.sort_by(|a, b| b.create_time.cmp(&a.create_time).then(b.id.cmp(&a.id)));
            Ok(orders)
        })
        .await
    }

    async fn count_orders_for_campaign(&self, seckill_id: i64) -> StoreResult<u64> {
        self.blocking(move |db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(CAMPAIGN_BUYERS_TABLE)?;
            let mut count = 0u64;
            for result in table.range((seckill_id, i64::MIN)..=(seckill_id, i64::MAX))? {
                result?;
                count += 1;
            }
            Ok(count)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use rust_decimal::Decimal;

    fn store() -> RedbStore {
        RedbStore::open_in_memory(Duration::from_secs(3)).unwrap()
    }

    fn campaign_create(product_id: i64, stock: u32) -> CampaignCreate {
        let now = Utc::now();
        CampaignCreate {
            product_id,
            seckill_price: Decimal::new(990, 2),
            stock_count: stock,
            start_time: now - ChronoDuration::minutes(1),
            end_time: now + ChronoDuration::hours(1),
        }
    }

    fn new_order(user_id: i64, campaign: &Campaign) -> NewOrder {
        NewOrder::for_campaign(user_id, campaign, Utc::now())
    }

    #[tokio::test]
    async fn test_campaign_lifecycle() {
        let store = store();
        let first = store.insert_campaign(campaign_create(1, 10)).await.unwrap();
        let second = store.insert_campaign(campaign_create(2, 5)).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(first.is_active());

        let found = store.find_campaign(first.id).await.unwrap().unwrap();
        assert_eq!(found, first);

        let all = store.list_campaigns().await.unwrap();
        assert_eq!(all.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 2]);

        let closed = store.close_campaign(first.id).await.unwrap().unwrap();
        assert_eq!(closed.status, CampaignStatus::Closed);
        // Closing again keeps it closed
        let again = store.close_campaign(first.id).await.unwrap().unwrap();
        assert_eq!(again.status, CampaignStatus::Closed);

        assert!(store.close_campaign(99).await.unwrap().is_none());
        assert!(store.find_campaign(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_products_and_users() {
        let store = store();
        assert_eq!(store.count_products().await.unwrap(), 0);
        assert_eq!(store.count_users().await.unwrap(), 0);

        let product = store
            .insert_product(ProductCreate {
                product_name: "iPhone".into(),
                product_desc: String::new(),
                price: Decimal::new(599900, 2),
                stock_count: 100,
            })
            .await
            .unwrap();
        let user = store
            .insert_user(UserCreate {
                username: "alice".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();

        assert_eq!(store.find_product(product.id).await.unwrap(), Some(product));
        assert_eq!(store.find_user(user.id).await.unwrap(), Some(user));
        assert_eq!(store.count_products().await.unwrap(), 1);
        assert_eq!(store.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_and_find_order() {
        let store = store();
        let campaign = store.insert_campaign(campaign_create(1, 10)).await.unwrap();

        let order = store.create_order(new_order(7, &campaign)).await.unwrap();
        assert_eq!(order.id, 1);
        assert_eq!(order.seckill_id, campaign.id);
        assert_eq!(order.seckill_price, campaign.seckill_price);

        let found = store.find_order_by_no(&order.order_no).await.unwrap();
        assert_eq!(found, Some(order.clone()));
        assert!(store.find_order_by_no("missing").await.unwrap().is_none());
        assert_eq!(store.count_orders_for_campaign(campaign.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_campaign_user_rejected() {
        let store = store();
        let campaign = store.insert_campaign(campaign_create(1, 10)).await.unwrap();

        let first = store.create_order(new_order(7, &campaign)).await.unwrap();
        let err = store.create_order(new_order(7, &campaign)).await.unwrap_err();
        match err {
            StoreError::DuplicateOrder {
                seckill_id,
                user_id,
                order_no,
            } => {
                assert_eq!((seckill_id, user_id), (1, 7));
                assert_eq!(order_no, first.order_no);
            }
            other => panic!("expected duplicate order, got {other:?}"),
        }

        // Aborted transaction left nothing behind
        assert_eq!(store.count_orders_for_campaign(campaign.id).await.unwrap(), 1);
        assert_eq!(store.list_orders_by_user(7).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_orders_listed_per_user_newest_first() {
        let store = store();
        let a = store.insert_campaign(campaign_create(1, 10)).await.unwrap();
        let b = store.insert_campaign(campaign_create(2, 10)).await.unwrap();

        let mut older = new_order(7, &a);
        older.create_time = Utc::now() - ChronoDuration::minutes(5);
        let older = store.create_order(older).await.unwrap();
        let newer = store.create_order(new_order(7, &b)).await.unwrap();
        store.create_order(new_order(8, &a)).await.unwrap();

        let orders = store.list_orders_by_user(7).await.unwrap();
        assert_eq!(
            orders.iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![newer.id, older.id]
        );
        assert_eq!(store.list_orders_by_user(8).await.unwrap().len(), 1);
        assert!(store.list_orders_by_user(9).await.unwrap().is_empty());
        assert_eq!(store.count_orders_for_campaign(a.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_expired_transaction_is_aborted() {
        let store = RedbStore::open_in_memory(Duration::ZERO).unwrap();
        let campaign = store.insert_campaign(campaign_create(1, 10)).await.unwrap();

        let err = store.create_order(new_order(7, &campaign)).await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout));
        assert_eq!(store.count_orders_for_campaign(campaign.id).await.unwrap(), 0);
        assert!(store.list_orders_by_user(7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seckill.redb");

        let order_no = {
            let store = RedbStore::open(&path, Duration::from_secs(3)).unwrap();
            let campaign = store.insert_campaign(campaign_create(1, 10)).await.unwrap();
            store.create_order(new_order(3, &campaign)).await.unwrap().order_no
        };

        let store = RedbStore::open(&path, Duration::from_secs(3)).unwrap();
        assert!(store.find_campaign(1).await.unwrap().is_some());
        let order = store.find_order_by_no(&order_no).await.unwrap().unwrap();
        assert_eq!(order.user_id, 3);

        // Sequence continues after reopen
        let next = store.insert_campaign(campaign_create(1, 1)).await.unwrap();
        assert_eq!(next.id, 2);
    }
}

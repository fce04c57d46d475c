//! Demo data, inserted on startup when `SEED_DEMO_DATA=true`
//!
//! Users and products only; campaigns are created through
//! `POST /api/seckill/add` so they get preloaded.

use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use shared::models::{ProductCreate, UserCreate};

use super::{CatalogStore, StoreResult};

/// Plain password shared by every demo account
pub const DEMO_PASSWORD: &str = "123456";

/// SHA-256 hex digest of a password
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn users() -> Vec<UserCreate> {
    (1..=5)
        .map(|n| UserCreate {
            username: format!("user{n}"),
            password_hash: hash_password(DEMO_PASSWORD),
        })
        .collect()
}

fn product(name: &str, desc: &str, cents: i64, stock: u32) -> ProductCreate {
    ProductCreate {
        product_name: name.into(),
        product_desc: desc.into(),
        price: Decimal::new(cents, 2),
        stock_count: stock,
    }
}

fn products() -> Vec<ProductCreate> {
    vec![
        product("iPhone 15", "Apple 智能手机 128GB", 599900, 100),
        product("华为 Mate 60", "华为旗舰手机 256GB", 699900, 100),
        product("小米 14", "小米旗舰手机 256GB", 399900, 200),
        product("AirPods Pro", "Apple 无线降噪耳机", 189900, 300),
    ]
}

/// Insert demo users / products into an empty store
///
/// Returns `false` without writing anything if either table already has rows.
pub async fn seed_demo_data(store: &dyn CatalogStore) -> StoreResult<bool> {
    if store.count_users().await? > 0 || store.count_products().await? > 0 {
        tracing::debug!("Store not empty, skipping demo data");
        return Ok(false);
    }

    let users = users();
    let products = products();
    let (user_count, product_count) = (users.len(), products.len());

    for user in users {
        store.insert_user(user).await?;
    }
    for product in products {
        store.insert_product(product).await?;
    }

    tracing::info!(users = user_count, products = product_count, "Demo data seeded");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::RedbStore;
    use std::time::Duration;

    #[test]
    fn test_hash_password() {
        let hash = hash_password(DEMO_PASSWORD);
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_password("123456"));
        assert_ne!(hash, hash_password("654321"));
    }

    #[tokio::test]
    async fn test_seed_only_once() {
        let store = RedbStore::open_in_memory(Duration::from_secs(3)).unwrap();

        assert!(seed_demo_data(&store).await.unwrap());
        let users = store.count_users().await.unwrap();
        let products = store.count_products().await.unwrap();
        assert_eq!(users, 5);
        assert_eq!(products, 4);

        assert!(!seed_demo_data(&store).await.unwrap());
        assert_eq!(store.count_users().await.unwrap(), users);

        let first = store.find_user(1).await.unwrap().unwrap();
        assert_eq!(first.username, "user1");
        assert_eq!(first.password_hash, hash_password(DEMO_PASSWORD));
    }
}

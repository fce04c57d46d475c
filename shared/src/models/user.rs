//! User Model
//!
//! Two shapes: [`User`] is the persisted record (carries the password hash),
//! [`UserProfile`] is the public projection. Only the projection may be
//! written to the cache or returned by the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Normal,
    Disabled,
}

/// Persisted user record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub status: UserStatus,
    pub create_time: DateTime<Utc>,
}

/// Public-safe user projection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub status: UserStatus,
    pub create_time: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            status: user.status,
            create_time: user.create_time,
        }
    }
}

/// Create user payload (password already hashed by the caller)
#[derive(Debug, Clone)]
pub struct UserCreate {
    pub username: String,
    pub password_hash: String,
}

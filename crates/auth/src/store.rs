use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A stored account. `hashed_password` is a PHC string, never plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub hashed_password: String,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
}

/// The values needed to create an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub hashed_password: String,
    pub disabled: bool,
}

/// Persistence contract for accounts. Usernames and emails are unique; an
/// insert that would break either fails with `StoreError::Conflict` and
/// leaves the store unchanged.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn lookup_user(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, StoreError>;

    async fn count_users(&self) -> Result<u64, StoreError>;
}

use crate::error::StoreError;
use crate::store::{NewUser, UserRecord, UserStore};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Accounts {
    by_username: HashMap<String, UserRecord>,
    next_id: i64,
}

/// A process-lifetime `UserStore`. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    accounts: RwLock<Accounts>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn lookup_user(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.by_username.get(username).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let mut accounts = self.accounts.write().await;

        if accounts.by_username.contains_key(&user.username) {
            return Err(StoreError::Conflict(format!("username '{}'", user.username)));
        }
        if let Some(email) = &user.email {
            let taken = accounts
                .by_username
                .values()
                .any(|u| u.email.as_deref() == Some(email.as_str()));
            if taken {
                return Err(StoreError::Conflict(format!("email '{email}'")));
            }
        }

        accounts.next_id += 1;
        let record = UserRecord {
            id: accounts.next_id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            hashed_password: user.hashed_password,
            disabled: user.disabled,
            created_at: Utc::now(),
        };
        accounts
            .by_username
            .insert(record.username.clone(), record.clone());
        Ok(record)
    }

    async fn count_users(&self) -> Result<u64, StoreError> {
        Ok(self.accounts.read().await.by_username.len() as u64)
    }
}

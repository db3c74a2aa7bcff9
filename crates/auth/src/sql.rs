use crate::error::StoreError;
use crate::store::{NewUser, UserRecord, UserStore};
use async_trait::async_trait;
use database::{DbUser, NewDbUser, UserRepository};

/// A `UserStore` persisted in the SQL `users` table.
#[derive(Debug, Clone)]
pub struct SqlUserStore {
    repo: UserRepository,
}

impl SqlUserStore {
    pub fn new(repo: UserRepository) -> Self {
        Self { repo }
    }
}

impl From<DbUser> for UserRecord {
    fn from(row: DbUser) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            full_name: row.full_name,
            hashed_password: row.hashed_password,
            disabled: row.disabled,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl UserStore for SqlUserStore {
    async fn lookup_user(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.repo.find_by_username(username).await?.map(UserRecord::from))
    }

    async fn insert_user(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let row = self
            .repo
            .insert(NewDbUser {
                username: &user.username,
                email: user.email.as_deref(),
                full_name: user.full_name.as_deref(),
                hashed_password: &user.hashed_password,
                disabled: user.disabled,
            })
            .await?;
        Ok(row.into())
    }

    async fn count_users(&self) -> Result<u64, StoreError> {
        let count = self.repo.count().await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

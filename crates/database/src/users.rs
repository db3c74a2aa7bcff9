use crate::DbError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

/// A row of the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DbUser {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values for a new `users` row. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewDbUser<'a> {
    pub username: &'a str,
    pub email: Option<&'a str>,
    pub full_name: Option<&'a str>,
    pub hashed_password: &'a str,
    pub disabled: bool,
}

/// Data access for the `users` table. Every call is its own short
/// transaction on a pooled connection.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<DbUser>, DbError> {
        let user = sqlx::query_as::<_, DbUser>(
            r#"
            SELECT id, username, email, full_name, hashed_password, disabled, created_at, updated_at
            FROM users
            WHERE username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Inserts a user and returns the stored row.
    ///
    /// A duplicate username or email rolls the transaction back and surfaces
    /// as `DbError::UniqueViolation`.
    pub async fn insert(&self, user: NewDbUser<'_>) -> Result<DbUser, DbError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, DbUser>(
            r#"
            INSERT INTO users (username, email, full_name, hashed_password, disabled, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING id, username, email, full_name, hashed_password, disabled, created_at, updated_at
            "#,
        )
        .bind(user.username)
        .bind(user.email)
        .bind(user.full_name)
        .bind(user.hashed_password)
        .bind(user.disabled)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await;

        match inserted {
            Ok(row) => {
                tx.commit().await?;
                Ok(row)
            }
            Err(err) => {
                tx.rollback().await?;
                Err(DbError::from_write(err))
            }
        }
    }

    pub async fn count(&self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{connect, run_migrations};
    use configuration::DatabaseSettings;

    async fn repo() -> UserRepository {
        let settings = DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            max_connections: 5,
        };
        let pool = connect(&settings).await.unwrap();
        run_migrations(&pool).await.unwrap();
        UserRepository::new(pool)
    }

    fn new_user<'a>(username: &'a str, email: Option<&'a str>) -> NewDbUser<'a> {
        NewDbUser {
            username,
            email,
            full_name: None,
            hashed_password: "$argon2id$stub",
            disabled: false,
        }
    }

    #[tokio::test]
    async fn insert_then_find() {
        let repo = repo().await;
        let stored = repo.insert(new_user("alice", Some("alice@example.com"))).await.unwrap();
        assert_eq!(stored.username, "alice");
        assert!(!stored.disabled);

        let found = repo.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.id, stored.id);
        assert_eq!(found.email.as_deref(), Some("alice@example.com"));
        assert!(repo.find_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_is_a_unique_violation() {
        let repo = repo().await;
        repo.insert(new_user("alice", None)).await.unwrap();
        let err = repo.insert(new_user("alice", None)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation(_)));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_unique_violation() {
        let repo = repo().await;
        repo.insert(new_user("alice", Some("shared@example.com"))).await.unwrap();
        let err = repo
            .insert(new_user("bob", Some("shared@example.com")))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn missing_emails_do_not_collide() {
        let repo = repo().await;
        repo.insert(new_user("alice", None)).await.unwrap();
        repo.insert(new_user("bob", None)).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 2);
    }
}

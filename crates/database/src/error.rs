use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid database configuration: {0}")]
    ConnectionConfigError(String),

    #[error("Database operation failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    /// A `UNIQUE` constraint rejected the write. Carries the database message.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),
}

impl DbError {
    /// Routes unique-constraint failures to `UniqueViolation`.
    pub(crate) fn from_write(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DbError::UniqueViolation(db.message().to_string())
            }
            other => DbError::Sqlx(other),
        }
    }
}

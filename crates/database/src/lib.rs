//! # Trade Journal Database Crate
//!
//! Persistence for dashboard accounts, backed by SQLite through `sqlx`.
//!
//! ## Public API
//!
//! - `connect`: opens the connection pool described by `DatabaseSettings`.
//! - `run_migrations`: applies the embedded schema migrations.
//! - `UserRepository`: queries and inserts on the `users` table.
//! - `DbError`: the errors returned from this crate.

pub mod connection;
pub mod error;
pub mod users;

pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use users::{DbUser, NewDbUser, UserRepository};

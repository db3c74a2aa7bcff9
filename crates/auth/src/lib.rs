//! # Trade Journal Auth
//!
//! Account registration and login. `AuthService` holds the rules (validation,
//! uniqueness, hashing, disabled accounts) and delegates persistence to a
//! `UserStore`: `InMemoryUserStore` for throwaway sessions and tests,
//! `SqlUserStore` for the SQLite `users` table.

pub mod error;
pub mod memory;
pub mod password;
pub mod service;
pub mod sql;
pub mod store;

pub use error::{AuthError, RegistrationError, StoreError};
pub use memory::InMemoryUserStore;
pub use password::{hash_password, verify_password};
pub use service::{AuthService, AuthenticatedUser, UserCreated};
pub use sql::SqlUserStore;
pub use store::{NewUser, UserRecord, UserStore};

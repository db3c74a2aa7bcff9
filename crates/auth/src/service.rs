use crate::error::{AuthError, RegistrationError, StoreError};
use crate::password::{hash_password, verify_password};
use crate::store::{NewUser, UserStore};
use configuration::SeedUser;
use serde::Serialize;
use std::sync::Arc;

/// The public view of a successfully authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub username: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub disabled: bool,
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCreated {
    pub username: String,
    pub message: String,
}

/// Login and registration on top of any `UserStore`.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

async fn hash_off_thread(password: &str) -> Result<String, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Returns the user when the credentials are valid.
    ///
    /// An unknown user, a disabled user and a wrong password all yield
    /// `Ok(None)`. Only a store failure is an `Err`.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<AuthenticatedUser>, AuthError> {
        tracing::info!(username, "Attempting to authenticate user.");

        let Some(user) = self.store.lookup_user(username).await? else {
            tracing::warn!(username, "Authentication failed: user not found.");
            return Ok(None);
        };
        if user.disabled {
            tracing::warn!(username, "Authentication failed: user is disabled.");
            return Ok(None);
        }

        let stored = user.hashed_password.clone();
        let candidate = password.to_string();
        let verified = tokio::task::spawn_blocking(move || verify_password(&candidate, &stored))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        if !verified {
            tracing::warn!(username, "Authentication failed: invalid password.");
            return Ok(None);
        }

        tracing::info!(username, "User authenticated successfully.");
        Ok(Some(AuthenticatedUser {
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            disabled: user.disabled,
        }))
    }

    /// Registers a new account with a salted hash of `password`.
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
        full_name: Option<&str>,
    ) -> Result<UserCreated, RegistrationError> {
        let username = username.trim();
        tracing::info!(username, "Creating user.");

        if username.is_empty() || password.is_empty() {
            let msg = "Username and password are required.";
            tracing::warn!(username, "User creation failed: {msg}");
            return Err(RegistrationError::Validation(msg.to_string()));
        }

        match self.store.lookup_user(username).await {
            Ok(Some(_)) => {
                let msg = format!("Username '{username}' already exists.");
                tracing::warn!(username, "User creation failed: {msg}");
                return Err(RegistrationError::Conflict(msg));
            }
            Ok(None) => {}
            Err(e) => return Err(infrastructure(username, &e.to_string())),
        }

        let hashed_password = hash_off_thread(password)
            .await
            .map_err(|e| infrastructure(username, &e.to_string()))?;

        let inserted = self
            .store
            .insert_user(NewUser {
                username: username.to_string(),
                email: non_blank(email),
                full_name: non_blank(full_name),
                hashed_password,
                disabled: false,
            })
            .await;

        match inserted {
            Ok(user) => {
                tracing::info!(username = %user.username, id = user.id, "User created.");
                Ok(UserCreated {
                    message: format!("User '{}' created successfully.", user.username),
                    username: user.username,
                })
            }
            Err(StoreError::Conflict(detail)) => {
                tracing::error!(username, %detail, "Integrity error creating user.");
                Err(RegistrationError::Conflict(format!(
                    "Could not create user '{username}'. Username or email might already exist."
                )))
            }
            Err(StoreError::Backend(detail)) => Err(infrastructure(username, &detail)),
        }
    }

    /// Provisions `users` into an empty store and returns how many were
    /// created. A store that already holds accounts is left untouched.
    pub async fn seed_defaults(&self, users: &[SeedUser]) -> Result<usize, AuthError> {
        let existing = self.store.count_users().await?;
        if existing > 0 {
            tracing::debug!(existing, "User store already populated; skipping seeding.");
            return Ok(0);
        }

        let mut created = 0;
        for seed in users {
            match self
                .create_user(
                    &seed.username,
                    &seed.password,
                    seed.email.as_deref(),
                    seed.full_name.as_deref(),
                )
                .await
            {
                Ok(_) => created += 1,
                Err(e) => tracing::warn!(username = %seed.username, error = %e, "Skipping seed user."),
            }
        }
        tracing::info!(created, "Seeded default users.");
        Ok(created)
    }

    pub async fn user_count(&self) -> Result<u64, AuthError> {
        Ok(self.store.count_users().await?)
    }
}

fn infrastructure(username: &str, detail: &str) -> RegistrationError {
    tracing::error!(username, detail, "Store error creating user.");
    RegistrationError::Infrastructure(format!(
        "A database error occurred while creating user '{username}'."
    ))
}

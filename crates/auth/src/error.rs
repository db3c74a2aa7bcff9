use thiserror::Error;

/// Failures reported by a `UserStore`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The username or email is already taken.
    #[error("User already exists: {0}")]
    Conflict(String),

    #[error("User store failure: {0}")]
    Backend(String),
}

impl From<database::DbError> for StoreError {
    fn from(err: database::DbError) -> Self {
        match err {
            database::DbError::UniqueViolation(msg) => StoreError::Conflict(msg),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Infrastructure failures of the authentication service. A wrong password
/// is not an error; it is an absent user.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// Why a registration was refused. The payload is the message shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Infrastructure(String),
}

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Column mapping error: {0}")]
    Mapping(String),

    #[error("Value out of range: {0}")]
    Overflow(String),
}

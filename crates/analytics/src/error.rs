use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("Not enough data to perform calculation: {0}")]
    NotEnoughData(String),

    #[error("Invalid input for analysis: {0}")]
    InvalidInput(String),

    #[error("Error in calculation: {0}")]
    Calculation(String),
}

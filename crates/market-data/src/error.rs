use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("The HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("The chart API returned an error: {code}: {description}")]
    Api { code: String, description: String },

    #[error("Failed to deserialize the chart response: {0}")]
    Deserialization(String),

    #[error("Invalid data format from the chart API: {0}")]
    InvalidData(String),
}

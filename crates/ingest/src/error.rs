use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("The file has no header row.")]
    NoHeaders,

    #[error("Invalid column mapping: {0}")]
    Mapping(#[from] CoreError),

    #[error("None of the {rows} rows had a usable date and PnL value.")]
    NoValidRows { rows: usize },

    #[error("PnL values are too large to total: {0}")]
    Overflow(CoreError),
}

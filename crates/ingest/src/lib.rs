//! # Trade Journal Ingest
//!
//! Turns an uploaded CSV journal into a normalized `TradeTable`: header
//! peeking, mapping suggestions, row parsing and sidebar filtering.
//!
//! ## Public API
//!
//! - `DataService`: the contract the session pipeline talks to.
//! - `CsvDataService`: the CSV implementation.
//! - `suggest_mapping`: proposes a `ColumnMapping` from header synonyms.
//! - `TradeFilters`: the row filters applied after processing.

pub mod error;
pub mod filter;
pub mod headers;
pub mod parse;
pub mod process;
pub mod service;

pub use error::IngestError;
pub use filter::{TradeFilters, apply_filters};
pub use headers::{default_synonyms, read_headers, suggest_mapping};
pub use process::process_trades;
pub use service::{CsvDataService, DataService};

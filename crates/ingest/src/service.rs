use crate::error::IngestError;
use crate::filter::{TradeFilters, apply_filters};
use crate::headers::read_headers;
use crate::process::process_trades;
use core_types::{ColumnMapping, TradeTable};

/// The data contract consumed by the session pipeline.
pub trait DataService {
    /// Header row of an uploaded file.
    fn read_headers(&self, bytes: &[u8]) -> Result<Vec<String>, IngestError>;

    fn processed_trading_data(
        &self,
        bytes: &[u8],
        mapping: &ColumnMapping,
        file_name: &str,
    ) -> Result<TradeTable, IngestError>;

    fn filter_data(&self, table: &TradeTable, filters: &TradeFilters) -> Result<TradeTable, IngestError>;
}

/// CSV-backed implementation of `DataService`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvDataService;

impl CsvDataService {
    pub fn new() -> Self {
        Self
    }
}

impl DataService for CsvDataService {
    fn read_headers(&self, bytes: &[u8]) -> Result<Vec<String>, IngestError> {
        read_headers(bytes)
    }

    fn processed_trading_data(
        &self,
        bytes: &[u8],
        mapping: &ColumnMapping,
        file_name: &str,
    ) -> Result<TradeTable, IngestError> {
        process_trades(bytes, mapping, file_name)
    }

    fn filter_data(&self, table: &TradeTable, filters: &TradeFilters) -> Result<TradeTable, IngestError> {
        apply_filters(table, filters)
    }
}

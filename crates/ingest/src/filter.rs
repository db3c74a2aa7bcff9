use crate::error::IngestError;
use chrono::NaiveDate;
use core_types::{TradeSide, TradeTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Row filters chosen in the sidebar. Empty sets and `None` mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeFilters {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub symbols: BTreeSet<String>,
    pub strategies: BTreeSet<String>,
    pub side: Option<TradeSide>,
}

impl TradeFilters {
    pub fn is_empty(&self) -> bool {
        *self == TradeFilters::default()
    }
}

fn contains_ignore_case(set: &BTreeSet<String>, value: Option<&str>) -> bool {
    match value {
        Some(v) => set.iter().any(|s| s.eq_ignore_ascii_case(v)),
        None => false,
    }
}

/// Returns the rows of `table` that pass every active filter, with the
/// cumulative PnL recomputed over the kept rows.
pub fn apply_filters(table: &TradeTable, filters: &TradeFilters) -> Result<TradeTable, IngestError> {
    let rows = table
        .rows()
        .iter()
        .filter(|r| filters.start_date.is_none_or(|start| r.date.date() >= start))
        .filter(|r| filters.end_date.is_none_or(|end| r.date.date() <= end))
        .filter(|r| filters.symbols.is_empty() || contains_ignore_case(&filters.symbols, r.symbol.as_deref()))
        .filter(|r| {
            filters.strategies.is_empty() || contains_ignore_case(&filters.strategies, r.strategy.as_deref())
        })
        .filter(|r| filters.side.is_none() || r.side == filters.side)
        .cloned()
        .collect();

    TradeTable::from_records(rows, table.columns().to_vec()).map_err(IngestError::Overflow)
}

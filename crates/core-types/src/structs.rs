use crate::enums::{ConceptualColumn, TradeSide};
use crate::error::CoreError;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A file handed over by the uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn identity(&self) -> FileIdentity {
        FileIdentity {
            name: self.name.clone(),
            size: self.bytes.len() as u64,
            content_type: self.content_type.clone(),
        }
    }
}

/// Name, size and type of an upload. Two uploads with the same identity are
/// treated as the same file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileIdentity {
    pub name: String,
    pub size: u64,
    pub content_type: String,
}

/// The user's assignment of CSV headers to conceptual columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    columns: BTreeMap<ConceptualColumn, String>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: ConceptualColumn, header: impl Into<String>) -> Self {
        self.insert(column, header);
        self
    }

    pub fn insert(&mut self, column: ConceptualColumn, header: impl Into<String>) {
        self.columns.insert(column, header.into());
    }

    pub fn header_for(&self, column: ConceptualColumn) -> Option<&str> {
        self.columns.get(&column).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConceptualColumn, &str)> {
        self.columns.iter().map(|(c, h)| (*c, h.as_str()))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Checks that every critical column is mapped and that every mapped
    /// header exists in the file.
    pub fn validate(&self, headers: &[String]) -> Result<(), CoreError> {
        let missing: Vec<&str> = ConceptualColumn::CRITICAL
            .iter()
            .filter(|c| !self.columns.contains_key(c))
            .map(|c| c.label())
            .collect();
        if !missing.is_empty() {
            return Err(CoreError::Mapping(format!(
                "critical columns are not mapped: {}",
                missing.join(", ")
            )));
        }

        for (column, header) in &self.columns {
            if !headers.iter().any(|h| h == header) {
                return Err(CoreError::Mapping(format!(
                    "'{header}' (mapped to {column}) is not a column of the uploaded file"
                )));
            }
        }
        Ok(())
    }
}

/// A single normalized trade after column mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub date: NaiveDateTime,
    pub pnl: Decimal,
    pub symbol: Option<String>,
    pub strategy: Option<String>,
    pub side: Option<TradeSide>,
    pub quantity: Option<Decimal>,
    pub entry_price: Option<Decimal>,
    pub exit_price: Option<Decimal>,
    pub fees: Option<Decimal>,
    pub notes: Option<String>,
    /// Running sum of `pnl` in date order. Engineered, never read from the CSV.
    pub cumulative_pnl: Decimal,
}

impl TradeRecord {
    pub fn new(date: NaiveDateTime, pnl: Decimal) -> Self {
        Self {
            date,
            pnl,
            symbol: None,
            strategy: None,
            side: None,
            quantity: None,
            entry_price: None,
            exit_price: None,
            fees: None,
            notes: None,
            cumulative_pnl: Decimal::ZERO,
        }
    }
}

/// Rows x columns of a table. Used as a coarse change indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableShape {
    pub rows: usize,
    pub columns: usize,
}

/// The normalized trade table produced by processing and filtering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeTable {
    rows: Vec<TradeRecord>,
    columns: Vec<ConceptualColumn>,
}

impl TradeTable {
    /// Builds a table ordered by date with `cumulative_pnl` recomputed.
    ///
    /// Fails when the running total leaves the `Decimal` range.
    pub fn from_records(
        mut rows: Vec<TradeRecord>,
        mut columns: Vec<ConceptualColumn>,
    ) -> Result<Self, CoreError> {
        rows.sort_by(|a, b| a.date.cmp(&b.date));
        let mut running = Decimal::ZERO;
        for row in &mut rows {
            running = running
                .checked_add(row.pnl)
                .ok_or_else(|| CoreError::Overflow(format!("cumulative PnL at {}", row.date)))?;
            row.cumulative_pnl = running;
        }
        columns.sort();
        columns.dedup();
        Ok(Self { rows, columns })
    }

    pub fn rows(&self) -> &[TradeRecord] {
        &self.rows
    }

    /// Conceptual columns present in the table.
    pub fn columns(&self) -> &[ConceptualColumn] {
        &self.columns
    }

    pub fn has_column(&self, column: ConceptualColumn) -> bool {
        self.columns.contains(&column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The cumulative-PnL column counts as one extra engineered column.
    pub fn shape(&self) -> TableShape {
        TableShape {
            rows: self.rows.len(),
            columns: self.columns.len() + 1,
        }
    }

    pub fn pnl_values(&self) -> Vec<Decimal> {
        self.rows.iter().map(|r| r.pnl).collect()
    }

    /// Cumulative PnL indexed by trade time, in date order.
    pub fn equity_series(&self) -> Vec<(NaiveDateTime, Decimal)> {
        self.rows.iter().map(|r| (r.date, r.cumulative_pnl)).collect()
    }

    /// Earliest and latest trade date, if the table has rows.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.rows.first()?.date.date();
        let last = self.rows.last()?.date.date();
        Some((first, last))
    }
}

/// Daily simple returns of a benchmark, keyed by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    pub ticker: String,
    points: BTreeMap<NaiveDate, Decimal>,
}

impl ReturnSeries {
    pub fn new(ticker: impl Into<String>, points: BTreeMap<NaiveDate, Decimal>) -> Self {
        Self {
            ticker: ticker.into(),
            points,
        }
    }

    /// Converts a date-ordered series of closing prices into daily returns.
    /// The first close only anchors the series and produces no return.
    pub fn from_closes(ticker: impl Into<String>, closes: &[(NaiveDate, Decimal)]) -> Self {
        let points = closes
            .windows(2)
            .filter(|w| !w[0].1.is_zero())
            .map(|w| (w[1].0, (w[1].1 - w[0].1) / w[0].1))
            .collect();
        Self::new(ticker, points)
    }

    pub fn points(&self) -> &BTreeMap<NaiveDate, Decimal> {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Compounded return over the whole series, as a fraction.
    pub fn total_return(&self) -> Decimal {
        self.points
            .values()
            .fold(Decimal::ONE, |acc, r| acc * (Decimal::ONE + r))
            - Decimal::ONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn table_sorts_rows_and_accumulates_pnl() {
        let table = TradeTable::from_records(
            vec![
                TradeRecord::new(at(3), dec!(-20)),
                TradeRecord::new(at(1), dec!(50)),
                TradeRecord::new(at(2), dec!(10)),
            ],
            vec![ConceptualColumn::Pnl, ConceptualColumn::Date],
        )
        .unwrap();

        let cumulative: Vec<Decimal> = table.rows().iter().map(|r| r.cumulative_pnl).collect();
        assert_eq!(cumulative, vec![dec!(50), dec!(60), dec!(40)]);
        assert_eq!(table.shape(), TableShape { rows: 3, columns: 3 });
        assert_eq!(table.date_range(), Some((at(1).date(), at(3).date())));
    }

    #[test]
    fn cumulative_pnl_overflow_is_an_error() {
        let huge = Decimal::MAX - Decimal::ONE;
        let result = TradeTable::from_records(
            vec![TradeRecord::new(at(1), huge), TradeRecord::new(at(2), huge)],
            vec![ConceptualColumn::Date, ConceptualColumn::Pnl],
        );
        assert!(matches!(result, Err(CoreError::Overflow(_))));
    }

    #[test]
    fn mapping_requires_critical_columns_present_in_headers() {
        let headers = vec!["TradeDate".to_string(), "Profit".to_string()];

        let incomplete = ColumnMapping::new().with(ConceptualColumn::Date, "TradeDate");
        assert!(incomplete.validate(&headers).is_err());

        let wrong_header = ColumnMapping::new()
            .with(ConceptualColumn::Date, "TradeDate")
            .with(ConceptualColumn::Pnl, "PnL");
        assert!(wrong_header.validate(&headers).is_err());

        let ok = ColumnMapping::new()
            .with(ConceptualColumn::Date, "TradeDate")
            .with(ConceptualColumn::Pnl, "Profit");
        assert!(ok.validate(&headers).is_ok());
    }

    #[test]
    fn closes_become_simple_returns() {
        let d = |n| NaiveDate::from_ymd_opt(2024, 1, n).unwrap();
        let series = ReturnSeries::from_closes("SPY", &[(d(1), dec!(100)), (d(2), dec!(110)), (d(3), dec!(99))]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[&d(2)], dec!(0.1));
        assert_eq!(series.points()[&d(3)], dec!(-0.1));
    }
}

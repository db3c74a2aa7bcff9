use crate::error::IngestError;
use crate::headers::reader;
use crate::parse::{parse_datetime, parse_decimal, parse_text};
use core_types::{ColumnMapping, ConceptualColumn, TradeRecord, TradeTable, TradeSide};
use std::collections::BTreeMap;

/// Logged individually before falling back to a summary count.
const MAX_LOGGED_ROW_ERRORS: usize = 10;

/// Parses an uploaded journal into a normalized `TradeTable`.
///
/// Rows without a parseable date or PnL are dropped; unparseable optional
/// cells become `None`. A file with a header but no data rows produces an
/// empty table. A file whose every row is dropped is an error.
pub fn process_trades(
    bytes: &[u8],
    mapping: &ColumnMapping,
    file_name: &str,
) -> Result<TradeTable, IngestError> {
    let mut rdr = reader(bytes);
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    mapping.validate(&headers)?;

    let positions: BTreeMap<ConceptualColumn, usize> = mapping
        .iter()
        .filter_map(|(column, header)| headers.iter().position(|h| h == header).map(|i| (column, i)))
        .collect();

    let mut rows = Vec::new();
    let mut seen = 0usize;
    let mut skipped = 0usize;

    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        seen += 1;
        let cell = |column: ConceptualColumn| positions.get(&column).and_then(|i| record.get(*i));

        let date = cell(ConceptualColumn::Date).and_then(parse_datetime);
        let pnl = cell(ConceptualColumn::Pnl).and_then(parse_decimal);
        let (Some(date), Some(pnl)) = (date, pnl) else {
            skipped += 1;
            if skipped <= MAX_LOGGED_ROW_ERRORS {
                tracing::warn!(file = file_name, row = line + 2, "Dropping row without a usable date or PnL.");
            }
            continue;
        };

        let mut trade = TradeRecord::new(date, pnl);
        trade.symbol = cell(ConceptualColumn::Symbol).and_then(parse_text);
        trade.strategy = cell(ConceptualColumn::Strategy).and_then(parse_text);
        trade.side = cell(ConceptualColumn::Side).and_then(|v| v.parse::<TradeSide>().ok());
        trade.quantity = cell(ConceptualColumn::Quantity).and_then(parse_decimal);
        trade.entry_price = cell(ConceptualColumn::EntryPrice).and_then(parse_decimal);
        trade.exit_price = cell(ConceptualColumn::ExitPrice).and_then(parse_decimal);
        trade.fees = cell(ConceptualColumn::Fees).and_then(parse_decimal);
        trade.notes = cell(ConceptualColumn::Notes).and_then(parse_text);
        rows.push(trade);
    }

    if skipped > 0 {
        tracing::warn!(file = file_name, skipped, total = seen, "Rows dropped during processing.");
    }
    if seen > 0 && rows.is_empty() {
        return Err(IngestError::NoValidRows { rows: seen });
    }

    let kept = rows.len();
    let table = TradeTable::from_records(rows, positions.into_keys().collect())
        .map_err(IngestError::Overflow)?;
    tracing::info!(file = file_name, rows = kept, "Processed trade journal.");
    Ok(table)
}

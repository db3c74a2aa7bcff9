use crate::error::IngestError;
use core_types::{ColumnMapping, ConceptualColumn};
use std::collections::{BTreeMap, HashSet};

/// Rows read past the header to make sure the body parses at all.
const PEEK_ROWS: usize = 5;

pub(crate) fn reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(bytes)
}

/// Reads the header row and peeks at the first few records.
///
/// Fails when the file is not valid CSV or has no non-empty header.
pub fn read_headers(bytes: &[u8]) -> Result<Vec<String>, IngestError> {
    let mut rdr = reader(bytes);
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(IngestError::NoHeaders);
    }

    for record in rdr.records().take(PEEK_ROWS) {
        record?;
    }
    Ok(headers)
}

fn normalize(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Proposes a mapping by matching headers against each column's synonyms.
///
/// Matching ignores case and punctuation. Columns are assigned in
/// `ConceptualColumn::ALL` order, so critical columns claim headers first,
/// and a header is never assigned twice.
pub fn suggest_mapping(
    headers: &[String],
    synonyms: &BTreeMap<ConceptualColumn, Vec<String>>,
) -> ColumnMapping {
    let normalized: Vec<String> = headers.iter().map(|h| normalize(h)).collect();
    let mut taken: HashSet<usize> = HashSet::new();
    let mut mapping = ColumnMapping::new();

    for column in ConceptualColumn::ALL {
        let Some(candidates) = synonyms.get(&column) else {
            continue;
        };
        let found = candidates.iter().map(|s| normalize(s)).find_map(|candidate| {
            normalized
                .iter()
                .enumerate()
                .find(|(i, h)| !taken.contains(i) && **h == candidate)
                .map(|(i, _)| i)
        });
        if let Some(index) = found {
            taken.insert(index);
            mapping.insert(column, headers[index].clone());
        }
    }

    mapping
}

/// The built-in synonym table, for callers without configured overrides.
pub fn default_synonyms() -> BTreeMap<ConceptualColumn, Vec<String>> {
    ConceptualColumn::ALL
        .into_iter()
        .map(|c| (c, c.default_synonyms().iter().map(|s| s.to_string()).collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_headers_and_strips_bom() {
        let csv = b"\xEF\xBB\xBFTradeDate, Profit \n2024-01-02,10\n";
        assert_eq!(read_headers(csv).unwrap(), vec!["TradeDate", "Profit"]);
    }

    #[test]
    fn rejects_files_without_headers() {
        assert!(matches!(read_headers(b""), Err(IngestError::NoHeaders)));
    }

    #[test]
    fn rejects_invalid_utf8_body() {
        let csv = b"Date,PnL\n2024-01-02,\xff\xfe\n";
        assert!(read_headers(csv).is_err());
    }

    #[test]
    fn suggests_mapping_from_synonyms() {
        let headers: Vec<String> = ["Trade Date", "Net P&L", "Ticker", "Qty", "Comment"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mapping = suggest_mapping(&headers, &default_synonyms());

        assert_eq!(mapping.header_for(ConceptualColumn::Date), Some("Trade Date"));
        assert_eq!(mapping.header_for(ConceptualColumn::Pnl), Some("Net P&L"));
        assert_eq!(mapping.header_for(ConceptualColumn::Symbol), Some("Ticker"));
        assert_eq!(mapping.header_for(ConceptualColumn::Quantity), Some("Qty"));
        assert_eq!(mapping.header_for(ConceptualColumn::Notes), Some("Comment"));
        assert_eq!(mapping.header_for(ConceptualColumn::Strategy), None);
    }

    #[test]
    fn a_header_is_claimed_once() {
        let headers = vec!["Time".to_string()];
        let mut synonyms = BTreeMap::new();
        synonyms.insert(ConceptualColumn::Date, vec!["time".to_string()]);
        synonyms.insert(ConceptualColumn::Notes, vec!["time".to_string()]);

        let mapping = suggest_mapping(&headers, &synonyms);
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.header_for(ConceptualColumn::Date), Some("Time"));
    }
}

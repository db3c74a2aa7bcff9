use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The direction of a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TradeSide {
    Long,
    Short,
}

impl FromStr for TradeSide {
    type Err = CoreError;

    /// Accepts the spellings trading platforms commonly export.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long" | "buy" | "b" | "l" => Ok(TradeSide::Long),
            "short" | "sell" | "s" | "sh" => Ok(TradeSide::Short),
            other => Err(CoreError::InvalidInput("side".to_string(), other.to_string())),
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Long => write!(f, "long"),
            TradeSide::Short => write!(f, "short"),
        }
    }
}

/// An abstract field that arbitrary CSV headers are mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConceptualColumn {
    Date,
    Pnl,
    Symbol,
    Strategy,
    Side,
    Quantity,
    EntryPrice,
    ExitPrice,
    Fees,
    Notes,
}

impl ConceptualColumn {
    pub const ALL: [ConceptualColumn; 10] = [
        ConceptualColumn::Date,
        ConceptualColumn::Pnl,
        ConceptualColumn::Symbol,
        ConceptualColumn::Strategy,
        ConceptualColumn::Side,
        ConceptualColumn::Quantity,
        ConceptualColumn::EntryPrice,
        ConceptualColumn::ExitPrice,
        ConceptualColumn::Fees,
        ConceptualColumn::Notes,
    ];

    /// Columns that must be mapped before a file can be processed.
    pub const CRITICAL: [ConceptualColumn; 2] = [ConceptualColumn::Date, ConceptualColumn::Pnl];

    pub fn key(&self) -> &'static str {
        match self {
            ConceptualColumn::Date => "date",
            ConceptualColumn::Pnl => "pnl",
            ConceptualColumn::Symbol => "symbol",
            ConceptualColumn::Strategy => "strategy",
            ConceptualColumn::Side => "side",
            ConceptualColumn::Quantity => "quantity",
            ConceptualColumn::EntryPrice => "entry_price",
            ConceptualColumn::ExitPrice => "exit_price",
            ConceptualColumn::Fees => "fees",
            ConceptualColumn::Notes => "notes",
        }
    }

    /// Human-readable label for prompts and tables.
    pub fn label(&self) -> &'static str {
        match self {
            ConceptualColumn::Date => "Trade Date/Time",
            ConceptualColumn::Pnl => "Profit/Loss",
            ConceptualColumn::Symbol => "Symbol",
            ConceptualColumn::Strategy => "Strategy",
            ConceptualColumn::Side => "Direction",
            ConceptualColumn::Quantity => "Quantity",
            ConceptualColumn::EntryPrice => "Entry Price",
            ConceptualColumn::ExitPrice => "Exit Price",
            ConceptualColumn::Fees => "Fees/Commission",
            ConceptualColumn::Notes => "Notes",
        }
    }

    pub fn is_critical(&self) -> bool {
        Self::CRITICAL.contains(self)
    }

    /// Header spellings that suggest this column when no configured synonyms exist.
    pub fn default_synonyms(&self) -> &'static [&'static str] {
        match self {
            ConceptualColumn::Date => &["date", "trade date", "datetime", "time", "close time", "exit time", "timestamp"],
            ConceptualColumn::Pnl => &["pnl", "p&l", "profit", "profit/loss", "net pnl", "net p&l", "realized pnl", "net profit", "gain"],
            ConceptualColumn::Symbol => &["symbol", "ticker", "instrument", "market", "asset"],
            ConceptualColumn::Strategy => &["strategy", "setup", "playbook", "system"],
            ConceptualColumn::Side => &["side", "direction", "type", "action", "long/short"],
            ConceptualColumn::Quantity => &["quantity", "qty", "size", "contracts", "shares", "volume"],
            ConceptualColumn::EntryPrice => &["entry price", "entry", "open price", "buy price"],
            ConceptualColumn::ExitPrice => &["exit price", "exit", "close price", "sell price"],
            ConceptualColumn::Fees => &["fees", "fee", "commission", "commissions"],
            ConceptualColumn::Notes => &["notes", "note", "comment", "comments"],
        }
    }
}

impl FromStr for ConceptualColumn {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.key() == needle)
            .ok_or_else(|| CoreError::InvalidInput("conceptual column".to_string(), s.to_string()))
    }
}

impl fmt::Display for ConceptualColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_parses_platform_spellings() {
        assert_eq!("BUY".parse::<TradeSide>().unwrap(), TradeSide::Long);
        assert_eq!(" short ".parse::<TradeSide>().unwrap(), TradeSide::Short);
        assert!("flat".parse::<TradeSide>().is_err());
    }

    #[test]
    fn conceptual_column_round_trips_through_key() {
        for column in ConceptualColumn::ALL {
            assert_eq!(column.key().parse::<ConceptualColumn>().unwrap(), column);
        }
        assert!(ConceptualColumn::Date.is_critical());
        assert!(!ConceptualColumn::Notes.is_critical());
    }
}

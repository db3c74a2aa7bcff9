//! # Trade Journal Market Data
//!
//! Benchmark retrieval for the analysis pipeline. `BenchmarkSource` is the
//! contract the pipeline depends on; `YahooClient` implements it against the
//! public chart API and converts daily closes into simple returns.

use crate::error::MarketDataError;
use crate::responses::ChartEnvelope;
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate};
use configuration::MarketDataSettings;
use core_types::ReturnSeries;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::time::Duration;

pub mod error;
pub mod responses;

/// Ticker value that switches the benchmark off.
pub const NO_BENCHMARK: &str = "NONE";

/// True when `ticker` means "no benchmark": blank or `NONE` in any case.
pub fn is_disabled_ticker(ticker: &str) -> bool {
    let ticker = ticker.trim();
    ticker.is_empty() || ticker.eq_ignore_ascii_case(NO_BENCHMARK)
}

/// The abstract interface for fetching benchmark returns.
/// Implemented by the HTTP client and by fakes in the pipeline tests.
#[async_trait]
pub trait BenchmarkSource: Send + Sync {
    /// Daily simple returns for `ticker` between `start` and `end`, both inclusive.
    /// `Ok(None)` means the source knows nothing about the ticker or the range.
    async fn daily_returns(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<ReturnSeries>, MarketDataError>;
}

/// A `BenchmarkSource` backed by the Yahoo Finance chart endpoint.
#[derive(Clone)]
pub struct YahooClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooClient {
    pub fn new(settings: &MarketDataSettings) -> Result<Self, MarketDataError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(concat!("trade-journal/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BenchmarkSource for YahooClient {
    async fn daily_returns(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<ReturnSeries>, MarketDataError> {
        if is_disabled_ticker(ticker) {
            return Ok(None);
        }
        if end < start {
            return Err(MarketDataError::InvalidData(format!(
                "end date {end} is before start date {start}"
            )));
        }

        // `period2` is exclusive.
        let period1 = epoch_seconds(start);
        let period2 = epoch_seconds(end.checked_add_days(Days::new(1)).unwrap_or(end));
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        tracing::debug!(ticker, %status, bytes = text.len(), "Chart response received.");

        // Error statuses carry a chart error body when the API itself rejected
        // the request; anything else (gateway pages, rate limits) is an API error.
        if !status.is_success() {
            let has_chart_error = serde_json::from_str::<ChartEnvelope>(&text)
                .is_ok_and(|envelope| envelope.chart.error.is_some());
            if !has_chart_error {
                tracing::warn!(ticker, %status, "Chart request failed.");
                return Err(MarketDataError::Api {
                    code: status.as_u16().to_string(),
                    description: status.canonical_reason().unwrap_or("unexpected status").to_string(),
                });
            }
        }

        parse_chart(ticker, &text)
    }
}

fn epoch_seconds(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Turns a chart response body into a return series.
///
/// Adjusted closes are preferred over raw closes. Days with a `null` close are
/// skipped. A "Not Found" error and a response without usable closes both
/// map to `Ok(None)`.
pub fn parse_chart(ticker: &str, body: &str) -> Result<Option<ReturnSeries>, MarketDataError> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).map_err(|e| MarketDataError::Deserialization(e.to_string()))?;

    if let Some(error) = envelope.chart.error {
        if error.code.eq_ignore_ascii_case("Not Found") {
            tracing::warn!(ticker, description = %error.description, "Benchmark ticker not found.");
            return Ok(None);
        }
        return Err(MarketDataError::Api {
            code: error.code,
            description: error.description,
        });
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(None);
    };

    let adjusted = result.indicators.adjclose.into_iter().next().map(|a| a.adjclose);
    let raw = result.indicators.quote.into_iter().next().map(|q| q.close);
    let closes = match (adjusted, raw) {
        (Some(adj), _) if !adj.is_empty() => adj,
        (_, Some(raw)) => raw,
        _ => Vec::new(),
    };

    if closes.len() != result.timestamp.len() {
        return Err(MarketDataError::InvalidData(format!(
            "{} timestamps but {} closes",
            result.timestamp.len(),
            closes.len()
        )));
    }

    let mut series: Vec<(NaiveDate, Decimal)> = Vec::with_capacity(closes.len());
    for (ts, close) in result.timestamp.iter().zip(closes) {
        let Some(close) = close.and_then(Decimal::from_f64) else {
            continue;
        };
        let date = DateTime::from_timestamp(*ts, 0)
            .ok_or_else(|| MarketDataError::InvalidData(format!("Invalid timestamp: {ts}")))?
            .date_naive();
        series.push((date, close));
    }
    series.sort_by_key(|(date, _)| *date);
    series.dedup_by_key(|(date, _)| *date);

    let returns = ReturnSeries::from_closes(ticker, &series);
    if returns.is_empty() {
        return Ok(None);
    }
    Ok(Some(returns))
}

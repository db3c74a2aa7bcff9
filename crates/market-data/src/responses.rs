use serde::Deserialize;

// Only the fields needed to rebuild a daily close series are modelled.

/// Envelope of `GET /v8/finance/chart/{ticker}`.
#[derive(Debug, Deserialize)]
pub struct ChartEnvelope {
    pub chart: ChartBody,
}

#[derive(Debug, Deserialize)]
pub struct ChartBody {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartError {
    pub code: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    /// Epoch seconds, one per trading day.
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<Quote>,
    #[serde(default)]
    pub adjclose: Vec<AdjClose>,
}

/// Closes are `null` on days the exchange reported no trade.
#[derive(Debug, Deserialize)]
pub struct Quote {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
pub struct AdjClose {
    #[serde(default)]
    pub adjclose: Vec<Option<f64>>,
}

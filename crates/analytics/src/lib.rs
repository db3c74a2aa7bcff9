//! # Trade Journal Analytics
//!
//! Quantitative analysis of a journal's trades: headline KPIs, bootstrapped
//! confidence intervals and peak-to-recovery drawdown analysis.
//!
//! ## Architectural Principles
//!
//! - **Pure logic:** depends only on `core-types`. No I/O, no configuration
//!   loading; callers pass `EngineSettings` in.
//! - **Stateless calculation:** `AnalyticsEngine` holds settings only, so the
//!   same inputs always give the same report (bootstrap intervals too, once a
//!   seed is configured).
//!
//! ## Public API
//!
//! - `AnalysisService`: the contract the session pipeline talks to.
//! - `AnalyticsEngine`: the default implementation.
//! - `KpiReport`, `ConfidenceIntervals`, `DrawdownAnalysis`: the results.

// Declare the modules that constitute this crate.
mod bootstrap;
mod drawdown;
pub mod engine;
pub mod error;
pub mod report;
pub mod service;
mod stats;

// Re-export the key components to create a clean, public-facing API.
pub use engine::{AnalyticsEngine, EngineSettings};
pub use error::AnalyticsError;
pub use report::{
    ConfidenceInterval, ConfidenceIntervals, DrawdownAnalysis, DrawdownPeriod, KpiMetric, KpiReport,
};
pub use service::AnalysisService;

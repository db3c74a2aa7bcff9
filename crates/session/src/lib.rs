//! # Trade Journal Session
//!
//! The per-user recomputation pipeline. A typed `SessionState` holds every
//! stage's output; a `DependencyGraph` of version counters decides which
//! stages are stale; `Pipeline::evaluate` re-runs only those, in order:
//! headers, mapping, processing, filtering, benchmark fetch and analysis.
//!
//! ## Public API
//!
//! - `Pipeline`, `RunInput`, `RunReport`, `RunOutcome`: one evaluation.
//! - `SessionState`: the session's typed state, plus the login, registration
//!   and logout flow.
//! - `DependencyGraph`, `Node`: the invalidation bookkeeping.

pub mod auth_flow;
pub mod graph;
pub mod pipeline;
pub mod state;

pub use auth_flow::RegistrationForm;
pub use graph::{DependencyGraph, Node};
pub use pipeline::{Pipeline, RunInput, RunOutcome, RunReport, Stage};
pub use state::{AuthState, MessageLevel, SessionDefaults, SessionState, UserMessage};

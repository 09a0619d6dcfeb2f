//! Core logic: recurring-task materialization and on-demand analytics.
//!
//! Both units take the pool explicitly per call; there is no ambient
//! connection or process-global state.

pub mod analytics;
pub mod materializer;

pub use analytics::{compute_analytics, compute_pomodoro_stats};
pub use materializer::ensure_instances;

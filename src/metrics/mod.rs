//! Metrics for the ranking core
//!
//! Prometheus counters and gauges for decisions, selections and persistence.

pub mod collector;

pub use collector::{
    MetricsCollector, MetricsTimer, PersistenceMetrics, RatingMetrics, SelectionMetrics,
};

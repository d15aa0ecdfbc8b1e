//! Metrics for the pickup-room engine
//!
//! Prometheus counters and histograms for session lifecycle, team formation
//! and rating updates.

pub mod collector;

pub use collector::{
    FormationMetrics, MetricsCollector, MetricsTimer, RatingMetrics, SessionMetrics,
};

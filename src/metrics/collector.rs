//! Metrics collection using Prometheus
//!
//! Counters and histograms for session lifecycle, team formation and rating
//! updates. Every collector owns its registry so tests and multiple engines
//! never collide on metric names.

use crate::error::MatchmakingError;
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the matchmaking engine
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,
    session_metrics: SessionMetrics,
    formation_metrics: FormationMetrics,
    rating_metrics: RatingMetrics,
}

/// Session lifecycle metrics
#[derive(Clone)]
pub struct SessionMetrics {
    /// Sessions opened
    pub sessions_opened_total: IntCounter,

    /// Sessions reaching a terminal state, by state
    pub sessions_closed_total: IntCounterVec,

    /// Sessions neither finished nor cancelled
    pub active_sessions: IntGauge,

    /// Reshuffles accepted
    pub reshuffles_total: IntCounter,

    /// Reshuffles rejected at the limit
    pub reshuffles_rejected_total: IntCounter,
}

/// Team formation metrics
#[derive(Clone)]
pub struct FormationMetrics {
    /// Successful formations, by kind (`initial` or `reshuffle`)
    pub formations_total: IntCounterVec,

    /// Failed formations, by error kind
    pub formation_failures_total: IntCounterVec,

    /// Role-valid candidates evaluated per formation
    pub candidates_evaluated: Histogram,

    /// Balance score of the chosen split
    pub chosen_score: Histogram,

    /// Formation duration
    pub formation_duration: HistogramVec,
}

/// Rating update metrics
#[derive(Clone)]
pub struct RatingMetrics {
    /// Finished sessions rated, by outcome
    pub rating_updates_total: IntCounterVec,

    /// Rating update duration
    pub rating_update_duration: Histogram,

    /// Quality of rated matches
    pub match_quality: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        Self::with_registry(Arc::new(Registry::new()))
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        Ok(Self {
            session_metrics: SessionMetrics::new(&registry)?,
            formation_metrics: FormationMetrics::new(&registry)?,
            rating_metrics: RatingMetrics::new(&registry)?,
            registry,
        })
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn session(&self) -> &SessionMetrics {
        &self.session_metrics
    }

    pub fn formation(&self) -> &FormationMetrics {
        &self.formation_metrics
    }

    pub fn rating(&self) -> &RatingMetrics {
        &self.rating_metrics
    }

    pub fn record_session_opened(&self) {
        self.session_metrics.sessions_opened_total.inc();
        self.session_metrics.active_sessions.inc();
    }

    /// Record a session entering `finished` or `cancelled`
    pub fn record_session_closed(&self, terminal_state: &str) {
        self.session_metrics
            .sessions_closed_total
            .with_label_values(&[terminal_state])
            .inc();
        self.session_metrics.active_sessions.dec();
    }

    /// Record a successful formation or reshuffle
    pub fn record_formation(&self, reshuffle: bool, candidates: usize, score: f64, duration: Duration) {
        let kind = if reshuffle { "reshuffle" } else { "initial" };

        self.formation_metrics
            .formations_total
            .with_label_values(&[kind])
            .inc();
        self.formation_metrics
            .candidates_evaluated
            .observe(candidates as f64);
        self.formation_metrics.chosen_score.observe(score);
        self.formation_metrics
            .formation_duration
            .with_label_values(&[kind])
            .observe(duration.as_secs_f64());

        if reshuffle {
            self.session_metrics.reshuffles_total.inc();
        }
    }

    /// Record a failed formation or reshuffle
    pub fn record_formation_failure(&self, error: &MatchmakingError) {
        if matches!(error, MatchmakingError::ReshuffleLimitReached { .. }) {
            self.session_metrics.reshuffles_rejected_total.inc();
        }

        self.formation_metrics
            .formation_failures_total
            .with_label_values(&[error.kind()])
            .inc();
    }

    /// Record a finished session's rating update
    pub fn record_rating_update(&self, outcome: &str, match_quality: f64, duration: Duration) {
        self.rating_metrics
            .rating_updates_total
            .with_label_values(&[outcome])
            .inc();
        self.rating_metrics.match_quality.observe(match_quality);
        self.rating_metrics
            .rating_update_duration
            .observe(duration.as_secs_f64());
    }

    /// Render every registered metric in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        Ok(TextEncoder::new().encode_to_string(&self.registry.gather())?)
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl SessionMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let sessions_opened_total =
            IntCounter::new("pickup_room_sessions_opened_total", "Sessions opened")?;
        registry.register(Box::new(sessions_opened_total.clone()))?;

        let sessions_closed_total = IntCounterVec::new(
            Opts::new(
                "pickup_room_sessions_closed_total",
                "Sessions reaching a terminal state",
            ),
            &["state"],
        )?;
        registry.register(Box::new(sessions_closed_total.clone()))?;

        let active_sessions =
            IntGauge::new("pickup_room_active_sessions", "Sessions not yet closed")?;
        registry.register(Box::new(active_sessions.clone()))?;

        let reshuffles_total =
            IntCounter::new("pickup_room_reshuffles_total", "Reshuffles accepted")?;
        registry.register(Box::new(reshuffles_total.clone()))?;

        let reshuffles_rejected_total = IntCounter::new(
            "pickup_room_reshuffles_rejected_total",
            "Reshuffles rejected at the limit",
        )?;
        registry.register(Box::new(reshuffles_rejected_total.clone()))?;

        Ok(Self {
            sessions_opened_total,
            sessions_closed_total,
            active_sessions,
            reshuffles_total,
            reshuffles_rejected_total,
        })
    }
}

impl FormationMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let formations_total = IntCounterVec::new(
            Opts::new("pickup_room_formations_total", "Successful team formations"),
            &["kind"],
        )?;
        registry.register(Box::new(formations_total.clone()))?;

        let formation_failures_total = IntCounterVec::new(
            Opts::new(
                "pickup_room_formation_failures_total",
                "Failed team formations",
            ),
            &["error"],
        )?;
        registry.register(Box::new(formation_failures_total.clone()))?;

        let candidates_evaluated = Histogram::with_opts(
            HistogramOpts::new(
                "pickup_room_candidates_evaluated",
                "Role-valid partitions evaluated per formation",
            )
            .buckets(vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 126.0, 250.0, 500.0]),
        )?;
        registry.register(Box::new(candidates_evaluated.clone()))?;

        let chosen_score = Histogram::with_opts(
            HistogramOpts::new(
                "pickup_room_chosen_balance_score",
                "Balance score of the chosen split",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 25.0]),
        )?;
        registry.register(Box::new(chosen_score.clone()))?;

        let formation_duration = HistogramVec::new(
            HistogramOpts::new(
                "pickup_room_formation_duration_seconds",
                "Team formation duration",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1]),
            &["kind"],
        )?;
        registry.register(Box::new(formation_duration.clone()))?;

        Ok(Self {
            formations_total,
            formation_failures_total,
            candidates_evaluated,
            chosen_score,
            formation_duration,
        })
    }
}

impl RatingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let rating_updates_total = IntCounterVec::new(
            Opts::new("pickup_room_rating_updates_total", "Finished sessions rated"),
            &["outcome"],
        )?;
        registry.register(Box::new(rating_updates_total.clone()))?;

        let rating_update_duration = Histogram::with_opts(
            HistogramOpts::new(
                "pickup_room_rating_update_duration_seconds",
                "Rating update time",
            )
            .buckets(vec![0.0001, 0.001, 0.005, 0.01, 0.05, 0.1]),
        )?;
        registry.register(Box::new(rating_update_duration.clone()))?;

        let match_quality = Histogram::with_opts(
            HistogramOpts::new("pickup_room_match_quality", "Quality of rated matches")
                .buckets(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]),
        )?;
        registry.register(Box::new(match_quality.clone()))?;

        Ok(Self {
            rating_updates_total,
            rating_update_duration,
            match_quality,
        })
    }
}

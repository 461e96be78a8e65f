//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the ranking core: decisions,
//! undos, selections, persistence writes and rating update latency.

use crate::types::SelectionMode;
use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the ranking core
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Rating decision metrics
    rating_metrics: RatingMetrics,

    /// Pair selection metrics
    selection_metrics: SelectionMetrics,

    /// Persistence metrics
    persistence_metrics: PersistenceMetrics,
}

/// Rating decision metrics
#[derive(Clone)]
pub struct RatingMetrics {
    /// Total decisions committed
    pub decisions_total: IntCounter,

    /// Total decisions rolled back
    pub undos_total: IntCounter,

    /// Current depth of the undo history
    pub undo_depth: IntGauge,

    /// Number of items in the pool
    pub pool_size: IntGauge,

    /// Time spent in the Glicko-2 update
    pub rating_update_duration: Histogram,
}

/// Pair selection metrics
#[derive(Clone)]
pub struct SelectionMetrics {
    /// Selections by effective mode
    pub selections_total: IntCounterVec,

    /// Selections that fell back to Standard
    pub mode_fallbacks_total: IntCounter,

    /// Selections that failed for lack of items, by requested mode
    pub insufficient_pool_total: IntCounterVec,
}

/// Persistence metrics
#[derive(Clone)]
pub struct PersistenceMetrics {
    /// Gateway writes by status
    pub writes_total: IntCounterVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let rating_metrics = RatingMetrics::new(&registry)?;
        let selection_metrics = SelectionMetrics::new(&registry)?;
        let persistence_metrics = PersistenceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            rating_metrics,
            selection_metrics,
            persistence_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn rating(&self) -> &RatingMetrics {
        &self.rating_metrics
    }

    pub fn selection(&self) -> &SelectionMetrics {
        &self.selection_metrics
    }

    pub fn persistence(&self) -> &PersistenceMetrics {
        &self.persistence_metrics
    }

    /// Record a committed decision
    pub fn record_decision(&self) {
        self.rating_metrics.decisions_total.inc();
    }

    /// Record an undone decision
    pub fn record_undo(&self) {
        self.rating_metrics.undos_total.inc();
    }

    pub fn set_undo_depth(&self, depth: usize) {
        self.rating_metrics.undo_depth.set(depth as i64);
    }

    pub fn set_pool_size(&self, size: usize) {
        self.rating_metrics.pool_size.set(size as i64);
    }

    /// Record rating update duration
    pub fn record_rating_update(&self, duration: Duration) {
        self.rating_metrics
            .rating_update_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a successful selection
    pub fn record_selection(&self, effective: SelectionMode, fell_back: bool) {
        self.selection_metrics
            .selections_total
            .with_label_values(&[effective.as_str()])
            .inc();

        if fell_back {
            self.selection_metrics.mode_fallbacks_total.inc();
        }
    }

    /// Record a selection that failed for lack of items
    pub fn record_insufficient_pool(&self, requested: SelectionMode) {
        self.selection_metrics
            .insufficient_pool_total
            .with_label_values(&[requested.as_str()])
            .inc();
    }

    /// Record a gateway write
    pub fn record_persistence_write(&self, success: bool) {
        let status = if success { "success" } else { "error" };

        self.persistence_metrics
            .writes_total
            .with_label_values(&[status])
            .inc();
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
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

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl RatingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let decisions_total = IntCounter::new(
            "pairwise_ranker_decisions_total",
            "Total comparison decisions committed",
        )?;
        registry.register(Box::new(decisions_total.clone()))?;

        let undos_total =
            IntCounter::new("pairwise_ranker_undos_total", "Total decisions undone")?;
        registry.register(Box::new(undos_total.clone()))?;

        let undo_depth = IntGauge::new(
            "pairwise_ranker_undo_depth",
            "Decisions currently available to undo",
        )?;
        registry.register(Box::new(undo_depth.clone()))?;

        let pool_size = IntGauge::new("pairwise_ranker_pool_size", "Items in the rating pool")?;
        registry.register(Box::new(pool_size.clone()))?;

        let rating_update_duration = Histogram::with_opts(
            HistogramOpts::new(
                "pairwise_ranker_rating_update_duration_seconds",
                "Time spent computing a Glicko-2 update",
            )
            .buckets(vec![1e-6, 5e-6, 1e-5, 5e-5, 1e-4, 5e-4, 1e-3]),
        )?;
        registry.register(Box::new(rating_update_duration.clone()))?;

        Ok(Self {
            decisions_total,
            undos_total,
            undo_depth,
            pool_size,
            rating_update_duration,
        })
    }
}

impl SelectionMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let selections_total = IntCounterVec::new(
            Opts::new(
                "pairwise_ranker_selections_total",
                "Pairs selected, by effective mode",
            ),
            &["mode"],
        )?;
        registry.register(Box::new(selections_total.clone()))?;

        let mode_fallbacks_total = IntCounter::new(
            "pairwise_ranker_mode_fallbacks_total",
            "Selections that fell back to Standard mode",
        )?;
        registry.register(Box::new(mode_fallbacks_total.clone()))?;

        let insufficient_pool_total = IntCounterVec::new(
            Opts::new(
                "pairwise_ranker_insufficient_pool_total",
                "Selections that failed for lack of items",
            ),
            &["mode"],
        )?;
        registry.register(Box::new(insufficient_pool_total.clone()))?;

        Ok(Self {
            selections_total,
            mode_fallbacks_total,
            insufficient_pool_total,
        })
    }
}

impl PersistenceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let writes_total = IntCounterVec::new(
            Opts::new(
                "pairwise_ranker_persistence_writes_total",
                "Gateway writes, by status",
            ),
            &["status"],
        )?;
        registry.register(Box::new(writes_total.clone()))?;

        Ok(Self { writes_total })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        let _rating = collector.rating();
        let _selection = collector.selection();
        let _persistence = collector.persistence();
    }

    #[test]
    fn test_decision_and_undo_counters() {
        let collector = MetricsCollector::new().unwrap();

        collector.record_decision();
        collector.record_decision();
        collector.record_undo();
        collector.set_undo_depth(1);

        assert_eq!(collector.rating().decisions_total.get(), 2);
        assert_eq!(collector.rating().undos_total.get(), 1);
        assert_eq!(collector.rating().undo_depth.get(), 1);
    }

    #[test]
    fn test_selection_recording() {
        let collector = MetricsCollector::new().unwrap();

        collector.record_selection(SelectionMode::Standard, true);
        collector.record_selection(SelectionMode::HighElo, false);
        collector.record_insufficient_pool(SelectionMode::EliteTier);

        let selection = collector.selection();
        assert_eq!(
            selection
                .selections_total
                .with_label_values(&["standard"])
                .get(),
            1
        );
        assert_eq!(selection.mode_fallbacks_total.get(), 1);
        assert_eq!(
            selection
                .insufficient_pool_total
                .with_label_values(&["elite-tier"])
                .get(),
            1
        );
    }

    #[test]
    fn test_render_contains_metrics() {
        let collector = MetricsCollector::new().unwrap();
        collector.record_persistence_write(false);
        collector.record_rating_update(Duration::from_micros(3));

        let text = collector.render().unwrap();
        assert!(text.contains("pairwise_ranker_persistence_writes_total"));
        assert!(text.contains("pairwise_ranker_rating_update_duration_seconds"));
    }

    #[test]
    fn test_metrics_timer() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        let timer = collector.start_timer();

        std::thread::sleep(Duration::from_millis(10));
        let duration = timer.elapsed();

        assert!(duration >= Duration::from_millis(10));

        let final_duration = timer.stop();
        assert!(final_duration >= Duration::from_millis(10));
    }
}

//! Lock-free metrics collection and periodic reporting
//!
//! Counters are recorded from the service and HTTP layers without locks;
//! `report()` swaps the interval counters out.
//!
//! NOTE: Relaxed ordering throughout. Never branch service logic on these values.

use crate::domain::error::TransitionError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Prometheus-style exponential bucket boundaries (microseconds)
/// Buckets: ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, ≤51200, >51200
pub const METRICS_BUCKET_BOUNDS: [u64; 10] =
    [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200];
pub const METRICS_NUM_BUCKETS: usize = 11;

/// Labels for rejected transitions, indexed by [`rejection_index`]
pub const REJECTION_KINDS: [&str; 4] = ["terminal_state", "no_op", "unrecognized_state", "disallowed"];

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_us: u64) -> usize {
    METRICS_BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

#[inline]
fn rejection_index(err: &TransitionError) -> usize {
    match err {
        TransitionError::TerminalState { .. } => 0,
        TransitionError::NoOpTransition { .. } => 1,
        TransitionError::UnrecognizedState { .. } => 2,
        TransitionError::DisallowedTransition { .. } => 3,
    }
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Swap all buckets to zero and return their values
#[inline]
fn swap_buckets(buckets: &[AtomicU64; METRICS_NUM_BUCKETS]) -> [u64; METRICS_NUM_BUCKETS] {
    let mut result = [0u64; METRICS_NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.swap(0, Ordering::Relaxed);
    }
    result
}

/// Compute percentile from histogram buckets
/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; METRICS_NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile) as u64;
    let mut cumulative = 0u64;

    // Upper bounds for each bucket (last bucket uses 2x the previous bound)
    const BUCKET_UPPER_BOUNDS: [u64; METRICS_NUM_BUCKETS] =
        [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200, 102400];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[METRICS_NUM_BUCKETS - 1]
}

/// Lock-free metrics collector
///
/// All recording operations are lock-free using atomics.
/// The `report()` method atomically swaps counters to get a consistent snapshot.
pub struct Metrics {
    /// Shipments created (monotonic)
    shipments_created: AtomicU64,
    /// Status updates applied (monotonic)
    status_updates: AtomicU64,
    /// Rejected transitions by kind (monotonic)
    transitions_rejected: [AtomicU64; 4],
    /// Lookups or updates against an unknown tracking id (monotonic)
    not_found: AtomicU64,
    /// Tracking code generation failures (monotonic)
    code_generation_failures: AtomicU64,
    /// Shipments currently held in the store (gauge)
    live_shipments: AtomicU64,
    /// HTTP requests by status class (monotonic)
    requests_total: AtomicU64,
    responses_2xx: AtomicU64,
    responses_4xx: AtomicU64,
    responses_5xx: AtomicU64,
    /// Requests since last report (reset on report)
    requests_since_report: AtomicU64,
    /// Sum of request latencies in microseconds (reset on report)
    request_latency_sum_us: AtomicU64,
    /// Max request latency in microseconds (reset on report)
    request_latency_max_us: AtomicU64,
    /// Request latency histogram buckets (reset on report)
    request_latency_buckets: [AtomicU64; METRICS_NUM_BUCKETS],
    /// Last report time for rate calculation
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            shipments_created: AtomicU64::new(0),
            status_updates: AtomicU64::new(0),
            transitions_rejected: std::array::from_fn(|_| AtomicU64::new(0)),
            not_found: AtomicU64::new(0),
            code_generation_failures: AtomicU64::new(0),
            live_shipments: AtomicU64::new(0),
            requests_total: AtomicU64::new(0),
            responses_2xx: AtomicU64::new(0),
            responses_4xx: AtomicU64::new(0),
            responses_5xx: AtomicU64::new(0),
            requests_since_report: AtomicU64::new(0),
            request_latency_sum_us: AtomicU64::new(0),
            request_latency_max_us: AtomicU64::new(0),
            request_latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    #[inline]
    pub fn record_shipment_created(&self) {
        self.shipments_created.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_status_update(&self) {
        self.status_updates.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_transition_rejected(&self, err: &TransitionError) {
        self.transitions_rejected[rejection_index(err)].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_code_generation_failure(&self) {
        self.code_generation_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn set_live_shipments(&self, count: u64) {
        self.live_shipments.store(count, Ordering::Relaxed);
    }

    /// Record a completed HTTP request
    #[inline]
    pub fn record_request(&self, status: u16, latency_us: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.requests_since_report.fetch_add(1, Ordering::Relaxed);
        self.request_latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);

        match status {
            200..=299 => self.responses_2xx.fetch_add(1, Ordering::Relaxed),
            400..=499 => self.responses_4xx.fetch_add(1, Ordering::Relaxed),
            500..=599 => self.responses_5xx.fetch_add(1, Ordering::Relaxed),
            _ => 0,
        };

        // Update histogram bucket
        let bucket = bucket_index(latency_us);
        self.request_latency_buckets[bucket].fetch_add(1, Ordering::Relaxed);

        // Update max
        update_atomic_max(&self.request_latency_max_us, latency_us);
    }

    #[inline]
    pub fn shipments_created(&self) -> u64 {
        self.shipments_created.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn status_updates(&self) -> u64 {
        self.status_updates.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn not_found(&self) -> u64 {
        self.not_found.load(Ordering::Relaxed)
    }

    /// Total rejections across all kinds
    pub fn transitions_rejected(&self) -> u64 {
        self.transitions_rejected.iter().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    pub fn report(&self) -> MetricsSummary {
        // Swap periodic counters to zero and get their values
        let requests_count = self.requests_since_report.swap(0, Ordering::Relaxed);
        let latency_sum = self.request_latency_sum_us.swap(0, Ordering::Relaxed);
        let max_latency = self.request_latency_max_us.swap(0, Ordering::Relaxed);
        let lat_buckets = swap_buckets(&self.request_latency_buckets);

        // Calculate elapsed time and reset
        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let requests_per_sec = if elapsed.as_secs_f64() > 0.0 {
            requests_count as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let avg_latency = if requests_count > 0 { latency_sum / requests_count } else { 0 };

        let mut transitions_rejected = [0u64; 4];
        for (i, counter) in self.transitions_rejected.iter().enumerate() {
            transitions_rejected[i] = counter.load(Ordering::Relaxed);
        }

        MetricsSummary {
            shipments_created: self.shipments_created.load(Ordering::Relaxed),
            status_updates: self.status_updates.load(Ordering::Relaxed),
            transitions_rejected,
            not_found: self.not_found.load(Ordering::Relaxed),
            code_generation_failures: self.code_generation_failures.load(Ordering::Relaxed),
            live_shipments: self.live_shipments.load(Ordering::Relaxed),
            requests_total: self.requests_total.load(Ordering::Relaxed),
            responses_2xx: self.responses_2xx.load(Ordering::Relaxed),
            responses_4xx: self.responses_4xx.load(Ordering::Relaxed),
            responses_5xx: self.responses_5xx.load(Ordering::Relaxed),
            requests_per_sec,
            avg_request_latency_us: avg_latency,
            max_request_latency_us: max_latency,
            lat_buckets,
            lat_p50_us: percentile_from_buckets(&lat_buckets, 0.50),
            lat_p95_us: percentile_from_buckets(&lat_buckets, 0.95),
            lat_p99_us: percentile_from_buckets(&lat_buckets, 0.99),
        }
    }
}

/// Point-in-time metrics snapshot
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub shipments_created: u64,
    pub status_updates: u64,
    /// Indexed like [`REJECTION_KINDS`]
    pub transitions_rejected: [u64; 4],
    pub not_found: u64,
    pub code_generation_failures: u64,
    pub live_shipments: u64,
    pub requests_total: u64,
    pub responses_2xx: u64,
    pub responses_4xx: u64,
    pub responses_5xx: u64,
    pub requests_per_sec: f64,
    pub avg_request_latency_us: u64,
    pub max_request_latency_us: u64,
    pub lat_buckets: [u64; METRICS_NUM_BUCKETS],
    pub lat_p50_us: u64,
    pub lat_p95_us: u64,
    pub lat_p99_us: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            shipments_created = %self.shipments_created,
            live_shipments = %self.live_shipments,
            status_updates = %self.status_updates,
            transitions_rejected = %self.transitions_rejected.iter().sum::<u64>(),
            not_found = %self.not_found,
            requests_total = %self.requests_total,
            requests_per_sec = format!("{:.1}", self.requests_per_sec),
            avg_latency_us = %self.avg_request_latency_us,
            max_latency_us = %self.max_request_latency_us,
            p99_us = %self.lat_p99_us,
            "metrics"
        );
    }
}

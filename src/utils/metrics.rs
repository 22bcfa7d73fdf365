//! Observability and Metrics
//!
//! Process-wide counters for exchange outcomes and traffic volume.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Global metrics collector for SMB exchanges
#[derive(Debug)]
pub struct Metrics {
    /// Total exchanges started
    pub exchanges_total: AtomicU64,
    /// Exchanges that returned a matched response
    pub exchanges_success: AtomicU64,
    /// Exchanges that failed for any reason
    pub exchanges_failed: AtomicU64,
    /// Unsolicited packets handed to the async sink
    pub async_diverted: AtomicU64,
    /// Async packets nobody handled
    pub async_unhandled: AtomicU64,
    /// Receives shorter than a minimal SMB header
    pub short_receives: AtomicU64,
    /// Responses whose signature did not verify
    pub signature_failures: AtomicU64,
    /// Total messages sent
    pub messages_sent: AtomicU64,
    /// Total messages received
    pub messages_received: AtomicU64,
    /// Total bytes sent
    pub bytes_sent: AtomicU64,
    /// Total bytes received
    pub bytes_received: AtomicU64,
    /// Connection errors
    pub connection_errors: AtomicU64,
    /// SMB status errors returned by the server
    pub protocol_errors: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            exchanges_total: AtomicU64::new(0),
            exchanges_success: AtomicU64::new(0),
            exchanges_failed: AtomicU64::new(0),
            async_diverted: AtomicU64::new(0),
            async_unhandled: AtomicU64::new(0),
            short_receives: AtomicU64::new(0),
            signature_failures: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            connection_errors: AtomicU64::new(0),
            protocol_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn exchange_started(&self) {
        self.exchanges_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn exchange_success(&self) {
        self.exchanges_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn exchange_failed(&self) {
        self.exchanges_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn async_diverted(&self) {
        self.async_diverted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn async_unhandled(&self) {
        self.async_unhandled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn short_receive(&self) {
        self.short_receives.fetch_add(1, Ordering::Relaxed);
    }

    pub fn signature_failure(&self) {
        self.signature_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a message sent
    pub fn message_sent(&self, byte_count: u64) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a message received
    pub fn message_received(&self, byte_count: u64) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn connection_error(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            exchanges_total: self.exchanges_total.load(Ordering::Relaxed),
            exchanges_success: self.exchanges_success.load(Ordering::Relaxed),
            exchanges_failed: self.exchanges_failed.load(Ordering::Relaxed),
            async_diverted: self.async_diverted.load(Ordering::Relaxed),
            async_unhandled: self.async_unhandled.load(Ordering::Relaxed),
            short_receives: self.short_receives.load(Ordering::Relaxed),
            signature_failures: self.signature_failures.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            exchanges_total = snapshot.exchanges_total,
            exchanges_success = snapshot.exchanges_success,
            exchanges_failed = snapshot.exchanges_failed,
            async_diverted = snapshot.async_diverted,
            async_unhandled = snapshot.async_unhandled,
            short_receives = snapshot.short_receives,
            signature_failures = snapshot.signature_failures,
            messages_sent = snapshot.messages_sent,
            messages_received = snapshot.messages_received,
            bytes_sent = snapshot.bytes_sent,
            bytes_received = snapshot.bytes_received,
            connection_errors = snapshot.connection_errors,
            protocol_errors = snapshot.protocol_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "SMB metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub exchanges_total: u64,
    pub exchanges_success: u64,
    pub exchanges_failed: u64,
    pub async_diverted: u64,
    pub async_unhandled: u64,
    pub short_receives: u64,
    pub signature_failures: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub connection_errors: u64,
    pub protocol_errors: u64,
    pub uptime_seconds: u64,
}

static METRICS: once_cell::sync::Lazy<Metrics> = once_cell::sync::Lazy::new(Metrics::new);

/// Get the global metrics instance
pub fn global_metrics() -> &'static Metrics {
    &METRICS
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_ms = duration.as_millis(),
            "Operation completed"
        );
    }
}

//! Metrics for channel events and job dispatch.

use metrics::{counter, describe_counter};

/// Metric names.
pub mod names {
    /// Events appended to channel streams.
    pub const EVENTS_APPENDED_TOTAL: &str = "vizor_async_events_appended_total";
    /// Events returned to pollers.
    pub const EVENTS_READ_TOTAL: &str = "vizor_async_events_read_total";
    /// Tasks handed to the worker queue.
    pub const JOBS_DISPATCHED_TOTAL: &str = "vizor_async_jobs_dispatched_total";
    /// Channel tokens issued.
    pub const TOKENS_ISSUED_TOTAL: &str = "vizor_async_tokens_issued_total";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        names::EVENTS_APPENDED_TOTAL,
        "Total number of job events appended to channel streams"
    );
    describe_counter!(
        names::EVENTS_READ_TOTAL,
        "Total number of job events returned to clients"
    );
    describe_counter!(
        names::JOBS_DISPATCHED_TOTAL,
        "Total number of async query tasks dispatched to workers"
    );
    describe_counter!(
        names::TOKENS_ISSUED_TOTAL,
        "Total number of channel tokens issued"
    );
}

/// Counter helpers.
pub struct AsyncQueryMetrics;

impl AsyncQueryMetrics {
    /// Record an appended event.
    pub fn event_appended(status: &str) {
        counter!(names::EVENTS_APPENDED_TOTAL, "status" => status.to_string()).increment(1);
    }

    /// Record events returned by a read.
    pub fn events_read(count: usize) {
        counter!(names::EVENTS_READ_TOTAL).increment(count as u64);
    }

    /// Record a dispatched task.
    pub fn job_dispatched(task: &str) {
        counter!(names::JOBS_DISPATCHED_TOTAL, "task" => task.to_string()).increment(1);
    }

    /// Record an issued token.
    pub fn token_issued() {
        counter!(names::TOKENS_ISSUED_TOTAL).increment(1);
    }
}

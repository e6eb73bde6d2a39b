// Metrics for the coordination recipes
// Published through the `metrics` facade; installing an exporter is up to the caller

use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use turnstile_common::ContentionKind;

pub const ACQUIRE_TOTAL: &str = "turnstile_acquire_total";
pub const ACQUIRE_WAIT_SECONDS: &str = "turnstile_acquire_wait_seconds";
pub const RELEASE_TOTAL: &str = "turnstile_release_total";
pub const WATCH_REARM_TOTAL: &str = "turnstile_watch_rearm_total";
pub const HELD_PATHS: &str = "turnstile_held_paths";

/// Initialize all metric descriptions
/// Should be called once at application startup
pub fn init_metrics() {
    describe_counter!(
        ACQUIRE_TOTAL,
        "Total number of campaign/lock attempts by outcome"
    );
    describe_histogram!(
        ACQUIRE_WAIT_SECONDS,
        "Time spent between registering a contender node and resolution"
    );
    describe_counter!(RELEASE_TOTAL, "Total number of resign/unlock operations");
    describe_counter!(
        WATCH_REARM_TOTAL,
        "Total number of predecessor watches established"
    );
    describe_gauge!(
        HELD_PATHS,
        "Contention paths currently held by all clients in this process"
    );
}

/// Record the resolution of an acquire
pub fn record_acquire(kind: ContentionKind, outcome: &'static str, waited: Duration) {
    counter!(ACQUIRE_TOTAL, "kind" => kind.as_str(), "outcome" => outcome).increment(1);
    histogram!(ACQUIRE_WAIT_SECONDS, "kind" => kind.as_str()).record(waited.as_secs_f64());
}

/// Record a successful release
pub fn record_release(kind: ContentionKind) {
    counter!(RELEASE_TOTAL, "kind" => kind.as_str()).increment(1);
}

/// Record a predecessor watch
pub fn record_watch_rearm() {
    counter!(WATCH_REARM_TOTAL).increment(1);
}

/// A client started holding a path
pub fn increment_held_paths() {
    gauge!(HELD_PATHS).increment(1.0);
}

/// `count` held paths were released or invalidated
pub fn decrement_held_paths(count: usize) {
    if count > 0 {
        gauge!(HELD_PATHS).decrement(count as f64);
    }
}

use std::time::Duration;

/// Configuration for the request handler and its dispatch executor.
#[derive(Debug, Clone)]
pub struct ShimConfig {
    /// Number of listener invocations allowed to run concurrently.
    pub worker_count: usize,
    /// Admitted-but-not-yet-running requests allowed beyond the worker set.
    /// Submissions past this limit are rejected fast with a
    /// capacity-exceeded failure rather than queued without bound.
    pub queue_capacity: usize,
    /// Grace period for in-flight requests during shutdown. Work still
    /// running when it expires is force-terminated, never retried.
    pub drain_timeout: Duration,
    /// Optional per-request deadline for a single listener invocation.
    /// `None` leaves listener runtime unbounded.
    pub request_timeout: Option<Duration>,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            queue_capacity: 256,
            drain_timeout: Duration::from_secs(5),
            request_timeout: None,
        }
    }
}

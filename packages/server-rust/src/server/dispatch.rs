//! Bounded dispatch executor for listener invocations.
//!
//! Runs the application listener off the inbound-feed task. Admission is
//! bounded: up to `worker_count` invocations run concurrently and up to
//! `queue_capacity` more may wait; anything beyond that is rejected fast so
//! the orchestrator can answer with a capacity-exceeded failure instead of
//! queueing without bound.
//!
//! Each invocation is isolated in its own task with panics caught, so one
//! misbehaving request can never take down a sibling or the feed reader.
//! Completions carry no cross-request ordering guarantee.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use hivelink_core::{Request, RequestListener};
use tokio::sync::{oneshot, Semaphore};
use tokio_util::sync::CancellationToken;

use super::config::ShimConfig;

// ---------------------------------------------------------------------------
// Outcomes and errors
// ---------------------------------------------------------------------------

/// Resolution of a single dispatched invocation.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The listener returned serialized result bytes.
    Success(Vec<u8>),
    /// The listener returned an error, panicked, or exceeded its deadline.
    /// The detail string is for local diagnostics only and is never
    /// transmitted to the requester.
    HandlerFailure(String),
    /// Shutdown cancelled the invocation before it finished. No response
    /// may be published for a terminated request.
    Terminated,
}

/// Admission rejection raised before an invocation is ever scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    #[error("dispatch executor at capacity")]
    CapacityExceeded,
}

// ---------------------------------------------------------------------------
// DispatchPool
// ---------------------------------------------------------------------------

/// Bounded worker pool executing listener invocations.
///
/// Two semaphores enforce the capacity limits: `admission` (sized
/// workers + queue) gates entry and is what `submit` fails fast on;
/// `workers` (sized workers) bounds actual concurrency, so admitted
/// invocations past the worker count wait on it. Both permits are held for
/// the invocation's lifetime.
pub struct DispatchPool {
    listener: Arc<dyn RequestListener>,
    admission: Arc<Semaphore>,
    workers: Arc<Semaphore>,
    cancel: CancellationToken,
    request_timeout: Option<Duration>,
}

impl DispatchPool {
    /// Creates a pool running `listener` under the limits from `config`.
    /// `cancel` is the shutdown controller's force-terminate token.
    #[must_use]
    pub fn new(
        listener: Arc<dyn RequestListener>,
        config: &ShimConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            listener,
            admission: Arc::new(Semaphore::new(config.worker_count + config.queue_capacity)),
            workers: Arc::new(Semaphore::new(config.worker_count)),
            cancel,
            request_timeout: config.request_timeout,
        }
    }

    /// Submits a request for execution without blocking the caller.
    ///
    /// The returned receiver resolves once the invocation completes, fails,
    /// or is terminated by shutdown. Dropping the receiver does not cancel
    /// the invocation.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::CapacityExceeded`] when the pool's queue
    /// limit is exhausted. The request has not been scheduled in that case.
    pub fn submit(
        &self,
        request: Request,
    ) -> Result<oneshot::Receiver<DispatchOutcome>, AdmissionError> {
        let Ok(admission) = Arc::clone(&self.admission).try_acquire_owned() else {
            return Err(AdmissionError::CapacityExceeded);
        };

        let (tx, rx) = oneshot::channel();
        let listener = Arc::clone(&self.listener);
        let workers = Arc::clone(&self.workers);
        let cancel = self.cancel.clone();
        let request_timeout = self.request_timeout;

        tokio::spawn(async move {
            // Admission is released only once the invocation leaves the
            // queued-or-running set.
            let _admission = admission;

            let outcome = tokio::select! {
                permit = Arc::clone(&workers).acquire_owned() => match permit {
                    Ok(_permit) => invoke(listener, request, request_timeout, &cancel).await,
                    // Semaphore closed: pool torn down while queued.
                    Err(_closed) => DispatchOutcome::Terminated,
                },
                () = cancel.cancelled() => DispatchOutcome::Terminated,
            };

            // The submitter may have gone away; that is not our problem.
            let _ = tx.send(outcome);
        });

        Ok(rx)
    }
}

/// Runs one listener invocation with panic isolation, the optional
/// per-request deadline, and the force-terminate race.
async fn invoke(
    listener: Arc<dyn RequestListener>,
    request: Request,
    request_timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> DispatchOutcome {
    let guarded = AssertUnwindSafe(listener.on_message(request)).catch_unwind();

    let bounded = async {
        let result = match request_timeout {
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(result) => result,
                Err(_elapsed) => {
                    return DispatchOutcome::HandlerFailure(format!(
                        "handler exceeded {}ms deadline",
                        limit.as_millis()
                    ));
                }
            },
            None => guarded.await,
        };

        match result {
            Ok(Ok(body)) => DispatchOutcome::Success(body),
            Ok(Err(err)) => DispatchOutcome::HandlerFailure(format!("{err:#}")),
            Err(_panic) => DispatchOutcome::HandlerFailure("handler panicked".to_string()),
        }
    };

    tokio::select! {
        outcome = bounded => outcome,
        () = cancel.cancelled() => DispatchOutcome::Terminated,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

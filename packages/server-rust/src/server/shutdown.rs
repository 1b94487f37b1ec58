//! Shutdown controller with in-flight request tracking.
//!
//! Uses `ArcSwap` for lock-free lifecycle transitions, an atomic counter with
//! RAII guards for in-flight tracking, and a `CancellationToken` for the
//! force-terminate branch taken when draining exceeds its grace period.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Lifecycle of the shim.
///
/// State machine: Running -> Draining -> Stopped. The external trigger is a
/// single `Running -> Draining` transition; `Stopped` is reached once
/// in-flight work has drained (or been force-terminated).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Accepting and dispatching inbound requests.
    Running,
    /// No new submissions accepted; in-flight requests completing.
    Draining,
    /// All in-flight work finished or terminated.
    Stopped,
}

/// Coordinates the shutdown protocol across reader, dispatcher, and publisher.
///
/// 1. The orchestrator checks `state()` before admitting a request
/// 2. `trigger_shutdown()` moves to Draining and signals all readers
/// 3. `wait_for_drain()` waits out the grace period
/// 4. `force_terminate()` cancels whatever is still running
#[derive(Debug)]
pub struct ShutdownController {
    shutdown_signal: watch::Sender<bool>,
    in_flight: Arc<AtomicU64>,
    state: ArcSwap<LifecycleState>,
    cancel: CancellationToken,
}

impl ShutdownController {
    /// Creates a controller in the `Running` state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            shutdown_signal: tx,
            in_flight: Arc::new(AtomicU64::new(0)),
            state: ArcSwap::from_pointee(LifecycleState::Running),
            cancel: CancellationToken::new(),
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        **self.state.load()
    }

    /// Returns a receiver notified when shutdown is triggered. Reader loops
    /// select on this alongside the inbound feed.
    #[must_use]
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_signal.subscribe()
    }

    /// Token cancelled by [`force_terminate`](Self::force_terminate). Every
    /// dispatched invocation races against it.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Initiates draining. Idempotent; calling more than once has no
    /// additional effect.
    pub fn trigger_shutdown(&self) {
        if self.state() == LifecycleState::Running {
            self.state.store(Arc::new(LifecycleState::Draining));
        }
        // Ignore send errors -- receivers may have been dropped.
        let _ = self.shutdown_signal.send(true);
    }

    /// Cancels all in-flight invocations. Their completions resolve as
    /// terminated and are discarded without publishing.
    pub fn force_terminate(&self) {
        self.cancel.cancel();
    }

    /// RAII guard tracking one in-flight request. The counter is decremented
    /// on drop, including during panic unwinding.
    #[must_use]
    pub fn in_flight_guard(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Current number of in-flight requests.
    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Waits for in-flight requests to finish, up to `timeout`.
    ///
    /// Returns `true` and transitions to `Stopped` if everything drained.
    /// Returns `false` if the grace period expired with work still running;
    /// the caller is expected to force-terminate, after which the state
    /// moves to `Stopped` regardless.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.in_flight.load(Ordering::Relaxed) == 0 {
                self.state.store(Arc::new(LifecycleState::Stopped));
                return true;
            }

            if tokio::time::Instant::now() >= deadline {
                return false;
            }

            // Poll at 10ms intervals to avoid busy-waiting.
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Marks the controller stopped. Used after force-termination, when the
    /// in-flight counter no longer reflects work that can still publish.
    pub fn mark_stopped(&self) {
        self.state.store(Arc::new(LifecycleState::Stopped));
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard that decrements the in-flight counter when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<AtomicU64>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

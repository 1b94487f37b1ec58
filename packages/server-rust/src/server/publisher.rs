//! Response publishing to reply destinations.
//!
//! Publishing is at-most-once by contract: the orchestrator logs a failed
//! publish and moves on. There is no retry, no escalation, and no redelivery
//! queue; a lost response surfaces to the original requester only as a
//! timeout under its own retry policy.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use hivelink_core::{codec, Response};
use tokio::sync::mpsc;
use tracing::trace;

// ---------------------------------------------------------------------------
// ResponsePublisher trait
// ---------------------------------------------------------------------------

/// Keyed, non-blocking publish capability over the underlying transport.
///
/// `key` is the originating request's correlation id; transports that support
/// per-key ordering may use it to keep responses sharing a key in relative
/// order. The shim itself guarantees nothing across responses.
///
/// Implementations must support concurrent, independent `publish` calls.
/// After `close()`, every publish attempt fails with [`PublishError::Closed`].
#[async_trait]
pub trait ResponsePublisher: Send + Sync {
    /// Publishes `response` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns a [`PublishError`] when the send cannot be handed to the
    /// transport. Callers treat every variant the same way: log, drop.
    async fn publish(
        &self,
        destination: &str,
        key: &str,
        response: &Response,
    ) -> Result<(), PublishError>;

    /// Releases the underlying connection. Idempotent.
    fn close(&self);
}

/// Why a publish attempt was refused.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("publisher is closed")]
    Closed,
    #[error("unknown destination: {name}")]
    UnknownDestination { name: String },
    #[error("destination {name} has no consumer")]
    Disconnected { name: String },
    #[error("destination {name} is backed up")]
    Backpressure { name: String },
    #[error("response could not be encoded: {0}")]
    Codec(String),
}

// ---------------------------------------------------------------------------
// ChannelPublisher
// ---------------------------------------------------------------------------

/// In-process publisher backed by per-destination bounded mpsc channels.
///
/// Destinations are registered up front and tracked in a `DashMap`, so
/// concurrent publishes to distinct destinations never contend. Payloads are
/// delivered MsgPack-encoded, exactly as a wire transport would carry them.
/// A full destination channel is a best-effort loss, not a wait.
pub struct ChannelPublisher {
    destinations: DashMap<String, mpsc::Sender<Vec<u8>>>,
    capacity: usize,
    closed: AtomicBool,
}

impl ChannelPublisher {
    /// Creates a publisher whose destination channels buffer `capacity`
    /// encoded responses each.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            destinations: DashMap::new(),
            capacity,
            closed: AtomicBool::new(false),
        }
    }

    /// Registers a reply destination, returning the consuming end.
    ///
    /// Re-registering a name replaces the previous channel; the old receiver
    /// sees its sender dropped.
    pub fn register(&self, destination: impl Into<String>) -> mpsc::Receiver<Vec<u8>> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.destinations.insert(destination.into(), tx);
        rx
    }
}

#[async_trait]
impl ResponsePublisher for ChannelPublisher {
    async fn publish(
        &self,
        destination: &str,
        key: &str,
        response: &Response,
    ) -> Result<(), PublishError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PublishError::Closed);
        }

        let Some(tx) = self.destinations.get(destination).map(|e| e.value().clone()) else {
            return Err(PublishError::UnknownDestination {
                name: destination.to_string(),
            });
        };

        let bytes =
            codec::encode_response(response).map_err(|err| PublishError::Codec(format!("{err:#}")))?;

        trace!(%destination, %key, len = bytes.len(), "enqueueing response");
        tx.try_send(bytes).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => PublishError::Backpressure {
                name: destination.to_string(),
            },
            mpsc::error::TrySendError::Closed(_) => PublishError::Disconnected {
                name: destination.to_string(),
            },
        })
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Request handler orchestration.
//!
//! `ClientRequestHandler` wires the dispatch executor and the response
//! publisher together per inbound request and owns the shutdown protocol.
//! Every accepted request produces exactly one response: the handler's value
//! on success, a coarse error code on failure. Handler error detail stays in
//! the local logs and never reaches the wire.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hivelink_core::{ErrorCode, Request, RequestListener, Response};
use tracing::{debug, error, warn};

use super::config::ShimConfig;
use super::dispatch::{AdmissionError, DispatchOutcome, DispatchPool};
use super::publisher::{PublishError, ResponsePublisher};
use super::shutdown::{LifecycleState, ShutdownController};

/// Correlates inbound requests with published responses.
///
/// All collaborators are injected at construction; the handler holds no
/// global state and multiple handlers can coexist in one process.
pub struct ClientRequestHandler {
    pool: DispatchPool,
    publisher: Arc<dyn ResponsePublisher>,
    controller: Arc<ShutdownController>,
    drain_timeout: Duration,
    shutdown_started: AtomicBool,
}

impl ClientRequestHandler {
    /// Creates a handler running `listener` under `config`, publishing
    /// replies through `publisher`.
    #[must_use]
    pub fn new(
        listener: Arc<dyn RequestListener>,
        config: &ShimConfig,
        publisher: Arc<dyn ResponsePublisher>,
    ) -> Self {
        let controller = Arc::new(ShutdownController::new());
        let pool = DispatchPool::new(listener, config, controller.cancellation_token());
        Self {
            pool,
            publisher,
            controller,
            drain_timeout: config.drain_timeout,
            shutdown_started: AtomicBool::new(false),
        }
    }

    /// Shared lifecycle controller, for reader loops and health inspection.
    #[must_use]
    pub fn controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.controller)
    }

    /// Accepts one inbound request. Never blocks the calling task: the
    /// listener runs on the dispatch pool and the response is published from
    /// a continuation task.
    ///
    /// # Panics
    ///
    /// Panics if `request.reply_to` is empty. A missing reply destination is
    /// a contract violation in the producing side, not a runtime error this
    /// shim recovers from.
    pub fn handle_request(&self, request: Request) {
        assert!(
            !request.reply_to.is_empty(),
            "request {} has no reply destination",
            request.correlation_id
        );

        if self.controller.state() != LifecycleState::Running {
            debug!(
                correlation_id = %request.correlation_id,
                "shutting down; inbound request discarded"
            );
            return;
        }

        let reply_to = request.reply_to.clone();
        let correlation_id = request.correlation_id.clone();
        let content_type = request.content_type.clone();

        match self.pool.submit(request) {
            Ok(completion) => {
                let guard = self.controller.in_flight_guard();
                let publisher = Arc::clone(&self.publisher);
                tokio::spawn(async move {
                    let _guard = guard;
                    // A dropped dispatch task counts as terminated work.
                    let outcome = completion.await.unwrap_or(DispatchOutcome::Terminated);

                    let response = match outcome {
                        DispatchOutcome::Success(body) => Response::builder()
                            .with_correlation_id(correlation_id.clone())
                            .with_content_type(content_type)
                            .with_body(body)
                            .build_success(),
                        DispatchOutcome::HandlerFailure(detail) => {
                            error!(
                                correlation_id = %correlation_id,
                                detail = %detail,
                                "request handler failed"
                            );
                            Response::builder()
                                .with_correlation_id(correlation_id.clone())
                                .with_error_code(ErrorCode::HandlerFailure)
                                .build_failed()
                        }
                        DispatchOutcome::Terminated => {
                            warn!(
                                correlation_id = %correlation_id,
                                "invocation terminated during shutdown; no response published"
                            );
                            return;
                        }
                    };

                    send_reply(publisher.as_ref(), &reply_to, &correlation_id, &response).await;
                });
            }
            Err(AdmissionError::CapacityExceeded) => {
                warn!(
                    correlation_id = %correlation_id,
                    "dispatch executor at capacity; rejecting request"
                );
                let guard = self.controller.in_flight_guard();
                let publisher = Arc::clone(&self.publisher);
                tokio::spawn(async move {
                    let _guard = guard;
                    let response = Response::builder()
                        .with_correlation_id(correlation_id.clone())
                        .with_error_code(ErrorCode::CapacityExceeded)
                        .build_failed();
                    send_reply(publisher.as_ref(), &reply_to, &correlation_id, &response).await;
                });
            }
        }
    }

    /// Runs the shutdown protocol: stop admissions, drain within the grace
    /// period, force-terminate stragglers, release the publisher.
    ///
    /// Idempotent; concurrent or repeated calls after the first return
    /// immediately.
    pub async fn shutdown(&self) {
        if self.shutdown_started.swap(true, Ordering::SeqCst) {
            return;
        }

        self.controller.trigger_shutdown();

        if !self.controller.wait_for_drain(self.drain_timeout).await {
            warn!(
                in_flight = self.controller.in_flight_count(),
                timeout_ms = self.drain_timeout.as_millis() as u64,
                "drain timed out; force-terminating in-flight requests"
            );
            self.controller.force_terminate();
            self.controller.mark_stopped();
        }

        self.publisher.close();
    }
}

/// Fire-and-forget publish: failures are logged, never escalated or retried.
/// A lost response surfaces to the requester only as a timeout.
async fn send_reply(
    publisher: &dyn ResponsePublisher,
    destination: &str,
    key: &str,
    response: &Response,
) {
    match publisher.publish(destination, key, response).await {
        Ok(()) => debug!(correlation_id = %key, %destination, "response published"),
        Err(PublishError::Closed) => debug!(
            correlation_id = %key,
            %destination,
            "publisher released; response discarded"
        ),
        Err(err) => error!(
            correlation_id = %key,
            %destination,
            error = %err,
            "failed to publish response"
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use hivelink_core::codec;
    use hivelink_core::envelope::ResponseStatus;
    use tokio::sync::Notify;

    use crate::server::publisher::ChannelPublisher;

    use super::*;

    struct PingListener;

    #[async_trait]
    impl RequestListener for PingListener {
        async fn on_message(&self, request: Request) -> anyhow::Result<Vec<u8>> {
            match request.body.as_slice() {
                b"ping" => Ok(b"pong".to_vec()),
                _ => Err(anyhow::anyhow!("boom")),
            }
        }
    }

    struct BlockingListener {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl RequestListener for BlockingListener {
        async fn on_message(&self, _request: Request) -> anyhow::Result<Vec<u8>> {
            self.gate.notified().await;
            Ok(Vec::new())
        }
    }

    fn request(body: &[u8], correlation_id: &str) -> Request {
        Request::builder()
            .with_body(body.to_vec())
            .with_content_type("text/plain")
            .with_correlation_id(correlation_id)
            .with_reply_to("replies-topic")
            .build()
    }

    async fn next_response(replies: &mut tokio::sync::mpsc::Receiver<Vec<u8>>) -> Response {
        let bytes = tokio::time::timeout(Duration::from_secs(2), replies.recv())
            .await
            .expect("timed out waiting for a response")
            .expect("reply channel closed");
        codec::decode_response(&bytes).expect("undecodable response")
    }

    #[tokio::test]
    async fn ping_gets_pong() {
        let publisher = Arc::new(ChannelPublisher::new(8));
        let mut replies = publisher.register("replies-topic");
        let handler = ClientRequestHandler::new(
            Arc::new(PingListener),
            &ShimConfig::default(),
            publisher,
        );

        handler.handle_request(request(b"ping", "abc-123"));

        let response = next_response(&mut replies).await;
        assert_eq!(response.correlation_id, "abc-123");
        assert_eq!(response.status, ResponseStatus::Success);
        assert_eq!(response.content_type.as_deref(), Some("text/plain"));
        assert_eq!(response.body.as_deref(), Some(b"pong".as_slice()));
    }

    #[tokio::test]
    async fn handler_error_becomes_failure_response_without_detail() {
        let publisher = Arc::new(ChannelPublisher::new(8));
        let mut replies = publisher.register("replies-topic");
        let handler = ClientRequestHandler::new(
            Arc::new(PingListener),
            &ShimConfig::default(),
            publisher,
        );

        handler.handle_request(request(b"explode", "abc-123"));

        let response = next_response(&mut replies).await;
        assert_eq!(response.correlation_id, "abc-123");
        assert_eq!(response.status, ResponseStatus::Failed);
        assert_eq!(response.error_code, Some(ErrorCode::HandlerFailure));
        // The error detail ("boom") is logged locally, never transmitted.
        assert!(response.body.is_none());
    }

    #[tokio::test]
    async fn capacity_rejection_publishes_503() {
        let gate = Arc::new(Notify::new());
        let publisher = Arc::new(ChannelPublisher::new(8));
        let mut replies = publisher.register("replies-topic");
        let config = ShimConfig {
            worker_count: 1,
            queue_capacity: 0,
            ..ShimConfig::default()
        };
        let handler = ClientRequestHandler::new(
            Arc::new(BlockingListener {
                gate: Arc::clone(&gate),
            }),
            &config,
            publisher,
        );

        handler.handle_request(request(b"first", "in-capacity"));
        handler.handle_request(request(b"second", "rejected"));

        let response = next_response(&mut replies).await;
        assert_eq!(response.correlation_id, "rejected");
        assert_eq!(response.error_code, Some(ErrorCode::CapacityExceeded));

        gate.notify_one();
        let response = next_response(&mut replies).await;
        assert_eq!(response.correlation_id, "in-capacity");
        assert_eq!(response.status, ResponseStatus::Success);
    }

    #[tokio::test]
    async fn requests_after_shutdown_are_discarded() {
        let publisher = Arc::new(ChannelPublisher::new(8));
        let mut replies = publisher.register("replies-topic");
        let handler = ClientRequestHandler::new(
            Arc::new(PingListener),
            &ShimConfig::default(),
            publisher,
        );

        handler.shutdown().await;
        handler.handle_request(request(b"ping", "too-late"));

        let outcome =
            tokio::time::timeout(Duration::from_millis(100), replies.recv()).await;
        assert!(outcome.is_err(), "no response may be published after shutdown");
    }

    #[tokio::test]
    async fn slow_work_is_terminated_after_the_grace_period() {
        let gate = Arc::new(Notify::new());
        let publisher = Arc::new(ChannelPublisher::new(8));
        let mut replies = publisher.register("replies-topic");
        let config = ShimConfig {
            drain_timeout: Duration::from_millis(50),
            ..ShimConfig::default()
        };
        let handler = ClientRequestHandler::new(
            Arc::new(BlockingListener { gate }),
            &config,
            publisher,
        );

        handler.handle_request(request(b"slow", "never-answered"));
        tokio::time::sleep(Duration::from_millis(10)).await;

        handler.shutdown().await;
        assert_eq!(handler.controller().state(), LifecycleState::Stopped);

        let outcome =
            tokio::time::timeout(Duration::from_millis(100), replies.recv()).await;
        assert!(outcome.is_err(), "terminated work must not publish");
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let publisher = Arc::new(ChannelPublisher::new(8));
        let _replies = publisher.register("replies-topic");
        let handler = ClientRequestHandler::new(
            Arc::new(PingListener),
            &ShimConfig::default(),
            publisher,
        );

        handler.shutdown().await;
        handler.shutdown().await;
        assert_eq!(handler.controller().state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    #[should_panic(expected = "no reply destination")]
    async fn missing_reply_to_is_a_contract_violation() {
        let publisher = Arc::new(ChannelPublisher::new(8));
        let handler = ClientRequestHandler::new(
            Arc::new(PingListener),
            &ShimConfig::default(),
            publisher,
        );

        let request = Request::builder()
            .with_body(b"ping".to_vec())
            .with_correlation_id("abc-123")
            .build();
        handler.handle_request(request);
    }
}

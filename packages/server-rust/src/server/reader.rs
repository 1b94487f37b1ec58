//! Inbound feed consumption.
//!
//! The feed is an ordered stream of already-deserialized requests; partition
//! and offset concerns belong to the transport binding. Several readers may
//! feed the same handler concurrently; the handler never blocks a reader,
//! so slow listeners cannot stall feed consumption.

use std::sync::Arc;

use async_trait::async_trait;
use hivelink_core::Request;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use super::handler::ClientRequestHandler;

/// Source of inbound requests.
#[async_trait]
pub trait InboundFeed: Send {
    /// Next request, or `None` once the feed is closed/exhausted.
    async fn next_request(&mut self) -> Option<Request>;
}

/// In-process feed backed by a bounded mpsc channel.
pub struct ChannelFeed {
    rx: mpsc::Receiver<Request>,
}

impl ChannelFeed {
    /// Creates a feed with the given buffer capacity, returning the producing
    /// end alongside it.
    #[must_use]
    pub fn new(capacity: usize) -> (mpsc::Sender<Request>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }
}

#[async_trait]
impl InboundFeed for ChannelFeed {
    async fn next_request(&mut self) -> Option<Request> {
        self.rx.recv().await
    }
}

/// Consumes `feed` into `handler` until the feed closes or shutdown is
/// signalled. Submission is non-blocking, so the loop's pace is set by the
/// feed alone.
pub async fn run_reader(
    mut feed: impl InboundFeed,
    handler: Arc<ClientRequestHandler>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            request = feed.next_request() => match request {
                Some(request) => handler.handle_request(request),
                None => {
                    debug!("inbound feed closed; reader exiting");
                    break;
                }
            },
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    debug!("shutdown signalled; reader exiting");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use hivelink_core::{codec, RequestListener};
    use std::time::Duration;

    use crate::server::config::ShimConfig;
    use crate::server::publisher::ChannelPublisher;

    use super::*;

    struct EchoListener;

    #[async_trait]
    impl RequestListener for EchoListener {
        async fn on_message(&self, request: Request) -> anyhow::Result<Vec<u8>> {
            Ok(request.body)
        }
    }

    fn handler(publisher: Arc<ChannelPublisher>) -> Arc<ClientRequestHandler> {
        Arc::new(ClientRequestHandler::new(
            Arc::new(EchoListener),
            &ShimConfig::default(),
            publisher,
        ))
    }

    #[tokio::test]
    async fn reader_pumps_requests_through_the_handler() {
        let publisher = Arc::new(ChannelPublisher::new(8));
        let mut replies = publisher.register("replies");
        let handler = handler(publisher);
        let (feed_tx, feed) = ChannelFeed::new(8);

        let shutdown = handler.controller().shutdown_receiver();
        let reader = tokio::spawn(run_reader(feed, Arc::clone(&handler), shutdown));

        let request = Request::builder()
            .with_body(b"hello".to_vec())
            .with_correlation_id("r-1")
            .with_reply_to("replies")
            .build();
        feed_tx.send(request).await.unwrap();

        let bytes = tokio::time::timeout(Duration::from_secs(2), replies.recv())
            .await
            .unwrap()
            .unwrap();
        let response = codec::decode_response(&bytes).unwrap();
        assert_eq!(response.correlation_id, "r-1");
        assert_eq!(response.body.as_deref(), Some(b"hello".as_slice()));

        // Closing the producing side ends the reader.
        drop(feed_tx);
        tokio::time::timeout(Duration::from_secs(1), reader)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn reader_exits_on_shutdown_signal() {
        let publisher = Arc::new(ChannelPublisher::new(8));
        let handler = handler(publisher);
        let (_feed_tx, feed) = ChannelFeed::new(8);

        let shutdown = handler.controller().shutdown_receiver();
        let reader = tokio::spawn(run_reader(feed, Arc::clone(&handler), shutdown));

        handler.controller().trigger_shutdown();
        tokio::time::timeout(Duration::from_secs(1), reader)
            .await
            .unwrap()
            .unwrap();
    }
}

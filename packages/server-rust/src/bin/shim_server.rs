//! Demo shim server.
//!
//! Wires an in-process feed and publisher around an echo listener, sends a
//! sample request through the pipeline, then serves until ctrl-c and runs
//! the shutdown protocol. Useful for watching the log points (publish
//! success at debug, failures at error) without a real transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use hivelink_core::{codec, Request, RequestListener};
use hivelink_server::{ChannelFeed, ChannelPublisher, ClientRequestHandler, ShimConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "shim-server", about = "In-process request/response shim demo")]
struct Args {
    /// Concurrent listener invocations.
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Admitted-but-waiting requests beyond the worker set.
    #[arg(long, default_value_t = 256)]
    queue_capacity: usize,

    /// Shutdown grace period in milliseconds.
    #[arg(long, default_value_t = 5000)]
    drain_timeout_ms: u64,

    /// Optional per-request deadline in milliseconds.
    #[arg(long)]
    request_timeout_ms: Option<u64>,
}

/// Echoes the request body back as a JSON document.
struct EchoListener;

#[async_trait]
impl RequestListener for EchoListener {
    async fn on_message(&self, request: Request) -> anyhow::Result<Vec<u8>> {
        let reply = serde_json::json!({
            "echo": String::from_utf8_lossy(&request.body),
        });
        Ok(serde_json::to_vec(&reply)?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = ShimConfig {
        worker_count: args.workers,
        queue_capacity: args.queue_capacity,
        drain_timeout: Duration::from_millis(args.drain_timeout_ms),
        request_timeout: args.request_timeout_ms.map(Duration::from_millis),
    };

    let publisher = Arc::new(ChannelPublisher::new(256));
    let mut replies = publisher.register("replies");
    let handler = Arc::new(ClientRequestHandler::new(
        Arc::new(EchoListener),
        &config,
        Arc::clone(&publisher) as Arc<dyn hivelink_server::ResponsePublisher>,
    ));

    let (feed_tx, feed) = ChannelFeed::new(256);
    let reader = tokio::spawn(hivelink_server::server::run_reader(
        feed,
        Arc::clone(&handler),
        handler.controller().shutdown_receiver(),
    ));

    // Drain the reply destination, logging every response that arrives.
    let consumer = tokio::spawn(async move {
        while let Some(bytes) = replies.recv().await {
            match codec::decode_response(&bytes) {
                Ok(response) => info!(
                    correlation_id = %response.correlation_id,
                    success = response.is_success(),
                    "reply received"
                ),
                Err(err) => info!(error = %err, "undecodable reply"),
            }
        }
    });

    let sample = Request::builder()
        .with_body(b"hello, hivelink".to_vec())
        .with_content_type("text/plain")
        .with_correlation_id(uuid::Uuid::new_v4().to_string())
        .with_reply_to("replies")
        .build();
    feed_tx.send(sample).await?;

    info!("shim running; press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    info!("shutting down");
    handler.shutdown().await;
    drop(feed_tx);
    reader.await?;
    consumer.abort();
    Ok(())
}

//! The correlation shim pipeline.
//!
//! One inbound request flows through four stages:
//!
//! 1. **Reader** (`reader`): pulls `Request` values off the inbound feed
//! 2. **Dispatch** (`dispatch`): bounded executor running the listener off the feed task
//! 3. **Orchestrator** (`handler`): maps the dispatch outcome to exactly one `Response`
//! 4. **Publisher** (`publisher`): best-effort keyed publish to the reply destination
//!
//! Lifecycle (`shutdown`) is shared across all stages: draining stops
//! admissions, a bounded grace period lets in-flight work finish, and the
//! force-terminate branch cancels whatever remains.

pub mod config;
pub mod dispatch;
pub mod handler;
pub mod publisher;
pub mod reader;
pub mod shutdown;

// Re-export key types for convenient access.
pub use config::ShimConfig;
pub use dispatch::{AdmissionError, DispatchOutcome, DispatchPool};
pub use handler::ClientRequestHandler;
pub use publisher::{ChannelPublisher, PublishError, ResponsePublisher};
pub use reader::{run_reader, ChannelFeed, InboundFeed};
pub use shutdown::{InFlightGuard, LifecycleState, ShutdownController};

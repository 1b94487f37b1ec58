//! `Hivelink` Server — request/response correlation shim over an async pub/sub transport.
//!
//! The transport itself has no RPC semantics; this crate layers them on top:
//! requests read from an inbound feed are dispatched to an application
//! listener off the I/O path, and exactly one response per accepted request
//! is published, best-effort, to the reply destination the request names.

pub mod auth;
pub mod server;
pub mod store;

pub use server::{
    ChannelFeed, ChannelPublisher, ClientRequestHandler, DispatchPool, InboundFeed,
    LifecycleState, ResponsePublisher, ShimConfig, ShutdownController,
};

use async_trait::async_trait;

use crate::envelope::Request;

/// Application-supplied request handler.
///
/// The shim invokes `on_message` from multiple worker tasks concurrently, so
/// implementations must not assume any call ordering or share mutable state
/// without their own synchronization. The returned bytes are the serialized
/// handler result exactly as they should appear in the response body; the
/// shim never re-encodes them.
///
/// An `Err` return (or a panic) is converted into a failed response with a
/// generic error code. The error detail is logged locally and never
/// transmitted to the requester.
#[async_trait]
pub trait RequestListener: Send + Sync {
    async fn on_message(&self, request: Request) -> anyhow::Result<Vec<u8>>;
}

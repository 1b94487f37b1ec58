//! `Hivelink` Core — request/response envelopes, listener contract, and wire codec.

pub mod codec;
pub mod envelope;
pub mod error;
pub mod traits;

pub use envelope::{Request, RequestBuilder, Response, ResponseBuilder, ResponseStatus};
pub use error::ErrorCode;
pub use traits::RequestListener;

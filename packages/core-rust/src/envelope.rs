//! Request and response envelope types.
//!
//! Both envelopes are immutable value objects: constructed once through their
//! builders, never mutated afterwards. All fields use camelCase names on the
//! wire and payloads are raw byte strings (`serde_bytes`), so the encoded form
//! stays compact under `rmp_serde::to_vec_named()`.

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// An inbound request read from the transport.
///
/// `correlation_id` is chosen by the caller and echoed verbatim in the
/// response; it also serves as the publish key for the reply so the transport
/// can keep per-key ordering on the reply destination. `reply_to` names the
/// destination the response must be published to and is a hard precondition
/// of the request handler: an empty value is a defect in the producing side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Opaque payload bytes; the listener owns their interpretation.
    #[serde(with = "serde_bytes")]
    pub body: Vec<u8>,
    /// Tag describing the payload encoding, echoed back on success.
    pub content_type: String,
    /// Caller-assigned token linking this request to its response.
    pub correlation_id: String,
    /// Destination the response must be published to.
    pub reply_to: String,
}

impl Request {
    /// Starts building a new request.
    #[must_use]
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }
}

/// Builder for [`Request`].
#[derive(Debug, Default)]
pub struct RequestBuilder {
    body: Vec<u8>,
    content_type: Option<String>,
    correlation_id: String,
    reply_to: String,
}

impl RequestBuilder {
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    #[must_use]
    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = reply_to.into();
        self
    }

    /// Finalizes the request. The content type defaults to
    /// `application/json` when not set.
    #[must_use]
    pub fn build(self) -> Request {
        Request {
            body: self.body,
            content_type: self
                .content_type
                .unwrap_or_else(|| "application/json".to_string()),
            correlation_id: self.correlation_id,
            reply_to: self.reply_to,
        }
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Outcome of a response as seen by the original requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// The reply published to a request's `reply_to` destination.
///
/// Invariants enforced by the builder's terminal methods:
/// - `body` is present iff `status == Success`
/// - `error_code` is present iff `status == Failed`
/// - `correlation_id` is copied verbatim from the originating request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Echoed from the originating request.
    pub correlation_id: String,
    /// Echoed from the request on success; omitted on failure.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content_type: Option<String>,
    pub status: ResponseStatus,
    /// Serialized handler result. Present only on success.
    #[serde(with = "serde_bytes", skip_serializing_if = "Option::is_none", default)]
    pub body: Option<Vec<u8>>,
    /// Coarse failure classification. Present only on failure.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_code: Option<ErrorCode>,
}

impl Response {
    /// Starts building a new response.
    #[must_use]
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::default()
    }

    /// True when the response carries a successful handler result.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

/// Builder for [`Response`]. The terminal methods (`build_success`,
/// `build_failed`) pick the status and drop whichever of body/error code does
/// not belong to it, so an invariant-violating response cannot be constructed.
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    correlation_id: String,
    content_type: Option<String>,
    body: Option<Vec<u8>>,
    error_code: Option<ErrorCode>,
}

impl ResponseBuilder {
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn with_error_code(mut self, code: ErrorCode) -> Self {
        self.error_code = Some(code);
        self
    }

    /// Finalizes a successful response. Any error code set earlier is
    /// discarded; a missing body becomes an empty one.
    #[must_use]
    pub fn build_success(self) -> Response {
        Response {
            correlation_id: self.correlation_id,
            content_type: self.content_type,
            status: ResponseStatus::Success,
            body: Some(self.body.unwrap_or_default()),
            error_code: None,
        }
    }

    /// Finalizes a failed response. Any body set earlier is discarded; a
    /// missing error code defaults to [`ErrorCode::HandlerFailure`].
    #[must_use]
    pub fn build_failed(self) -> Response {
        Response {
            correlation_id: self.correlation_id,
            content_type: self.content_type,
            status: ResponseStatus::Failed,
            body: None,
            error_code: Some(self.error_code.unwrap_or(ErrorCode::HandlerFailure)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_sets_all_fields() {
        let request = Request::builder()
            .with_body(b"ping".to_vec())
            .with_content_type("text/plain")
            .with_correlation_id("abc-123")
            .with_reply_to("replies-topic")
            .build();

        assert_eq!(request.body, b"ping");
        assert_eq!(request.content_type, "text/plain");
        assert_eq!(request.correlation_id, "abc-123");
        assert_eq!(request.reply_to, "replies-topic");
    }

    #[test]
    fn request_content_type_defaults_to_json() {
        let request = Request::builder().with_correlation_id("x").build();
        assert_eq!(request.content_type, "application/json");
    }

    #[test]
    fn success_response_has_body_and_no_error_code() {
        let response = Response::builder()
            .with_correlation_id("abc-123")
            .with_content_type("text/plain")
            .with_body(b"pong".to_vec())
            .with_error_code(ErrorCode::HandlerFailure)
            .build_success();

        assert_eq!(response.status, ResponseStatus::Success);
        assert_eq!(response.body.as_deref(), Some(b"pong".as_slice()));
        assert!(response.error_code.is_none());
        assert!(response.is_success());
    }

    #[test]
    fn failed_response_has_error_code_and_no_body() {
        let response = Response::builder()
            .with_correlation_id("abc-123")
            .with_body(b"leftover".to_vec())
            .with_error_code(ErrorCode::CapacityExceeded)
            .build_failed();

        assert_eq!(response.status, ResponseStatus::Failed);
        assert!(response.body.is_none());
        assert_eq!(response.error_code, Some(ErrorCode::CapacityExceeded));
        assert!(!response.is_success());
    }

    #[test]
    fn failed_response_defaults_to_handler_failure_code() {
        let response = Response::builder().with_correlation_id("x").build_failed();
        assert_eq!(response.error_code, Some(ErrorCode::HandlerFailure));
    }

    #[test]
    fn wire_field_names_are_camel_case() {
        let request = Request::builder()
            .with_correlation_id("abc")
            .with_reply_to("replies")
            .build();
        let json = serde_json::to_value(&request).unwrap();

        assert!(json.get("correlationId").is_some());
        assert!(json.get("replyTo").is_some());
        assert!(json.get("contentType").is_some());
    }

    #[test]
    fn failure_omits_body_and_content_type_on_the_wire() {
        let response = Response::builder()
            .with_correlation_id("abc")
            .with_error_code(ErrorCode::HandlerFailure)
            .build_failed();
        let json = serde_json::to_value(&response).unwrap();

        assert!(json.get("body").is_none());
        assert!(json.get("contentType").is_none());
        assert_eq!(json["errorCode"], 500);
    }
}

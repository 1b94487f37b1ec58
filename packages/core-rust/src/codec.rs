//! MsgPack wire codec for the envelope types.
//!
//! Uses named serialization (`rmp_serde::to_vec_named`) so field names travel
//! with the payload and the wire format stays self-describing across peers
//! built from different versions of these structs.

use crate::envelope::{Request, Response};

/// Encodes a request for transport.
///
/// # Errors
///
/// Returns an error if MsgPack serialization fails.
pub fn encode_request(request: &Request) -> anyhow::Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(request)?)
}

/// Decodes a request received from the transport.
///
/// # Errors
///
/// Returns an error if the bytes are not a valid request envelope. Transport
/// bindings are expected to log and skip undecodable messages.
pub fn decode_request(bytes: &[u8]) -> anyhow::Result<Request> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Encodes a response for publishing.
///
/// # Errors
///
/// Returns an error if MsgPack serialization fails.
pub fn encode_response(response: &Response) -> anyhow::Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(response)?)
}

/// Decodes a response received on a reply destination.
///
/// # Errors
///
/// Returns an error if the bytes are not a valid response envelope.
pub fn decode_response(bytes: &[u8]) -> anyhow::Result<Response> {
    Ok(rmp_serde::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::envelope::ResponseStatus;
    use crate::error::ErrorCode;

    #[test]
    fn request_round_trips() {
        let request = Request::builder()
            .with_body(b"ping".to_vec())
            .with_content_type("text/plain")
            .with_correlation_id("abc-123")
            .with_reply_to("replies-topic")
            .build();

        let bytes = encode_request(&request).unwrap();
        let decoded = decode_request(&bytes).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn failed_response_round_trips_with_numeric_code() {
        let response = Response::builder()
            .with_correlation_id("abc-123")
            .with_error_code(ErrorCode::CapacityExceeded)
            .build_failed();

        let bytes = encode_response(&response).unwrap();
        let decoded = decode_response(&bytes).unwrap();
        assert_eq!(decoded.status, ResponseStatus::Failed);
        assert_eq!(decoded.error_code, Some(ErrorCode::CapacityExceeded));
        assert!(decoded.body.is_none());
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(decode_request(&[0xff, 0x00, 0x13]).is_err());
        assert!(decode_response(b"not msgpack").is_err());
    }

    proptest! {
        #[test]
        fn arbitrary_payloads_survive_the_wire(
            body in proptest::collection::vec(any::<u8>(), 0..512),
            correlation_id in "[a-zA-Z0-9-]{1,64}",
        ) {
            let request = Request::builder()
                .with_body(body)
                .with_correlation_id(correlation_id)
                .with_reply_to("replies")
                .build();
            let decoded = decode_request(&encode_request(&request).unwrap()).unwrap();
            prop_assert_eq!(decoded, request);
        }
    }
}

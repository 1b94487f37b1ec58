//! Failure classification carried on the wire.
//!
//! The shim deliberately never forwards handler error details to the
//! requester; all a requester ever sees is one of these coarse codes. The
//! codes travel as bare numbers so the encoded response shape stays stable
//! even if variants are added later.

use serde::{Deserialize, Serialize};

/// Coarse classification of why a request produced a failed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", from = "u16")]
pub enum ErrorCode {
    /// The listener returned an error, panicked, or timed out.
    HandlerFailure,
    /// The dispatch executor was at capacity and rejected admission.
    CapacityExceeded,
    /// The response envelope could not be encoded for publishing.
    SerializationError,
}

impl ErrorCode {
    /// Numeric code published on the wire.
    #[must_use]
    pub fn as_u16(self) -> u16 {
        match self {
            ErrorCode::HandlerFailure => 500,
            ErrorCode::CapacityExceeded => 503,
            ErrorCode::SerializationError => 422,
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.as_u16()
    }
}

impl From<u16> for ErrorCode {
    /// Unknown inbound codes collapse to `HandlerFailure` rather than being
    /// rejected, so a newer peer never makes an older one drop a response.
    fn from(raw: u16) -> Self {
        match raw {
            503 => ErrorCode::CapacityExceeded,
            422 => ErrorCode::SerializationError,
            _ => ErrorCode::HandlerFailure,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCode::HandlerFailure => "handler-failure",
            ErrorCode::CapacityExceeded => "capacity-exceeded",
            ErrorCode::SerializationError => "serialization-error",
        };
        write!(f, "{} ({})", name, self.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_u16() {
        for code in [
            ErrorCode::HandlerFailure,
            ErrorCode::CapacityExceeded,
            ErrorCode::SerializationError,
        ] {
            assert_eq!(ErrorCode::from(code.as_u16()), code);
        }
    }

    #[test]
    fn unknown_code_collapses_to_handler_failure() {
        assert_eq!(ErrorCode::from(404), ErrorCode::HandlerFailure);
        assert_eq!(ErrorCode::from(0), ErrorCode::HandlerFailure);
    }

    #[test]
    fn serializes_as_bare_number() {
        let json = serde_json::to_string(&ErrorCode::CapacityExceeded).unwrap();
        assert_eq!(json, "503");
    }
}

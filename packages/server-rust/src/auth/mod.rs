//! Token service used to authenticate requests before they reach the shim.
//!
//! The shim itself never inspects tokens; callers authenticate at the edge
//! and only authorized requests are fed into the request handler. The
//! service fails closed: any malformed, unsigned, expired, or incomplete
//! token is an error.

pub mod jwt;

pub use jwt::{AuthError, JwtTokenService, ParsedToken, TokenPayload, TokenType};

//! Typed RPC faults.
//!
//! A fault is the only error a remote node can report. The numeric code tells
//! the caller whether to try elsewhere (`Unhandled`) or to give up
//! (`AccessDenied`).

use std::fmt;

use bytes::{Bytes, BytesMut};
use ripple_core::encoding::{CanonicalDecode, CanonicalEncode, DecodeError};

/// Code of a query that could not be resolved here or beyond.
pub const UNHANDLED: u32 = 100;

/// Code of a refused request: wrong secret or sandbox escape.
pub const ACCESS_DENIED: u32 = 200;

/// Code of a local failure unrelated to the request (e.g. disk error).
pub const INTERNAL: u32 = 1;

/// Code of a request the server could not decode.
pub const INVALID_REQUEST: u32 = 2;

/// Fault kind carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultCode {
    /// Query could not be resolved within the hop budget
    Unhandled,
    /// Request refused
    AccessDenied,
    /// Local failure at the answering node
    Internal,
    /// Malformed request frame
    InvalidRequest,
    /// Any code this node does not know
    Other(u32),
}

impl FaultCode {
    /// Returns the numeric code.
    pub fn code(&self) -> u32 {
        match self {
            FaultCode::Unhandled => UNHANDLED,
            FaultCode::AccessDenied => ACCESS_DENIED,
            FaultCode::Internal => INTERNAL,
            FaultCode::InvalidRequest => INVALID_REQUEST,
            FaultCode::Other(code) => *code,
        }
    }

    /// Creates from a numeric code.
    pub fn from_code(code: u32) -> Self {
        match code {
            UNHANDLED => FaultCode::Unhandled,
            ACCESS_DENIED => FaultCode::AccessDenied,
            INTERNAL => FaultCode::Internal,
            INVALID_REQUEST => FaultCode::InvalidRequest,
            other => FaultCode::Other(other),
        }
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultCode::Unhandled => write!(f, "unhandled ({})", UNHANDLED),
            FaultCode::AccessDenied => write!(f, "access denied ({})", ACCESS_DENIED),
            FaultCode::Internal => write!(f, "internal error ({})", INTERNAL),
            FaultCode::InvalidRequest => write!(f, "invalid request ({})", INVALID_REQUEST),
            FaultCode::Other(code) => write!(f, "fault {}", code),
        }
    }
}

/// A typed RPC failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct Fault {
    /// Fault kind
    pub code: FaultCode,
    /// Human-readable description
    pub message: String,
}

impl Fault {
    /// Creates a fault.
    pub fn new(code: FaultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The query could not be handled.
    pub fn unhandled() -> Self {
        Self::new(FaultCode::Unhandled, "Couldn't handle the query")
    }

    /// The request was refused.
    pub fn access_denied() -> Self {
        Self::new(FaultCode::AccessDenied, "Access denied")
    }

    /// Returns true for the recoverable "try elsewhere" kind.
    pub fn is_unhandled(&self) -> bool {
        self.code == FaultCode::Unhandled
    }
}

impl CanonicalEncode for Fault {
    fn encode(&self, buf: &mut BytesMut) {
        self.code.code().encode(buf);
        self.message.encode(buf);
    }
}

impl CanonicalDecode for Fault {
    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            code: FaultCode::from_code(u32::decode(buf)?),
            message: String::decode(buf)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(FaultCode::Unhandled.code(), 100);
        assert_eq!(FaultCode::AccessDenied.code(), 200);
        assert_eq!(FaultCode::from_code(100), FaultCode::Unhandled);
        assert_eq!(FaultCode::from_code(200), FaultCode::AccessDenied);
    }

    #[test]
    fn test_unknown_code_is_preserved() {
        let code = FaultCode::from_code(7);
        assert_eq!(code, FaultCode::Other(7));
        assert_eq!(code.code(), 7);
        assert_eq!(FaultCode::from_code(1), FaultCode::Internal);
    }

    #[test]
    fn test_fault_display() {
        assert_eq!(
            Fault::access_denied().to_string(),
            "access denied (200): Access denied"
        );
    }
}

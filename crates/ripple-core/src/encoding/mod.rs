//! Canonical binary encoding for wire messages.
//!
//! Every frame exchanged between nodes is a canonically encoded value, so the
//! same message always produces the same bytes.
//!
//! # Encoding Rules
//!
//! - **Integers**: Little-endian encoding
//! - **Strings**: u32 byte length followed by UTF-8 bytes (no null terminator)
//! - **Byte buffers**: u32 length followed by the raw bytes
//! - **Variable Sequences**: u32 length prefix followed by elements
//! - **Structs**: Fields encoded in declaration order without padding
//! - **Payloaded Enums**: u32 tag followed by payload fields

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Errors during canonical decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Not enough bytes to decode
    #[error("Insufficient bytes: expected {expected}, got {available}")]
    InsufficientBytes {
        /// Expected number of bytes
        expected: usize,
        /// Actually available bytes
        available: usize,
    },

    /// Invalid UTF-8 string
    #[error("Invalid UTF-8 string: {0}")]
    InvalidUtf8(String),

    /// Invalid enum tag
    #[error("Invalid enum tag: {0}")]
    InvalidEnumTag(u32),

    /// Bytes left over after the value was decoded
    #[error("Trailing bytes: {0}")]
    TrailingBytes(usize),

    /// Custom decode error
    #[error("{0}")]
    Custom(String),
}

/// Trait for types that can be canonically encoded.
pub trait CanonicalEncode {
    /// Encodes the value to canonical byte representation.
    fn encode(&self, buf: &mut BytesMut);

    /// Returns the encoded byte representation.
    fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Returns the encoded byte representation as a Vec.
    fn to_vec(&self) -> Vec<u8> {
        Vec::from(self.to_bytes())
    }
}

/// Trait for types that can be decoded from canonical encoding.
pub trait CanonicalDecode: Sized {
    /// Decodes from canonical byte representation.
    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError>;

    /// Decodes from a byte slice, rejecting trailing bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut buf = Bytes::copy_from_slice(bytes);
        let value = Self::decode(&mut buf)?;
        if buf.has_remaining() {
            return Err(DecodeError::TrailingBytes(buf.remaining()));
        }
        Ok(value)
    }
}

fn ensure_remaining(buf: &Bytes, expected: usize) -> Result<(), DecodeError> {
    if buf.remaining() < expected {
        return Err(DecodeError::InsufficientBytes {
            expected,
            available: buf.remaining(),
        });
    }
    Ok(())
}

/// Writes a u32 length prefix.
///
/// Lengths past `u32::MAX` saturate. Such a value is far beyond the frame size
/// limit, so the frame carrying it is refused before it reaches the wire.
fn encode_len(len: usize, buf: &mut BytesMut) {
    u32::try_from(len).unwrap_or(u32::MAX).encode(buf);
}

// ============================================================================
// Primitive implementations
// ============================================================================

impl CanonicalEncode for u8 {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(*self);
    }
}

impl CanonicalDecode for u8 {
    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError> {
        ensure_remaining(buf, 1)?;
        Ok(buf.get_u8())
    }
}

impl CanonicalEncode for u32 {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32_le(*self);
    }
}

impl CanonicalDecode for u32 {
    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError> {
        ensure_remaining(buf, 4)?;
        Ok(buf.get_u32_le())
    }
}

impl CanonicalEncode for u64 {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u64_le(*self);
    }
}

impl CanonicalDecode for u64 {
    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError> {
        ensure_remaining(buf, 8)?;
        Ok(buf.get_u64_le())
    }
}

// ============================================================================
// Variable sequence implementations
// ============================================================================

impl<T: CanonicalEncode> CanonicalEncode for Vec<T> {
    fn encode(&self, buf: &mut BytesMut) {
        encode_len(self.len(), buf);
        for item in self {
            item.encode(buf);
        }
    }
}

impl<T: CanonicalDecode> CanonicalDecode for Vec<T> {
    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError> {
        let len = u32::decode(buf)? as usize;
        // Every element takes at least one byte, so the remaining length bounds the allocation.
        let mut vec = Vec::with_capacity(len.min(buf.remaining()));
        for _ in 0..len {
            vec.push(T::decode(buf)?);
        }
        Ok(vec)
    }
}

impl CanonicalEncode for Bytes {
    fn encode(&self, buf: &mut BytesMut) {
        encode_len(self.len(), buf);
        buf.put_slice(self);
    }
}

impl CanonicalDecode for Bytes {
    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError> {
        let len = u32::decode(buf)? as usize;
        ensure_remaining(buf, len)?;
        Ok(buf.copy_to_bytes(len))
    }
}

// ============================================================================
// String implementation
// ============================================================================

impl CanonicalEncode for String {
    fn encode(&self, buf: &mut BytesMut) {
        self.as_str().encode(buf);
    }
}

impl CanonicalDecode for String {
    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError> {
        let len = u32::decode(buf)? as usize;
        ensure_remaining(buf, len)?;
        let bytes = buf.copy_to_bytes(len);
        String::from_utf8(Vec::from(bytes)).map_err(|e| DecodeError::InvalidUtf8(e.to_string()))
    }
}

impl CanonicalEncode for &str {
    fn encode(&self, buf: &mut BytesMut) {
        let bytes = self.as_bytes();
        encode_len(bytes.len(), buf);
        buf.put_slice(bytes);
    }
}

//! Network message types.
//!
//! Defines the requests and responses exchanged between nodes, and between
//! the operator tool and its node.

use bytes::{Bytes, BytesMut};
use ripple_core::encoding::{CanonicalDecode, CanonicalEncode, DecodeError};
use ripple_core::{History, PeerAddr};

use crate::fault::Fault;

/// Message type identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageType {
    /// Peer introduction
    Hello = 0,
    /// Introduction acknowledged
    HelloAck = 1,
    /// File query
    Query = 2,
    /// File content
    QueryResponse = 3,
    /// Fetch into the local sandbox
    Fetch = 4,
    /// Fetch completed
    FetchAck = 5,
    /// Fault response
    Fault = 255,
}

impl MessageType {
    /// Returns the tag value.
    pub fn tag(&self) -> u32 {
        *self as u32
    }

    /// Creates from a tag value.
    pub fn from_tag(tag: u32) -> Result<Self, DecodeError> {
        match tag {
            0 => Ok(MessageType::Hello),
            1 => Ok(MessageType::HelloAck),
            2 => Ok(MessageType::Query),
            3 => Ok(MessageType::QueryResponse),
            4 => Ok(MessageType::Fetch),
            5 => Ok(MessageType::FetchAck),
            255 => Ok(MessageType::Fault),
            _ => Err(DecodeError::InvalidEnumTag(tag)),
        }
    }
}

/// Request/response ID for log correlation.
pub type RequestId = u64;

/// Network message envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Request identifier, echoed in the response
    pub request_id: RequestId,
    /// Message payload
    pub payload: MessagePayload,
}

impl Message {
    /// Creates a new message.
    pub fn new(request_id: RequestId, payload: MessagePayload) -> Self {
        Self {
            request_id,
            payload,
        }
    }

    /// Returns the message type.
    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }
}

impl CanonicalEncode for Message {
    fn encode(&self, buf: &mut BytesMut) {
        self.request_id.encode(buf);
        self.payload.encode(buf);
    }
}

impl CanonicalDecode for Message {
    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError> {
        Ok(Self {
            request_id: RequestId::decode(buf)?,
            payload: MessagePayload::decode(buf)?,
        })
    }
}

/// Message payload variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePayload {
    /// Add `address` to the receiver's peer set
    Hello {
        /// Address of the announcing peer
        address: PeerAddr,
    },
    /// Hello response
    HelloAck,
    /// Resolve `name` locally or by flooding
    Query {
        /// Sandbox-relative file name
        name: String,
        /// Peers the flood has already visited
        history: History,
    },
    /// Query response
    QueryResponse {
        /// File content
        content: Bytes,
    },
    /// Resolve `name` and store it in the receiver's sandbox
    Fetch {
        /// Sandbox-relative file name
        name: String,
        /// Write secret presented by the operator
        secret: String,
    },
    /// Fetch response
    FetchAck,
    /// Fault response
    Fault(Fault),
}

impl MessagePayload {
    /// Returns the message type for this payload.
    pub fn message_type(&self) -> MessageType {
        match self {
            MessagePayload::Hello { .. } => MessageType::Hello,
            MessagePayload::HelloAck => MessageType::HelloAck,
            MessagePayload::Query { .. } => MessageType::Query,
            MessagePayload::QueryResponse { .. } => MessageType::QueryResponse,
            MessagePayload::Fetch { .. } => MessageType::Fetch,
            MessagePayload::FetchAck => MessageType::FetchAck,
            MessagePayload::Fault(_) => MessageType::Fault,
        }
    }

    /// Returns true for payloads a server answers.
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            MessagePayload::Hello { .. } | MessagePayload::Query { .. } | MessagePayload::Fetch { .. }
        )
    }
}

impl CanonicalEncode for MessagePayload {
    fn encode(&self, buf: &mut BytesMut) {
        self.message_type().tag().encode(buf);
        match self {
            MessagePayload::Hello { address } => address.encode(buf),
            MessagePayload::HelloAck => {}
            MessagePayload::Query { name, history } => {
                name.encode(buf);
                history.encode(buf);
            }
            MessagePayload::QueryResponse { content } => content.encode(buf),
            MessagePayload::Fetch { name, secret } => {
                name.encode(buf);
                secret.encode(buf);
            }
            MessagePayload::FetchAck => {}
            MessagePayload::Fault(fault) => fault.encode(buf),
        }
    }
}

impl CanonicalDecode for MessagePayload {
    fn decode(buf: &mut Bytes) -> Result<Self, DecodeError> {
        let tag = u32::decode(buf)?;
        let msg_type = MessageType::from_tag(tag)?;

        Ok(match msg_type {
            MessageType::Hello => MessagePayload::Hello {
                address: PeerAddr::decode(buf)?,
            },
            MessageType::HelloAck => MessagePayload::HelloAck,
            MessageType::Query => MessagePayload::Query {
                name: String::decode(buf)?,
                history: History::decode(buf)?,
            },
            MessageType::QueryResponse => MessagePayload::QueryResponse {
                content: Bytes::decode(buf)?,
            },
            MessageType::Fetch => MessagePayload::Fetch {
                name: String::decode(buf)?,
                secret: String::decode(buf)?,
            },
            MessageType::FetchAck => MessagePayload::FetchAck,
            MessageType::Fault => MessagePayload::Fault(Fault::decode(buf)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::FaultCode;

    fn addr(s: &str) -> PeerAddr {
        PeerAddr::new(s).unwrap()
    }

    #[test]
    fn test_query_message_roundtrip() {
        let msg = Message::new(
            7,
            MessagePayload::Query {
                name: "a.txt".to_string(),
                history: History::from(vec![addr("127.0.0.1:4001"), addr("127.0.0.1:4002")]),
            },
        );

        let decoded = Message::from_bytes(&msg.to_vec()).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(decoded.message_type(), MessageType::Query);
    }

    #[test]
    fn test_fault_message() {
        let msg = Message::new(1, MessagePayload::Fault(Fault::unhandled()));

        let decoded = Message::from_bytes(&msg.to_vec()).unwrap();
        if let MessagePayload::Fault(fault) = decoded.payload {
            assert_eq!(fault.code, FaultCode::Unhandled);
            assert_eq!(fault.message, "Couldn't handle the query");
        } else {
            panic!("Expected Fault payload");
        }
    }

    #[test]
    fn test_binary_content_survives() {
        let content = Bytes::from_static(&[0x00, 0xFF, 0x10, 0x00]);
        let msg = Message::new(3, MessagePayload::QueryResponse { content: content.clone() });

        match Message::from_bytes(&msg.to_vec()).unwrap().payload {
            MessagePayload::QueryResponse { content: decoded } => assert_eq!(decoded, content),
            other => panic!("Expected QueryResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let mut bytes = 9u64.to_vec();
        bytes.extend(42u32.to_vec());
        assert_eq!(
            Message::from_bytes(&bytes),
            Err(DecodeError::InvalidEnumTag(42))
        );
    }

    #[test]
    fn test_request_classification() {
        assert!(MessagePayload::Hello { address: addr("h:1") }.is_request());
        assert!(MessagePayload::Fetch {
            name: "x".into(),
            secret: "s".into()
        }
        .is_request());
        assert!(!MessagePayload::HelloAck.is_request());
        assert!(!MessagePayload::Fault(Fault::access_denied()).is_request());
    }
}

//! TCP peer client.
//!
//! Every call opens a fresh connection, sends one request frame and waits for
//! one response frame. Hello and fetch exchanges are bounded by the call
//! timeout; a query is bounded by the budget its caller grants.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use ripple_core::{History, PeerAddr};
use ripple_proto::{Message, MessagePayload, MessageType};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::framing::{read_frame, write_frame};
use crate::transport::{CallError, PeerClient, TransportConfig, TransportError};

/// [`PeerClient`] over plain TCP.
pub struct TcpPeerClient {
    config: TransportConfig,
    next_request_id: AtomicU64,
}

impl TcpPeerClient {
    /// Creates a client with the given timeouts.
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            next_request_id: AtomicU64::new(1),
        }
    }

    /// Returns the transport configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Sends one request and returns the non-fault response payload.
    pub async fn call(
        &self,
        peer: &PeerAddr,
        payload: MessagePayload,
    ) -> Result<MessagePayload, CallError> {
        self.call_within(peer, payload, self.config.call_timeout)
            .await
    }

    /// Like [`call`](Self::call), bounded by `limit` instead of the call timeout.
    pub async fn call_within(
        &self,
        peer: &PeerAddr,
        payload: MessagePayload,
        limit: Duration,
    ) -> Result<MessagePayload, CallError> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let request = Message::new(request_id, payload);
        trace!(peer = %peer, request_id, kind = ?request.message_type(), "Calling peer");

        let response = timeout(limit, self.exchange(peer, &request))
            .await
            .map_err(|_| TransportError::Timeout)??;

        if response.request_id != request_id {
            return Err(TransportError::Protocol(format!(
                "response id {} does not match request id {}",
                response.request_id, request_id
            ))
            .into());
        }

        match response.payload {
            MessagePayload::Fault(fault) => {
                debug!(peer = %peer, request_id, code = %fault.code, "Peer answered with fault");
                Err(CallError::Fault(fault))
            }
            payload => Ok(payload),
        }
    }

    async fn exchange(&self, peer: &PeerAddr, request: &Message) -> Result<Message, TransportError> {
        let mut stream = timeout(
            self.config.connect_timeout,
            TcpStream::connect(peer.dial_target()),
        )
        .await
        .map_err(|_| TransportError::Timeout)?
        .map_err(|e| TransportError::ConnectionFailed(format!("{}: {}", peer, e)))?;
        stream.set_nodelay(true)?;

        write_frame(&mut stream, request).await?;
        read_frame(&mut stream).await
    }
}

impl Default for TcpPeerClient {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

fn unexpected(expected: MessageType, got: &MessagePayload) -> CallError {
    TransportError::Protocol(format!(
        "expected {:?}, got {:?}",
        expected,
        got.message_type()
    ))
    .into()
}

#[async_trait]
impl PeerClient for TcpPeerClient {
    async fn hello(&self, peer: &PeerAddr, address: &PeerAddr) -> Result<(), CallError> {
        let payload = MessagePayload::Hello {
            address: address.clone(),
        };
        match self.call(peer, payload).await? {
            MessagePayload::HelloAck => Ok(()),
            other => Err(unexpected(MessageType::HelloAck, &other)),
        }
    }

    async fn query(
        &self,
        peer: &PeerAddr,
        name: &str,
        history: &History,
        budget: Duration,
    ) -> Result<Bytes, CallError> {
        let payload = MessagePayload::Query {
            name: name.to_string(),
            history: history.clone(),
        };
        match self.call_within(peer, payload, budget).await? {
            MessagePayload::QueryResponse { content } => Ok(content),
            other => Err(unexpected(MessageType::QueryResponse, &other)),
        }
    }

    async fn fetch(&self, peer: &PeerAddr, name: &str, secret: &str) -> Result<(), CallError> {
        let payload = MessagePayload::Fetch {
            name: name.to_string(),
            secret: secret.to_string(),
        };
        match self.call(peer, payload).await? {
            MessagePayload::FetchAck => Ok(()),
            other => Err(unexpected(MessageType::FetchAck, &other)),
        }
    }
}

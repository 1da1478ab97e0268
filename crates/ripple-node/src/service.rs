//! RPC dispatch for a node.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use ripple_core::{History, PeerAddr};
use ripple_net::RequestHandler;
use ripple_proto::{Fault, FaultCode, MessagePayload};
use tracing::debug;

use crate::{AccessGate, PeerRegistry, QueryError, QueryRouter};

/// The `hello` / `query` / `fetch` surface of one node.
pub struct NodeService {
    registry: Arc<PeerRegistry>,
    router: Arc<QueryRouter>,
    gate: Arc<AccessGate>,
}

impl NodeService {
    /// Creates a service over the given components.
    pub fn new(registry: Arc<PeerRegistry>, router: Arc<QueryRouter>, gate: Arc<AccessGate>) -> Self {
        Self {
            registry,
            router,
            gate,
        }
    }

    /// Returns this node's address.
    pub fn address(&self) -> &PeerAddr {
        self.router.local_addr()
    }

    /// Returns the peer registry.
    pub fn registry(&self) -> &Arc<PeerRegistry> {
        &self.registry
    }

    /// Registers `address` as a peer. Never fails.
    pub fn hello(&self, address: PeerAddr) {
        self.registry.add(address);
    }

    /// Resolves `name` locally or through the network.
    pub async fn query(&self, name: &str, history: &History) -> Result<Bytes, QueryError> {
        self.router.query(name, history).await
    }

    /// Fetches `name` into the local sandbox if `secret` is correct.
    pub async fn fetch(&self, name: &str, secret: &str) -> Result<(), QueryError> {
        self.gate.fetch(name, secret).await
    }
}

#[async_trait]
impl RequestHandler for NodeService {
    async fn handle(&self, request: MessagePayload) -> MessagePayload {
        match request {
            MessagePayload::Hello { address } => {
                debug!(peer = %address, "hello");
                self.hello(address);
                MessagePayload::HelloAck
            }
            MessagePayload::Query { name, history } => {
                debug!(name = %name, hops = history.len(), "query");
                match self.query(&name, &history).await {
                    Ok(content) => MessagePayload::QueryResponse { content },
                    Err(e) => MessagePayload::Fault(e.into()),
                }
            }
            MessagePayload::Fetch { name, secret } => {
                debug!(name = %name, "fetch");
                match self.fetch(&name, &secret).await {
                    Ok(()) => MessagePayload::FetchAck,
                    Err(e) => MessagePayload::Fault(e.into()),
                }
            }
            other => MessagePayload::Fault(Fault::new(
                FaultCode::InvalidRequest,
                format!("{:?} is not a request", other.message_type()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{addr, router, Reply, ScriptedClient};
    use ripple_core::WriteSecret;
    use std::fs;

    fn service(root: &std::path::Path, client: Arc<ScriptedClient>) -> NodeService {
        let (router, registry, store) = router(root, "me:1", &[], client, 6);
        let router = Arc::new(router);
        let gate = Arc::new(AccessGate::new(
            WriteSecret::new("sesame"),
            router.clone(),
            store,
        ));
        NodeService::new(registry, router, gate)
    }

    #[tokio::test]
    async fn test_hello_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), ScriptedClient::new());

        for _ in 0..2 {
            let reply = service
                .handle(MessagePayload::Hello { address: addr("p:1") })
                .await;
            assert_eq!(reply, MessagePayload::HelloAck);
        }
        assert_eq!(service.registry().len(), 1);
    }

    #[tokio::test]
    async fn test_query_answers_content() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        let service = service(dir.path(), ScriptedClient::new());

        let reply = service
            .handle(MessagePayload::Query {
                name: "a.txt".into(),
                history: History::new(),
            })
            .await;

        assert_eq!(
            reply,
            MessagePayload::QueryResponse {
                content: Bytes::from_static(b"alpha")
            }
        );
    }

    #[tokio::test]
    async fn test_errors_become_faults() {
        let dir = tempfile::tempdir().unwrap();
        let client = ScriptedClient::new();
        client.script(&addr("p:1"), Reply::Unhandled);
        let service = service(dir.path(), client);
        service.hello(addr("p:1"));

        let reply = service
            .handle(MessagePayload::Query {
                name: "missing.txt".into(),
                history: History::new(),
            })
            .await;
        match reply {
            MessagePayload::Fault(fault) => assert_eq!(fault.code, FaultCode::Unhandled),
            other => panic!("expected fault, got {:?}", other),
        }

        let reply = service
            .handle(MessagePayload::Fetch {
                name: "x.txt".into(),
                secret: "wrong".into(),
            })
            .await;
        match reply {
            MessagePayload::Fault(fault) => assert_eq!(fault.code, FaultCode::AccessDenied),
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_response_payload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), ScriptedClient::new());

        let reply = service.handle(MessagePayload::FetchAck).await;

        match reply {
            MessagePayload::Fault(fault) => assert_eq!(fault.code, FaultCode::InvalidRequest),
            other => panic!("expected fault, got {:?}", other),
        }
    }
}

//! RPC server lifecycle.
//!
//! `bind` reserves the listen address, `spawn` (or `serve`) runs the accept
//! loop, and `ServerHandle::shutdown` stops accepting and waits for calls
//! already in flight.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ripple_proto::{Fault, FaultCode, Message, MessagePayload};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::framing::{read_frame, write_frame};
use crate::TransportError;

/// Answers decoded requests.
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    /// Returns the response payload for a request payload.
    async fn handle(&self, request: MessagePayload) -> MessagePayload;
}

/// A bound, not yet running RPC server.
pub struct RpcServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    handler: Arc<dyn RequestHandler>,
    idle_timeout: Duration,
}

impl RpcServer {
    /// Binds the listen address.
    pub async fn bind<A: ToSocketAddrs>(
        addr: A,
        handler: Arc<dyn RequestHandler>,
        idle_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await?;
        Self::from_listener(listener, handler, idle_timeout)
    }

    /// Wraps an already bound listener.
    pub fn from_listener(
        listener: TcpListener,
        handler: Arc<dyn RequestHandler>,
        idle_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            handler,
            idle_timeout,
        })
    }

    /// Returns the bound address (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs the accept loop on a background task.
    pub fn spawn(self) -> ServerHandle {
        let local_addr = self.local_addr;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            self.serve(async {
                let _ = shutdown_rx.await;
            })
            .await;
        });
        ServerHandle {
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            task,
        }
    }

    /// Accepts connections until `shutdown` completes, then drains in-flight calls.
    pub async fn serve<F>(self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        let Self {
            listener,
            local_addr,
            handler,
            idle_timeout,
        } = self;
        info!(addr = %local_addr, "RPC server listening");

        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,

                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        let handler = handler.clone();
                        connections.spawn(async move {
                            if let Err(e) = handle_connection(stream, handler, idle_timeout).await {
                                debug!(remote = %remote, error = %e, "Connection ended with error");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "Accept failed"),
                },

                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        drop(listener);
        let in_flight = connections.len();
        if in_flight > 0 {
            debug!(in_flight, "Waiting for in-flight calls");
        }
        while connections.join_next().await.is_some() {}
        info!(addr = %local_addr, "RPC server stopped");
    }
}

/// Handle to a running server.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Returns the bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting, waits for in-flight calls and joins the server task.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "RPC server task failed");
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some() {
            self.task.abort();
        }
    }
}

/// Serves exactly one request on an accepted connection.
async fn handle_connection(
    mut stream: TcpStream,
    handler: Arc<dyn RequestHandler>,
    idle_timeout: Duration,
) -> Result<(), TransportError> {
    let request = match timeout(idle_timeout, read_frame(&mut stream)).await {
        Ok(request) => request,
        Err(_) => return Err(TransportError::Timeout),
    };

    let response = match request {
        Ok(message) if message.payload.is_request() => {
            let payload = handler.handle(message.payload).await;
            Message::new(message.request_id, payload)
        }
        Ok(message) => Message::new(
            message.request_id,
            MessagePayload::Fault(Fault::new(
                FaultCode::InvalidRequest,
                format!("not a request: {:?}", message.message_type()),
            )),
        ),
        Err(TransportError::Decode(e)) => Message::new(
            0,
            MessagePayload::Fault(Fault::new(FaultCode::InvalidRequest, e.to_string())),
        ),
        Err(e) => return Err(e),
    };

    match write_frame(&mut stream, &response).await {
        Err(TransportError::FrameTooLarge(size)) => {
            warn!(
                request_id = response.request_id,
                size, "Response exceeds frame limit"
            );
            let fault = Message::new(
                response.request_id,
                MessagePayload::Fault(Fault::new(
                    FaultCode::Internal,
                    format!("response of {} bytes exceeds the frame limit", size),
                )),
            );
            write_frame(&mut stream, &fault).await
        }
        result => result,
    }
}

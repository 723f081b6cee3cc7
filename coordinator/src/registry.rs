//! Node registry: accepts exactly N handshake connections and collects each
//! node's key and reachable address.
//!
//! Every connection gets its own handler task. The handler publishes the
//! registration on a channel of capacity N together with a one-shot response
//! channel, then parks until the bootstrap payload arrives on it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use rapid_protocol::{read_frame, write_encoded_frame, HandshakeMsg};
use rapid_types::PublicKey;

use crate::CoordinatorError;

/// One registered node and the channel its handler waits on.
#[derive(Debug)]
pub struct Registration {
    pub public_key: PublicKey,
    /// Observed source IP combined with the advertised port.
    pub address: SocketAddr,
    responder: oneshot::Sender<Arc<Vec<u8>>>,
}

impl Registration {
    /// Hand the encoded bootstrap payload to this connection's handler.
    pub fn respond(self, body: Arc<Vec<u8>>) -> Result<(), CoordinatorError> {
        self.responder
            .send(body)
            .map_err(|_| CoordinatorError::ChannelClosed("bootstrap response"))
    }
}

/// All N registrations, plus the handler tasks still waiting to respond.
pub struct RegisteredNodes {
    pub registrations: Vec<Registration>,
    pub(crate) handlers: JoinSet<Result<SocketAddr, CoordinatorError>>,
}

impl RegisteredNodes {
    /// `(public key, address)` pairs in registration order.
    pub fn identities(&self) -> Vec<(PublicKey, SocketAddr)> {
        self.registrations
            .iter()
            .map(|r| (r.public_key, r.address))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

pub struct NodeRegistry {
    expected: usize,
}

impl NodeRegistry {
    pub fn new(expected: usize) -> Self {
        Self { expected }
    }

    /// Accept exactly `expected` connections and wait until every one of them
    /// has registered.
    ///
    /// A handshake decode failure on any connection aborts registration.
    /// Without a timeout this waits forever if fewer nodes connect.
    pub async fn register_all(
        &self,
        listener: &TcpListener,
        timeout: Option<Duration>,
    ) -> Result<RegisteredNodes, CoordinatorError> {
        let barrier = self.accept_and_collect(listener);
        match timeout {
            Some(limit) => tokio::time::timeout(limit, barrier).await.map_err(|_| {
                CoordinatorError::BootstrapTimeout {
                    phase: "registration",
                    secs: limit.as_secs(),
                }
            })?,
            None => barrier.await,
        }
    }

    async fn accept_and_collect(
        &self,
        listener: &TcpListener,
    ) -> Result<RegisteredNodes, CoordinatorError> {
        let n = self.expected;
        let (tx, mut rx) = mpsc::channel::<Registration>(n.max(1));
        let mut handlers = JoinSet::new();
        let mut registrations = Vec::with_capacity(n);
        let mut accepted = 0;

        while registrations.len() < n {
            tokio::select! {
                res = listener.accept(), if accepted < n => {
                    let (stream, peer) = res?;
                    accepted += 1;
                    debug!(%peer, accepted, "handshake connection accepted");
                    handlers.spawn(handle_handshake(stream, peer, tx.clone()));
                }
                Some(registration) = rx.recv() => {
                    info!(
                        node = %registration.address,
                        registered = registrations.len() + 1,
                        expected = n,
                        "node registered"
                    );
                    registrations.push(registration);
                }
                Some(joined) = handlers.join_next() => {
                    // A handler only finishes early when its handshake failed.
                    let err = match joined {
                        Ok(Err(e)) => e,
                        Ok(Ok(addr)) => CoordinatorError::Task(format!(
                            "handler for {addr} finished before bootstrap"
                        )),
                        Err(e) => e.into(),
                    };
                    error!(error = %err, "registration failed");
                    return Err(err);
                }
            }
        }

        Ok(RegisteredNodes {
            registrations,
            handlers,
        })
    }
}

/// Decode the handshake, register, then write the bootstrap payload once it
/// arrives. Returns the node address after the payload is flushed.
async fn handle_handshake(
    mut stream: TcpStream,
    peer: SocketAddr,
    registry: mpsc::Sender<Registration>,
) -> Result<SocketAddr, CoordinatorError> {
    let hello: HandshakeMsg = read_frame(&mut stream).await?;
    let address = SocketAddr::new(peer.ip(), hello.port);

    let (responder, response) = oneshot::channel();
    registry
        .send(Registration {
            public_key: hello.public_key,
            address,
            responder,
        })
        .await
        .map_err(|_| CoordinatorError::ChannelClosed("registry"))?;
    drop(registry);

    let body = response
        .await
        .map_err(|_| CoordinatorError::ChannelClosed("bootstrap response"))?;
    write_encoded_frame(&mut stream, &body).await?;
    debug!(node = %address, bytes = body.len(), "bootstrap payload flushed");
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapid_protocol::write_frame;
    use tokio::io::AsyncWriteExt;

    async fn hello(addr: SocketAddr, key: u8, port: u16) -> TcpStream {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let msg = HandshakeMsg {
            public_key: PublicKey([key; 32]),
            port,
        };
        write_frame(&mut stream, &msg).await.unwrap();
        stream
    }

    #[tokio::test]
    async fn address_combines_peer_ip_with_advertised_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let clients = tokio::spawn(async move {
            vec![hello(addr, 1, 7001).await, hello(addr, 2, 7002).await]
        });

        let registry = NodeRegistry::new(2);
        let nodes = registry.register_all(&listener, None).await.unwrap();
        let _streams = clients.await.unwrap();

        let mut ports: Vec<u16> = nodes.identities().iter().map(|(_, a)| a.port()).collect();
        ports.sort_unstable();
        assert_eq!(ports, vec![7001, 7002]);
        assert!(nodes
            .identities()
            .iter()
            .all(|(_, a)| a.ip().is_loopback()));
    }

    #[tokio::test]
    async fn garbage_handshake_aborts_registration() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(&3u32.to_be_bytes()).await.unwrap();
            stream.write_all(&[0xFF, 0xFF, 0xFF]).await.unwrap();
            stream
        });

        let registry = NodeRegistry::new(3);
        let err = registry.register_all(&listener, None).await.err().unwrap();
        assert!(matches!(err, CoordinatorError::Protocol(_)));
    }

    #[tokio::test]
    async fn missing_nodes_hit_the_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let registry = NodeRegistry::new(1);
        let err = registry
            .register_all(&listener, Some(Duration::from_millis(50)))
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            CoordinatorError::BootstrapTimeout {
                phase: "registration",
                ..
            }
        ));
    }
}

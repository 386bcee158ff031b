//! Network transport.
//!
//! A [`Connection`] is three channels: binary frames out, binary frames in,
//! and transport failures. [`WebSocketConnector`] backs them with a
//! `tokio-tungstenite` client split into a reader task and a writer task.
//! [`MemoryConnector`] backs them with nothing but channels.

use std::future::Future;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async_with_config;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::TransportError;

/// An open connection to the simulation server.
#[derive(Debug)]
pub struct Connection {
    /// Frames queued here are sent in order. Sends never wait for the server.
    pub outbound: mpsc::UnboundedSender<Vec<u8>>,
    /// Binary frames received from the server.
    pub inbound: mpsc::UnboundedReceiver<Vec<u8>>,
    /// Read and write failures. The connection is unusable after the first.
    pub errors: mpsc::UnboundedReceiver<TransportError>,
}

/// Opens connections for the worker.
pub trait Connector: Send + Sync {
    fn connect(&self) -> impl Future<Output = Result<Connection, TransportError>> + Send;
}

/// Connects to a WebSocket endpoint.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
    read_limit: usize,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>, read_limit: usize) -> Self {
        Self {
            url: url.into(),
            read_limit,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        let mut config = WebSocketConfig::default();
        config.max_message_size = Some(self.read_limit);
        config.max_frame_size = Some(self.read_limit);

        let (stream, _response) =
            connect_async_with_config(self.url.as_str(), Some(config), false).await?;
        info!(url = %self.url, "connection open");

        let (mut sink, mut source) = stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();

        let writer_errors = errors_tx.clone();
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Err(err) = sink.send(Message::Binary(frame)).await {
                    warn!(%err, "websocket write failed");
                    let _ = writer_errors.send(TransportError::WebSocket(err));
                    return;
                }
            }
            debug!("outbound queue closed");
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(message) = source.next().await {
                match message {
                    Ok(Message::Binary(frame)) => {
                        if inbound_tx.send(frame).is_err() {
                            return;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        info!(?frame, "server closed the connection");
                        break;
                    }
                    Ok(other) => debug!(len = other.len(), "ignoring non-binary message"),
                    Err(err) => {
                        warn!(%err, "websocket read failed");
                        let _ = errors_tx.send(TransportError::WebSocket(err));
                        return;
                    }
                }
            }
            let _ = errors_tx.send(TransportError::Closed);
        });

        Ok(Connection {
            outbound: outbound_tx,
            inbound: inbound_rx,
            errors: errors_rx,
        })
    }
}

/// The far end of an in-memory connection.
#[derive(Debug)]
pub struct MemoryPeer {
    /// Frames the client sent.
    pub received: mpsc::UnboundedReceiver<Vec<u8>>,
    /// Frames to deliver to the client.
    pub send: mpsc::UnboundedSender<Vec<u8>>,
    /// Failures to report to the client.
    pub fail: mpsc::UnboundedSender<TransportError>,
}

impl Connection {
    /// A connection whose other end is a [`MemoryPeer`].
    pub fn in_memory() -> (Connection, MemoryPeer) {
        let (outbound, received) = mpsc::unbounded_channel();
        let (send, inbound) = mpsc::unbounded_channel();
        let (fail, errors) = mpsc::unbounded_channel();
        (
            Connection {
                outbound,
                inbound,
                errors,
            },
            MemoryPeer {
                received,
                send,
                fail,
            },
        )
    }
}

/// Hands out one prepared in-memory connection.
#[derive(Debug)]
pub struct MemoryConnector {
    connection: Mutex<Option<Connection>>,
}

impl MemoryConnector {
    pub fn pair() -> (Self, MemoryPeer) {
        let (connection, peer) = Connection::in_memory();
        (
            Self {
                connection: Mutex::new(Some(connection)),
            },
            peer,
        )
    }
}

impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        self.connection.lock().take().ok_or(TransportError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_connection_carries_frames_both_ways() {
        let (connector, mut peer) = MemoryConnector::pair();
        let mut connection = connector.connect().await.unwrap();

        connection.outbound.send(vec![1, 0]).unwrap();
        assert_eq!(peer.received.recv().await, Some(vec![1, 0]));

        peer.send.send(vec![0, 0, 1, 0, 0, 0]).unwrap();
        assert_eq!(connection.inbound.recv().await, Some(vec![0, 0, 1, 0, 0, 0]));

        peer.fail.send(TransportError::Closed).unwrap();
        assert!(matches!(
            connection.errors.recv().await,
            Some(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn memory_connector_connects_once() {
        let (connector, _peer) = MemoryConnector::pair();
        assert!(connector.connect().await.is_ok());
        assert!(matches!(
            connector.connect().await,
            Err(TransportError::Closed)
        ));
    }
}

//! WebSocket transport - JSON text frames over tokio-tungstenite.

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportParts, TransportReceiver};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport to a remote service peer.
pub struct WebSocketTransport;

impl WebSocketTransport {
    /// Dials the peer and returns the established transport.
    pub async fn connect(url: &str) -> Result<TransportParts> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| Error::ConnectionFailed(e.to_string()))?;

        let (sink, stream) = stream.split();
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        Ok(TransportParts {
            sender: Box::new(WebSocketTransportSender { sink }),
            receiver: Box::new(WebSocketTransportReceiver { stream, message_tx }),
            message_rx,
        })
    }
}

/// Writer half of a WebSocket transport.
struct WebSocketTransportSender {
    sink: SplitSink<WsStream, Message>,
}

impl Transport for WebSocketTransportSender {
    fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let text = serde_json::to_string(&message)?;
            self.sink
                .send(Message::Text(text))
                .await
                .map_err(|e| Error::TransportError(e.to_string()))
        })
    }
}

/// Reader half of a WebSocket transport.
struct WebSocketTransportReceiver {
    stream: SplitStream<WsStream>,
    message_tx: mpsc::UnboundedSender<Value>,
}

impl TransportReceiver for WebSocketTransportReceiver {
    fn run(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            while let Some(frame) = self.stream.next().await {
                let frame = frame.map_err(|e| Error::TransportError(e.to_string()))?;

                let body = match frame {
                    Message::Text(text) => text.into_bytes(),
                    Message::Binary(bytes) => bytes,
                    Message::Close(_) => return Ok(()),
                    // Ping/pong is handled by tungstenite while polling.
                    _ => continue,
                };

                match serde_json::from_slice::<Value>(&body) {
                    Ok(message) => {
                        if self.message_tx.send(message).is_err() {
                            return Ok(());
                        }
                    }
                    Err(e) => {
                        tracing::error!("Failed to parse frame: {}", e);
                    }
                }
            }

            Ok(())
        })
    }
}

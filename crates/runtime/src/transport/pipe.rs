//! Length-prefixed JSON framing over a byte pipe.
//!
//! Frame layout: `[length (u32, little-endian)][JSON bytes]`.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportParts, TransportReceiver};

/// Transport over an arbitrary pair of byte streams.
///
/// Construction yields the transport plus the inbound message stream; call
/// [`into_transport_parts`](Self::into_transport_parts) to hand both to the
/// channel layer.
pub struct PipeTransport<W, R> {
    writer: W,
    reader: R,
    message_tx: mpsc::UnboundedSender<Value>,
}

impl<W, R> PipeTransport<W, R>
where
    W: AsyncWrite + Unpin + Send + 'static,
    R: AsyncRead + Unpin + Send + 'static,
{
    /// Creates a pipe transport over the given writer/reader pair.
    pub fn new(writer: W, reader: R) -> (Self, mpsc::UnboundedReceiver<Value>) {
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        (
            Self {
                writer,
                reader,
                message_tx,
            },
            message_rx,
        )
    }

    /// Splits into sender and receiver halves.
    pub fn into_parts(self) -> (PipeTransportSender<W>, PipeTransportReceiver<R>) {
        (
            PipeTransportSender {
                writer: self.writer,
            },
            PipeTransportReceiver {
                reader: self.reader,
                message_tx: self.message_tx,
            },
        )
    }

    /// Packages the transport for the channel layer.
    pub fn into_transport_parts(self, message_rx: mpsc::UnboundedReceiver<Value>) -> TransportParts {
        let (sender, receiver) = self.into_parts();
        TransportParts {
            sender: Box::new(sender),
            receiver: Box::new(receiver),
            message_rx,
        }
    }
}

/// Writer half of a [`PipeTransport`].
pub struct PipeTransportSender<W> {
    writer: W,
}

impl<W> Transport for PipeTransportSender<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let body = serde_json::to_vec(&message)?;
            let length = u32::try_from(body.len())
                .map_err(|_| Error::TransportError("message exceeds frame size".to_string()))?;

            self.writer.write_all(&length.to_le_bytes()).await?;
            self.writer.write_all(&body).await?;
            self.writer.flush().await?;
            Ok(())
        })
    }
}

/// Reader half of a [`PipeTransport`].
pub struct PipeTransportReceiver<R> {
    reader: R,
    message_tx: mpsc::UnboundedSender<Value>,
}

impl<R> TransportReceiver for PipeTransportReceiver<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    fn run(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            loop {
                let mut length_buf = [0u8; 4];
                match self.reader.read_exact(&mut length_buf).await {
                    Ok(_) => {}
                    // Peer closed the pipe; a clean end of stream.
                    Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
                    Err(e) => return Err(e.into()),
                }

                let length = u32::from_le_bytes(length_buf) as usize;
                let mut body = vec![0u8; length];
                self.reader.read_exact(&mut body).await?;

                match serde_json::from_slice::<Value>(&body) {
                    Ok(message) => {
                        if self.message_tx.send(message).is_err() {
                            // Channel layer went away; stop reading.
                            return Ok(());
                        }
                    }
                    Err(e) => {
                        tracing::error!("Failed to parse frame: {}", e);
                    }
                }
            }
        })
    }
}

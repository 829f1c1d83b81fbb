//! Transport layer - message framing between controller and peer.
//!
//! A transport moves whole JSON messages in both directions. The wire
//! details (framing, encoding, socket type) stay behind the [`Transport`] /
//! [`TransportReceiver`] seam so the channel layer never sees them.
//!
//! Two implementations are provided: [`PipeTransport`] frames messages with
//! a little-endian u32 length prefix over any byte pipe (used by tests and
//! tunnels), and [`WebSocketTransport`] exchanges JSON text frames with a
//! remote peer.

mod pipe;
mod ws;

#[cfg(test)]
mod tests;

pub use pipe::{PipeTransport, PipeTransportReceiver, PipeTransportSender};
pub use ws::WebSocketTransport;

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::Result;

/// Sending half of a transport.
pub trait Transport: Send {
    /// Sends a single message to the peer.
    fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Receiving half of a transport.
///
/// `run` reads messages until the peer closes the stream or a transport
/// fault occurs, forwarding each parsed message to the channel handed out
/// at construction time.
pub trait TransportReceiver: Send {
    fn run(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// An established transport, split into the pieces the channel layer owns.
pub struct TransportParts {
    /// Writer half, driven by the channel's writer task.
    pub sender: Box<dyn Transport>,
    /// Reader half, driven by the channel's reader task.
    pub receiver: Box<dyn TransportReceiver>,
    /// Stream of inbound messages produced by the receiver.
    pub message_rx: mpsc::UnboundedReceiver<Value>,
}

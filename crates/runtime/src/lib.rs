//! Stealth Runtime - Transport, service channel, and lifecycle state
//!
//! This crate provides the low-level runtime infrastructure for talking to a
//! Stealth service peer:
//!
//! - **Transport**: Bidirectional message framing over in-process pipes or
//!   WebSocket
//! - **Service channel**: Request/response correlation for service calls and
//!   teardown flushing of pending callers
//! - **Lifecycle state**: The connection state machine values and their
//!   named predicates
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │  stealth-rs  │  Controller API (Browser, tabs, services)
//! └──────┬───────┘
//!        │
//! ┌──────▼───────┐
//! │stealth-runtime│  This crate
//! │  ┌─────────┐ │
//! │  │ Channel │ │  FIFO request/response correlation
//! │  └─────────┘ │
//! │  ┌─────────┐ │
//! │  │ Trans   │ │  Pipe/WebSocket transport
//! │  └─────────┘ │
//! └──────────────┘
//! ```
//!
//! The envelope on the wire carries no request id, so correlation is a FIFO
//! queue per `(service, method)` pair: responses resolve outstanding calls
//! in issue order, and teardown resolves whatever is left with per-method
//! failure sentinels rather than dropping callers.

pub mod channel;
pub mod error;
pub mod state;
pub mod transport;

// Re-export key types at crate root
pub use channel::{ResponseKind, ServiceChannel};
pub use error::{Error, Result};
pub use state::ConnectionState;
pub use transport::{
    PipeTransport, PipeTransportReceiver, PipeTransportSender, Transport, TransportParts,
    TransportReceiver, WebSocketTransport,
};

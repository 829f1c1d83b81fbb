//! Wire types for the Stealth service protocol.
//!
//! This crate contains the serde-serializable types exchanged with a Stealth
//! service peer. These types represent the "protocol layer" - the shapes of
//! data as they appear on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! - **Pure data**: No behavior beyond serialization/deserialization and
//!   shape validation
//! - **1:1 with protocol**: Match the envelopes and payloads the peer
//!   actually sends
//! - **Stable**: Changes only when the wire protocol changes
//!
//! The higher-level controller API is built on top of these types in
//! `stealth-rs`.

pub mod entity;
pub mod envelope;
pub mod mode;

pub use entity::{is_browser, is_tagged, tagged};
pub use envelope::{Envelope, Headers};
pub use mode::{ContentPolicy, ModeConfig, is_config};

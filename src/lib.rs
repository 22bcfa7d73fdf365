//! # smb-protocol
//!
//! Client-side core of the SMB/CIFS (SMB1) protocol: a bit-exact packet codec
//! over NetBIOS session transports and the request/response exchange engine.
//!
//! ## Layers
//! - [`core`]: packet layout, byte codec, status decoding, NetBIOS framing
//! - [`protocol`]: exchange state machine, signing, async packet dispatch
//! - [`transport`]: the [`transport::Transport`] trait and a tokio stream transport
//! - [`config`], [`error`], [`utils`]: configuration, error types, logging,
//!   metrics and timeouts

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use crate::config::SmbConfig;
pub use crate::core::packet::SmbPacket;
pub use crate::core::status::SmbStatus;
pub use crate::error::{ProtocolError, Result};
pub use crate::protocol::dispatcher::Dispatcher;
pub use crate::protocol::exchange::{AsyncResponseSink, SmbSession};
pub use crate::protocol::signing::{HmacSigner, SigningProvider};
pub use crate::transport::{NetbiosTransport, Transport};

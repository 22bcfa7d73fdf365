//! # Transport Layer
//!
//! The exchange engine talks to the network through the [`Transport`] trait.
//! Buffers handed to a transport reserve [`HEADER_LEN`](crate::core::packet::HEADER_LEN)
//! bytes at the front for the NetBIOS session header.
//!
//! ## Implementations
//! - [`netbios::NetbiosTransport`]: RFC 1002 session messages over any tokio
//!   byte stream (TCP port 445 in production, `tokio::io::duplex` in tests)

use async_trait::async_trait;

use crate::error::Result;

pub mod netbios;

pub use netbios::NetbiosTransport;

/// A connected, message-oriented SMB transport.
#[async_trait]
pub trait Transport: Send {
    /// Send one message.
    ///
    /// `frame` starts with the reserved session header, which the transport
    /// fills in, followed by the SMB message.
    async fn send(&mut self, frame: &mut [u8]) -> Result<()>;

    /// Receive one message into `buf[HEADER_LEN..]`, returning its length.
    ///
    /// Blocks until a complete message arrives. Cancelling the returned future
    /// must not lose data already read from the stream.
    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Shut down the write side of the connection
    async fn close(&mut self) -> Result<()>;
}

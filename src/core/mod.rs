//! # Core Protocol Components
//!
//! Low-level SMB packet handling, status decoding and NetBIOS framing.
//!
//! ## Components
//! - **Packer**: Little-endian primitives, strings and alignment helpers
//! - **Packet**: SMB1 header layout, parameter words, byte area cursors
//! - **Status**: Legacy class/code and NT status decoding
//! - **Command**: SMB1 command codes
//! - **Codec**: Tokio codec for NetBIOS session framing over byte streams
//!
//! ## Wire Format
//! ```text
//! [NetBIOS(4)] [0xFF 'S' 'M' 'B'(4)] [Header(28)] [WordCount(1)] [Words(2N)] [ByteCount(2)] [Bytes]
//! ```
//!
//! ## Safety
//! - Every byte-area access is bounds checked against the buffer capacity
//! - Buffers are never smaller than a full header with 255 parameter words
//! - Frame length validated before allocation

pub mod codec;
pub mod command;
pub mod packer;
pub mod packet;
pub mod status;

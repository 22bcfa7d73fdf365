//! # Protocol Layer
//!
//! Request/response correlation, packet signing and routing of unsolicited
//! server packets.
//!
//! ## Components
//! - **Exchange**: [`exchange::SmbSession`] send/receive state machine
//! - **Signing**: [`signing::SigningProvider`] trait and HMAC reference provider
//! - **Dispatcher**: Command-keyed router for asynchronous packets
//! - **Dump**: Decoded packet views for debug logging

pub mod dispatcher;
pub mod dump;
pub mod exchange;
pub mod signing;

//! # Request/Response Exchange
//!
//! [`SmbSession`] sends a request and waits for the response carrying the same
//! command code. Packets for other commands that arrive first (oplock breaks,
//! change notifications, late replies) go to the session's
//! [`AsyncResponseSink`] and the wait continues.
//!
//! ## Exchange steps
//! 1. Prepare: default the multiplex id, stamp process and user ids, sign
//! 2. Send the frame and record the send time
//! 3. Receive until the command matches, diverting everything else
//! 4. Verify the response signature, then check its status
//!
//! One exchange runs at a time per session.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use smb_protocol::config::SmbConfig;
//! use smb_protocol::core::{command, packet::SmbPacket};
//! use smb_protocol::protocol::exchange::SmbSession;
//! use smb_protocol::transport::NetbiosTransport;
//!
//! # async fn run() -> smb_protocol::error::Result<()> {
//! let config = SmbConfig::default();
//! let transport = NetbiosTransport::connect(&config).await?;
//! let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
//! let session = SmbSession::new(transport, Arc::new(tx), &config);
//!
//! let mut request = session.new_packet()?;
//! request.set_command(command::ECHO);
//! request.set_parameter_count(1);
//! request.set_parameter(0, 1)?;
//! request.set_bytes(b"ping")?;
//!
//! let mut response = session.new_packet()?;
//! session.exchange(&mut request, &mut response, true).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, instrument, trace, warn};

use crate::config::SmbConfig;
use crate::core::command::command_name;
use crate::core::packer;
use crate::core::packet::{flags2, SmbPacket, HEADER_LEN, MIN_RX_LEN};
use crate::error::{ProtocolError, Result};
use crate::protocol::signing::SigningProvider;
use crate::utils::metrics::{global_metrics, Timer};
use crate::utils::timeout::with_timeout;

pub use crate::transport::Transport;

/// Receives packets that arrived while no exchange was waiting for them.
///
/// Called with the session lock held; implementations must not start a new
/// exchange on the same session from inside the callback.
pub trait AsyncResponseSink: Send + Sync {
    fn process_async_response(&self, packet: &SmbPacket);
}

impl AsyncResponseSink for mpsc::UnboundedSender<SmbPacket> {
    fn process_async_response(&self, packet: &SmbPacket) {
        let mut owned = packet.clone();
        owned.expect_command(owned.command());
        if self.send(owned).is_err() {
            global_metrics().async_unhandled();
            warn!(
                command = command_name(packet.command()),
                "Async response receiver dropped, packet discarded"
            );
        }
    }
}

struct SessionState<T> {
    transport: T,
    signer: Option<Arc<dyn SigningProvider>>,
    sign_seq: u32,
    last_tx: Option<Instant>,
}

/// An SMB client session bound to one transport connection.
pub struct SmbSession<T: Transport> {
    state: Mutex<SessionState<T>>,
    sink: Arc<dyn AsyncResponseSink>,
    verify_received: bool,
    process_id: u16,
    user_id: AtomicU16,
    next_mid: AtomicU16,
    response_timeout: Duration,
    async_poll_timeout: Duration,
    buffer_size: usize,
    dump_packets: bool,
}

impl<T: Transport> SmbSession<T> {
    pub fn new(transport: T, sink: Arc<dyn AsyncResponseSink>, config: &SmbConfig) -> Self {
        Self {
            state: Mutex::new(SessionState {
                transport,
                signer: None,
                sign_seq: 0,
                last_tx: None,
            }),
            sink,
            verify_received: config.signing.verify_received,
            process_id: config.client.process_id,
            user_id: AtomicU16::new(0),
            next_mid: AtomicU16::new(1),
            response_timeout: config.client.response_timeout,
            async_poll_timeout: config.client.async_poll_timeout,
            buffer_size: config.client.buffer_size,
            dump_packets: config.client.dump_packets,
        }
    }

    /// Sign all further requests, starting at `sequence`
    pub async fn enable_signing(&self, provider: Arc<dyn SigningProvider>, sequence: u32) {
        let mut state = self.state.lock().await;
        state.signer = Some(provider);
        state.sign_seq = sequence;
        debug!(sequence, "Packet signing enabled");
    }

    pub async fn disable_signing(&self) {
        self.state.lock().await.signer = None;
    }

    pub async fn is_signing_enabled(&self) -> bool {
        self.state.lock().await.signer.is_some()
    }

    /// Next signing sequence number
    pub async fn signing_sequence(&self) -> u32 {
        self.state.lock().await.sign_seq
    }

    pub fn process_id(&self) -> u16 {
        self.process_id
    }

    pub fn user_id(&self) -> u16 {
        self.user_id.load(Ordering::Relaxed)
    }

    /// Set the user id stamped on requests, normally taken from session setup
    pub fn set_user_id(&self, uid: u16) {
        self.user_id.store(uid, Ordering::Relaxed);
    }

    /// Allocate a packet sized by `ClientConfig::buffer_size`
    pub fn new_packet(&self) -> Result<SmbPacket> {
        SmbPacket::with_capacity(self.buffer_size)
    }

    /// Allocate a multiplex id. Wraps around and never returns 0.
    pub fn next_multiplex_id(&self) -> u16 {
        loop {
            let mid = self.next_mid.fetch_add(1, Ordering::Relaxed);
            if mid != 0 {
                return mid;
            }
        }
    }

    /// Time the last request left this session
    pub async fn last_send_time(&self) -> Option<Instant> {
        self.state.lock().await.last_tx
    }

    /// Send `request` and wait for the response to its command.
    ///
    /// `response` is reset before use. With `check_errors`, an unsuccessful
    /// status fails with [`ProtocolError::SmbError`] or
    /// [`ProtocolError::NtStatus`].
    #[instrument(
        skip(self, request, response),
        fields(command = command_name(request.expected_command()))
    )]
    pub async fn exchange(
        &self,
        request: &mut SmbPacket,
        response: &mut SmbPacket,
        check_errors: bool,
    ) -> Result<()> {
        let _timer = Timer::start("smb_exchange");
        let metrics = global_metrics();
        metrics.exchange_started();

        let mut state = self.state.lock().await;
        let expected = request.expected_command();
        response.reset();
        response.expect_command(expected);

        let result = match self.transmit(&mut state, request).await {
            Ok(()) => self.await_match(&mut state, response, check_errors).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => metrics.exchange_success(),
            Err(e) => {
                metrics.exchange_failed();
                debug!(error = %e, "Exchange failed");
            }
        }
        result
    }

    /// Send `request` without waiting for a response
    #[instrument(skip(self, request), fields(command = command_name(request.expected_command())))]
    pub async fn send_only(&self, request: &mut SmbPacket) -> Result<()> {
        let mut state = self.state.lock().await;
        self.transmit(&mut state, request).await
    }

    /// Wait for a further response to `command`, for replies split over
    /// several packets
    #[instrument(skip(self, response), fields(command = command_name(command)))]
    pub async fn receive_response(
        &self,
        response: &mut SmbPacket,
        command: u8,
        check_errors: bool,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        response.reset();
        response.expect_command(command);
        self.await_match(&mut state, response, check_errors).await
    }

    /// Wait up to `wait` for one unsolicited packet and hand it to the sink.
    ///
    /// Returns `Ok(false)` when nothing arrived in time.
    pub async fn receive_async(&self, packet: &mut SmbPacket, wait: Duration) -> Result<bool> {
        let mut state = self.state.lock().await;
        packet.reset();

        let len = match with_timeout(wait, state.transport.receive(packet.as_bytes_mut())).await {
            Err(ProtocolError::Timeout) => return Ok(false),
            Err(e) => return Err(e),
            Ok(received) => received?,
        };

        self.check_receive_length(len)?;
        packet.expect_command(packet.command());
        global_metrics().async_diverted();
        debug!(command = command_name(packet.command()), len, "Received async packet");
        self.sink.process_async_response(packet);
        Ok(true)
    }

    /// [`SmbSession::receive_async`] with the configured poll interval
    pub async fn poll_async(&self, packet: &mut SmbPacket) -> Result<bool> {
        self.receive_async(packet, self.async_poll_timeout).await
    }

    /// Shut down the underlying transport
    pub async fn close(&self) -> Result<()> {
        self.state.lock().await.transport.close().await
    }

    fn prepare(&self, state: &mut SessionState<T>, request: &mut SmbPacket) -> Result<()> {
        if request.multiplex_id() == 0 {
            request.set_multiplex_id(1);
        }
        request.set_process_id(self.process_id);
        request.set_user_id(self.user_id());

        if let Some(signer) = &state.signer {
            request.set_flags2(request.flags2() | flags2::SECURITY_SIGNATURE);
            let signature = signer.sign(request.message()?, state.sign_seq);
            request.set_signature_bytes(&signature);
            state.sign_seq = state.sign_seq.wrapping_add(1);
        }
        Ok(())
    }

    async fn transmit(&self, state: &mut SessionState<T>, request: &mut SmbPacket) -> Result<()> {
        self.prepare(state, request)?;

        let len = request.total_length();
        let frame = request.frame_mut()?;
        if let Err(e) = state.transport.send(frame).await {
            global_metrics().connection_error();
            return Err(e);
        }

        let now = Instant::now();
        request.mark_sent(now);
        state.last_tx = Some(now);
        global_metrics().message_sent(len as u64);
        debug!(len, mid = request.multiplex_id(), "Request sent");
        Ok(())
    }

    async fn await_match(
        &self,
        state: &mut SessionState<T>,
        response: &mut SmbPacket,
        check_errors: bool,
    ) -> Result<()> {
        let expected = response.expected_command();

        loop {
            let received = with_timeout(
                self.response_timeout,
                state.transport.receive(response.as_bytes_mut()),
            )
            .await
            .and_then(|r| r);

            let len = match received {
                Ok(len) => len,
                Err(e) => {
                    if e.is_transport_failure() {
                        global_metrics().connection_error();
                    }
                    return Err(e);
                }
            };

            self.check_receive_length(len)?;

            if response.command() != expected {
                global_metrics().async_diverted();
                warn!(
                    command = command_name(response.command()),
                    expected = command_name(expected),
                    mid = response.multiplex_id(),
                    "Diverting asynchronous response"
                );
                self.sink.process_async_response(response);
                continue;
            }

            if let Some(signer) = &state.signer {
                let seq = state.sign_seq;
                state.sign_seq = seq.wrapping_add(1);

                if self.verify_received {
                    let message = packer::get_bytes(response.as_bytes(), HEADER_LEN, len)?;
                    if !signer.verify(message, seq) {
                        global_metrics().signature_failure();
                        warn!(sequence = seq, "Response signature verification failed");
                        return Err(ProtocolError::SignatureMismatch);
                    }
                }
            }

            if self.dump_packets {
                trace!("{}", response.dump());
            }

            if check_errors {
                if let Err(e) = response.check_for_error() {
                    global_metrics().protocol_error();
                    return Err(e);
                }
            }
            return Ok(());
        }
    }

    fn check_receive_length(&self, len: usize) -> Result<()> {
        let metrics = global_metrics();
        metrics.message_received(len as u64);
        if len < MIN_RX_LEN {
            metrics.short_receive();
            warn!(len, "Short SMB receive");
            return Err(ProtocolError::ShortReceive(len));
        }
        Ok(())
    }
}

//! End-to-end exchange tests against an in-memory SMB server
//!
//! The server side speaks NetBIOS framing through `Framed<_, NetbiosCodec>`
//! over a `tokio::io::duplex` pipe; the client uses the real
//! `NetbiosTransport` and `SmbSession`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use smb_protocol::config::SmbConfig;
use smb_protocol::core::codec::{NetbiosCodec, KEEP_ALIVE_FRAME, MAX_FRAME_SIZE};
use smb_protocol::core::command;
use smb_protocol::core::packet::{flags, flags2, SmbPacket};
use smb_protocol::core::status::NT_OBJECT_NAME_NOT_FOUND;
use smb_protocol::error::ProtocolError;
use smb_protocol::protocol::exchange::SmbSession;
use smb_protocol::protocol::signing::{HmacSigner, SigningProvider};
use smb_protocol::transport::NetbiosTransport;
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

type Server = Framed<DuplexStream, NetbiosCodec>;
type Client = SmbSession<NetbiosTransport<DuplexStream>>;

fn setup(config: &SmbConfig) -> (Client, Server, mpsc::UnboundedReceiver<SmbPacket>) {
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let transport = NetbiosTransport::new(client_io, MAX_FRAME_SIZE);
    let (tx, rx) = mpsc::unbounded_channel();
    let session = SmbSession::new(transport, Arc::new(tx), config);
    (session, Framed::new(server_io, NetbiosCodec::default()), rx)
}

fn config() -> SmbConfig {
    SmbConfig::default_with_overrides(|c| c.client.response_timeout = Duration::from_secs(2))
}

async fn next_request(server: &mut Server) -> SmbPacket {
    let frame = server.next().await.unwrap().unwrap();
    SmbPacket::from_bytes(&frame).unwrap()
}

fn response_to(req: &SmbPacket) -> SmbPacket {
    let mut resp = SmbPacket::new();
    resp.set_command(req.command());
    resp.set_flags(flags::RESPONSE);
    resp.set_multiplex_id(req.multiplex_id());
    resp.set_process_id(req.process_id());
    resp.set_user_id(req.user_id());
    resp
}

fn unsolicited(cmd: u8) -> SmbPacket {
    let mut pkt = SmbPacket::new();
    pkt.set_command(cmd);
    pkt.set_multiplex_id(0xFFFF);
    pkt
}

async fn send(server: &mut Server, pkt: &SmbPacket) {
    let bytes = Bytes::copy_from_slice(pkt.message().unwrap());
    server.send(bytes).await.unwrap();
}

fn echo_request(data: &[u8]) -> SmbPacket {
    let mut req = SmbPacket::new();
    req.set_command(command::ECHO);
    req.set_parameter_count(1);
    req.set_parameter(0, 1).unwrap();
    req.set_bytes(data).unwrap();
    req
}

#[tokio::test]
async fn test_echo_with_oplock_break_and_keep_alive() {
    let (session, mut server, mut rx) = setup(&config());

    let server_task = tokio::spawn(async move {
        let req = next_request(&mut server).await;
        assert_eq!(req.command(), command::ECHO);
        assert_eq!(req.bytes().unwrap(), b"hello");

        server.get_mut().write_all(&KEEP_ALIVE_FRAME).await.unwrap();
        send(&mut server, &unsolicited(command::LOCKING_ANDX)).await;

        let mut resp = response_to(&req);
        resp.set_parameter_count(1);
        resp.set_parameter(0, 1).unwrap();
        resp.set_bytes(req.bytes().unwrap()).unwrap();
        send(&mut server, &resp).await;
        server
    });

    let mut req = echo_request(b"hello");
    let mut resp = SmbPacket::new();
    session.exchange(&mut req, &mut resp, true).await.unwrap();

    assert_eq!(resp.command(), command::ECHO);
    assert_eq!(resp.bytes().unwrap(), b"hello");
    assert_eq!(resp.multiplex_id(), 1);

    let oplock_break = rx.try_recv().unwrap();
    assert_eq!(oplock_break.command(), command::LOCKING_ANDX);
    assert_eq!(oplock_break.multiplex_id(), 0xFFFF);

    server_task.await.unwrap();
}

#[tokio::test]
async fn test_nt_status_error_over_the_wire() {
    let (session, mut server, _rx) = setup(&config());

    tokio::spawn(async move {
        let req = next_request(&mut server).await;
        let mut resp = response_to(&req);
        resp.set_flags2(flags2::LONG_ERROR_CODE);
        resp.set_long_error_code(NT_OBJECT_NAME_NOT_FOUND);
        send(&mut server, &resp).await;
        server
    });

    let mut req = SmbPacket::new();
    req.set_command(command::NT_CREATE_ANDX);
    let mut resp = SmbPacket::new();
    let err = session.exchange(&mut req, &mut resp, true).await.unwrap_err();

    assert!(matches!(err, ProtocolError::NtStatus(0xC000_0034)));
    assert!(err.smb_status().unwrap().is_not_found());
}

#[tokio::test]
async fn test_connection_closed_while_waiting() {
    let (session, mut server, _rx) = setup(&config());

    tokio::spawn(async move {
        let _ = next_request(&mut server).await;
        drop(server);
    });

    let mut req = echo_request(b"x");
    let mut resp = SmbPacket::new();
    let err = session.exchange(&mut req, &mut resp, true).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
    assert!(err.is_transport_failure());
}

#[tokio::test]
async fn test_signed_session_end_to_end() {
    let key = b"negotiated-session-key";
    let (session, mut server, _rx) = setup(&config());
    session
        .enable_signing(Arc::new(HmacSigner::new(key).unwrap()), 0)
        .await;

    let server_task = tokio::spawn(async move {
        let signer = HmacSigner::new(key).unwrap();
        for round in 0..2u32 {
            let frame = server.next().await.unwrap().unwrap();
            let req = SmbPacket::from_bytes(&frame).unwrap();
            assert!(req.has_security_signature());
            assert!(signer.verify(&frame, round * 2));

            let mut resp = response_to(&req);
            resp.set_flags2(flags2::SECURITY_SIGNATURE);
            let sig = signer.sign(resp.message().unwrap(), round * 2 + 1);
            resp.set_signature_bytes(&sig);
            send(&mut server, &resp).await;
        }
        server
    });

    for _ in 0..2 {
        let mut req = echo_request(b"signed");
        let mut resp = SmbPacket::new();
        session.exchange(&mut req, &mut resp, true).await.unwrap();
    }
    assert_eq!(session.signing_sequence().await, 4);
    server_task.await.unwrap();
}

#[tokio::test]
async fn test_tampered_response_rejected() {
    let key = b"negotiated-session-key";
    let (session, mut server, _rx) = setup(&config());
    session
        .enable_signing(Arc::new(HmacSigner::new(key).unwrap()), 0)
        .await;

    tokio::spawn(async move {
        let signer = HmacSigner::new(key).unwrap();
        let req = next_request(&mut server).await;
        let mut resp = response_to(&req);
        resp.set_bytes(b"original").unwrap();
        let sig = signer.sign(resp.message().unwrap(), 1);
        resp.set_signature_bytes(&sig);
        resp.set_bytes(b"modified").unwrap();
        send(&mut server, &resp).await;
        server
    });

    let mut req = echo_request(b"x");
    let mut resp = SmbPacket::new();
    let err = session.exchange(&mut req, &mut resp, true).await.unwrap_err();
    assert!(matches!(err, ProtocolError::SignatureMismatch));
}

#[tokio::test]
async fn test_concurrent_exchanges_are_serialized() {
    let (session, mut server, _rx) = setup(&config());
    let session = Arc::new(session);

    let server_task = tokio::spawn(async move {
        for _ in 0..8 {
            let req = next_request(&mut server).await;
            let mut resp = response_to(&req);
            resp.set_bytes(req.bytes().unwrap()).unwrap();
            send(&mut server, &resp).await;
        }
        server
    });

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..8u8 {
        let session = session.clone();
        tasks.spawn(async move {
            let mut req = echo_request(&[i; 4]);
            req.set_multiplex_id(session.next_multiplex_id());
            let mut resp = SmbPacket::new();
            session.exchange(&mut req, &mut resp, true).await.unwrap();
            assert_eq!(resp.multiplex_id(), req.multiplex_id());
            assert_eq!(resp.bytes().unwrap(), &[i; 4]);
        });
    }

    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }
    server_task.await.unwrap();
}

#[tokio::test]
async fn test_send_only_then_poll_async() {
    let (session, mut server, mut rx) = setup(&config());

    let mut cancel = SmbPacket::new();
    cancel.set_command(command::NT_CANCEL);
    session.send_only(&mut cancel).await.unwrap();

    let req = next_request(&mut server).await;
    assert_eq!(req.command(), command::NT_CANCEL);
    assert!(session.last_send_time().await.is_some());

    let mut pkt = SmbPacket::new();
    assert!(!session
        .receive_async(&mut pkt, Duration::from_millis(20))
        .await
        .unwrap());

    send(&mut server, &unsolicited(command::NT_TRANSACT)).await;
    assert!(session
        .receive_async(&mut pkt, Duration::from_secs(1))
        .await
        .unwrap());
    assert_eq!(rx.try_recv().unwrap().command(), command::NT_TRANSACT);
}

#[tokio::test]
async fn test_configured_buffer_size_bounds_responses() {
    let config = SmbConfig::default_with_overrides(|c| {
        c.client.response_timeout = Duration::from_secs(2);
        c.client.buffer_size = 8192;
    });
    let (session, mut server, _rx) = setup(&config);

    tokio::spawn(async move {
        for _ in 0..2 {
            let req = next_request(&mut server).await;
            let mut resp = SmbPacket::with_capacity(8192).unwrap();
            resp.set_command(req.command());
            resp.set_flags(flags::RESPONSE);
            resp.set_multiplex_id(req.multiplex_id());
            resp.set_bytes(&[0x5A; 6000]).unwrap();
            send(&mut server, &resp).await;
        }
        server
    });

    let mut resp = session.new_packet().unwrap();
    assert_eq!(resp.capacity(), 8192);
    let mut req = echo_request(b"big");
    session.exchange(&mut req, &mut resp, true).await.unwrap();
    assert_eq!(resp.bytes().unwrap().len(), 6000);

    // A default-sized packet cannot hold the same reply
    let mut small = SmbPacket::new();
    let mut req = echo_request(b"big");
    let err = session.exchange(&mut req, &mut small, true).await.unwrap_err();
    assert!(matches!(err, ProtocolError::OversizedPacket(_)));
}

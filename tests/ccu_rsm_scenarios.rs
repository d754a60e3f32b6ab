//! End-to-end scenario tests against real ports on loopback, one per
//! testable property in SPEC_FULL.md's "Testable Properties" section:
//! happy init, LAK mismatch, control-failure injection, warning-on-confirm,
//! keep-alive timeout, disconnect-after-N, and message-number wrap.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;

use radar_link_emu::ccu::link::{Link, LinkStatus};
use radar_link_emu::ccu::receiver::TaggedMessage;
use radar_link_emu::ccu::sender::{CcuRequest, SendTracker};
use radar_link_emu::ccu::sequencer::Sequencer;
use radar_link_emu::ccu::{receiver as ccu_receiver, sender as ccu_sender};
use radar_link_emu::cli::RadarMode;
use radar_link_emu::config::RsmInstanceSettings;
use radar_link_emu::protocol::{Body, Direction, Header, Message, HEADER_LEN};
use radar_link_emu::queue::Queue;
use radar_link_emu::rsm::sender::RsmRequest;
use radar_link_emu::rsm::{listener, sender as rsm_sender, Instance};
use radar_link_emu::transport::tcp_connect;

fn settings(id: usize, port: u16, lak: u8) -> RsmInstanceSettings {
    RsmInstanceSettings {
        id,
        port,
        lak,
        simulate_control_failure: false,
        disconnect_after_messages: -1,
        simulate_response_timeout: false,
        send_warning_on_confirm: false,
        warning_tks: 0,
    }
}

async fn spawn_rsm(settings: RsmInstanceSettings) -> watch::Sender<bool> {
    let port = settings.port;
    let instance = Instance::new(settings);
    let outgoing: std::sync::Arc<Queue<RsmRequest>> = Queue::new(10);
    tokio::spawn(rsm_sender::run(outgoing.clone(), std::sync::Arc::new(vec![instance.clone()])));
    let (tx, rx) = watch::channel(false);
    tokio::spawn(listener::run(instance, outgoing, rx));
    // Bind happens at the top of listener::run; give it a moment to listen.
    for _ in 0..50 {
        if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    tx
}

async fn send_message(stream: &mut TcpStream, message: &Message) {
    let bytes = message.encode().unwrap();
    stream.write_all(&bytes).await.unwrap();
}

async fn recv_message(stream: &mut TcpStream) -> Message {
    let mut header_bytes = [0u8; HEADER_LEN];
    stream.read_exact(&mut header_bytes).await.unwrap();
    let header = Header::parse(&header_bytes).unwrap();
    let mut body_bytes = vec![0u8; header.body_length as usize];
    stream.read_exact(&mut body_bytes).await.unwrap();
    Message::decode_from_parts(&header, &body_bytes).unwrap()
}

#[tokio::test]
async fn happy_init_returns_matching_confirm() {
    let shutdown = spawn_rsm(settings(0, 18101, 0x08)).await;
    let mut stream = TcpStream::connect(("127.0.0.1", 18101)).await.unwrap();

    send_message(
        &mut stream,
        &Message::new(
            0x08,
            Direction::CcuToRsm,
            0,
            Body::InitChannel { lauvm: 0x01, lak: 0x08 },
        ),
    )
    .await;

    let response = recv_message(&mut stream).await;
    assert_eq!(response.direction, Direction::RsmToCcu);
    match response.body {
        Body::ConfirmInit { lak, .. } => assert_eq!(lak, 0x08),
        other => panic!("expected ConfirmInit, got {other:?}"),
    }

    let _ = shutdown.send(true);
}

#[tokio::test]
async fn lak_mismatch_fails_startup_and_marks_link_failed() {
    // A stub RSM that always echoes LAK 0x08, regardless of what is
    // requested — the real RSM adopts the caller's LAK (matching
    // svm_handlers.c's InitChannel handler exactly), so a mismatch can
    // only arise against an RSM that behaves differently. This test
    // exercises the CCU's mismatch-detection path against such a peer.
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 18102)).await.unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut header_bytes = [0u8; HEADER_LEN];
        stream.read_exact(&mut header_bytes).await.unwrap();
        let header = Header::parse(&header_bytes).unwrap();
        let mut body_bytes = vec![0u8; header.body_length as usize];
        stream.read_exact(&mut body_bytes).await.unwrap();

        let response = Message::new(
            0x08,
            Direction::RsmToCcu,
            0,
            Body::ConfirmInit {
                lak: 0x08,
                slp: 0x03,
                vdr: 0x10,
                vor1: 0x11,
                vor2: 0x12,
                bcb: 0,
            },
        );
        stream.write_all(&response.encode().unwrap()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let transport = tcp_connect("127.0.0.1", 18102).await.unwrap();
    let (recv_half, send_half) = transport.split();

    let link = Link::new(0, 18102, 0x09);
    *link.send_half.lock().await = Some(send_half);
    link.set_status(LinkStatus::Connecting).await;

    let requests: std::sync::Arc<Queue<CcuRequest>> = Queue::new(10);
    let responses: std::sync::Arc<Queue<TaggedMessage>> = Queue::new(10);
    let tracker = SendTracker::new();
    let links = std::sync::Arc::new(vec![link.clone()]);

    tokio::spawn(ccu_sender::run(requests.clone(), links.clone(), tracker.clone()));
    tokio::spawn(ccu_receiver::run(link.clone(), recv_half, responses.clone()));

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let events = radar_link_emu::ccu::status::run(0, links.clone(), shutdown_rx).await;
    let mut sequencer = Sequencer::new(links.clone(), requests, responses, tracker, events);

    let result = sequencer.run_startup(&link, RadarMode::Dr).await;
    assert!(result.is_err(), "expected LAK mismatch to fail startup");
    assert_eq!(link.status().await, LinkStatus::Failed);
}

#[tokio::test]
async fn control_failure_injection_reports_rsk_failure() {
    let mut cfg = settings(0, 18103, 0x08);
    cfg.simulate_control_failure = true;
    let shutdown = spawn_rsm(cfg).await;
    let mut stream = TcpStream::connect(("127.0.0.1", 18103)).await.unwrap();

    send_message(
        &mut stream,
        &Message::new(0x08, Direction::CcuToRsm, 0, Body::InitChannel { lauvm: 0x01, lak: 0x08 }),
    )
    .await;
    recv_message(&mut stream).await;

    send_message(
        &mut stream,
        &Message::new(0x08, Direction::CcuToRsm, 1, Body::ProvestiControl { tk: 0x01 }),
    )
    .await;
    let confirm = recv_message(&mut stream).await;
    assert!(matches!(confirm.body, Body::ControlConfirm { tk: 0x01, .. }));

    send_message(
        &mut stream,
        &Message::new(0x08, Direction::CcuToRsm, 2, Body::VydatControlResults { vrk: 0x0F }),
    )
    .await;
    let results = recv_message(&mut stream).await;
    match results.body {
        Body::ControlResults { rsk, .. } => assert_eq!(rsk, 0x3E),
        other => panic!("expected ControlResults, got {other:?}"),
    }

    let _ = shutdown.send(true);
}

#[tokio::test]
async fn warning_on_confirm_sends_bonus_warning_after_confirm_init() {
    let mut cfg = settings(0, 18104, 0x08);
    cfg.send_warning_on_confirm = true;
    cfg.warning_tks = 0x05;
    let shutdown = spawn_rsm(cfg).await;
    let mut stream = TcpStream::connect(("127.0.0.1", 18104)).await.unwrap();

    send_message(
        &mut stream,
        &Message::new(0x08, Direction::CcuToRsm, 0, Body::InitChannel { lauvm: 0x01, lak: 0x08 }),
    )
    .await;

    let first = recv_message(&mut stream).await;
    assert!(matches!(first.body, Body::ConfirmInit { .. }));

    let second = recv_message(&mut stream).await;
    match second.body {
        Body::Warning { tks, .. } => assert_eq!(tks, 0x05),
        other => panic!("expected Warning, got {other:?}"),
    }

    let _ = shutdown.send(true);
}

#[tokio::test]
async fn disconnect_after_messages_closes_connection_after_threshold() {
    let mut cfg = settings(0, 18105, 0x08);
    cfg.disconnect_after_messages = 3;
    let shutdown = spawn_rsm(cfg).await;
    let mut stream = TcpStream::connect(("127.0.0.1", 18105)).await.unwrap();

    send_message(
        &mut stream,
        &Message::new(0x08, Direction::CcuToRsm, 0, Body::InitChannel { lauvm: 0x01, lak: 0x08 }),
    )
    .await;
    recv_message(&mut stream).await;

    send_message(
        &mut stream,
        &Message::new(0x08, Direction::CcuToRsm, 1, Body::ProvestiControl { tk: 0x01 }),
    )
    .await;
    recv_message(&mut stream).await;

    send_message(
        &mut stream,
        &Message::new(0x08, Direction::CcuToRsm, 2, Body::VydatLineState),
    )
    .await;
    recv_message(&mut stream).await;

    let mut buf = [0u8; 1];
    let n = stream.read(&mut buf).await.unwrap();
    assert_eq!(n, 0, "connection should be closed after the 3rd response");

    let _ = shutdown.send(true);
}

#[tokio::test]
async fn message_number_wraps_at_2048_without_protocol_error() {
    let shutdown = spawn_rsm(settings(0, 18106, 0x08)).await;
    let mut stream = TcpStream::connect(("127.0.0.1", 18106)).await.unwrap();

    for n in 0..2049u32 {
        let message = Message::new(
            0x08,
            Direction::CcuToRsm,
            (n % 2048) as u16,
            Body::NavigationData { payload: vec![n as u8] },
        );
        send_message(&mut stream, &message).await;
    }

    send_message(
        &mut stream,
        &Message::new(0x08, Direction::CcuToRsm, 0, Body::InitChannel { lauvm: 0x01, lak: 0x08 }),
    )
    .await;
    let response = recv_message(&mut stream).await;
    assert!(matches!(response.body, Body::ConfirmInit { .. }), "connection must survive wraparound");

    let _ = shutdown.send(true);
}

#[tokio::test]
async fn keepalive_watchdog_fails_silent_link() {
    let link = Link::new(0, 18107, 0x08);
    link.set_status(LinkStatus::Active).await;
    {
        let mut state = link.state.lock().await;
        state.last_activity = std::time::Instant::now() - Duration::from_secs(61);
    }

    let requests: std::sync::Arc<Queue<CcuRequest>> = Queue::new(10);
    let responses: std::sync::Arc<Queue<TaggedMessage>> = Queue::new(10);
    let tracker = SendTracker::new();
    let links = std::sync::Arc::new(vec![link.clone()]);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let events = radar_link_emu::ccu::status::run(0, links.clone(), shutdown_rx.clone()).await;
    let mut sequencer = Sequencer::new(links, requests, responses, tracker, events);

    let handle = tokio::spawn(async move { sequencer.run_steady_state(shutdown_rx).await });
    tokio::time::sleep(Duration::from_millis(1200)).await;
    let _ = shutdown_tx.send(true);
    let _ = handle.await;

    assert_eq!(link.status().await, LinkStatus::Failed);
}

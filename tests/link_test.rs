//! End-to-end session tests against a loopback receiver.
//!
//! The receiver side of the wire contract is played by a plain
//! `TcpListener`; every test drives the public handle API the way the
//! binary does.

use std::sync::Arc;
use std::time::{Duration, Instant};

use steerlink::config::LinkConfig;
use steerlink::control::{ControlState, InputProcessor, InputSettings};
use steerlink::link::frame::{Command, ControlFrame, FRAME_LEN};
use steerlink::link::{LinkError, LinkHandle, LinkStatus};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::watch;
use tokio::time::timeout;

fn loopback_config(port: u16) -> LinkConfig {
    LinkConfig {
        host: "127.0.0.1".to_string(),
        port,
        connect_timeout_ms: 1000,
        tick_interval_ms: 20,
    }
}

async fn wait_for_disconnect(status_rx: &mut watch::Receiver<LinkStatus>) {
    let deadline = Duration::from_secs(5);
    timeout(deadline, async {
        loop {
            if *status_rx.borrow_and_update() == LinkStatus::Disconnected {
                break;
            }
            if status_rx.changed().await.is_err() {
                break;
            }
        }
    })
    .await
    .expect("session never reported Disconnected");
}

#[tokio::test]
async fn session_streams_current_state_to_receiver() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let shared = Arc::new(ControlState::new());
    let input = InputProcessor::new(shared.clone(), InputSettings::default());
    // raw (0.1, -0.5) scales to (0.25, -1.25); x is inside the deadzone
    input.submit_orientation(0.1, -0.5);
    input.set_accelerate(true);

    let (status_tx, status_rx) = watch::channel(LinkStatus::default());
    let mut handle = LinkHandle::connect(loopback_config(port), shared, status_tx)
        .await
        .unwrap();
    assert_eq!(*status_rx.borrow(), LinkStatus::Connected);

    let (mut peer, _) = listener.accept().await.unwrap();

    let mut buf = [0u8; FRAME_LEN];
    peer.read_exact(&mut buf).await.unwrap();
    assert_eq!(
        buf,
        [0x00, 0x77, 0x00, 0x00, 0x00, 0x00, 0xBF, 0xA0, 0x00, 0x00]
    );
    let frame = ControlFrame::decode(&buf).unwrap();
    assert_eq!(frame.command, Command::Accelerate);
    assert_eq!(frame.steering_x, 0.0);
    assert_eq!(frame.steering_y, -1.25);

    // a state change must reach the wire in a later frame, brake wins
    // over the still-held accelerator
    input.set_brake(true);
    let mut saw_brake = false;
    for _ in 0..50 {
        peer.read_exact(&mut buf).await.unwrap();
        if ControlFrame::decode(&buf).unwrap().command == Command::Brake {
            saw_brake = true;
            break;
        }
    }
    assert!(saw_brake, "brake command never reached the receiver");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn frames_are_paced_not_batched() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let shared = Arc::new(ControlState::new());
    let (status_tx, _status_rx) = watch::channel(LinkStatus::default());
    let mut handle = LinkHandle::connect(loopback_config(port), shared, status_tx)
        .await
        .unwrap();

    let (mut peer, _) = listener.accept().await.unwrap();

    let mut buf = [0u8; FRAME_LEN];
    peer.read_exact(&mut buf).await.unwrap();
    let start = Instant::now();
    for _ in 0..5 {
        peer.read_exact(&mut buf).await.unwrap();
    }
    let elapsed = start.elapsed();

    // five further reads span at least four full tick periods even when
    // the first read lands mid-interval
    assert!(
        elapsed >= Duration::from_millis(80),
        "5 frames arrived in {:?}",
        elapsed
    );

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn peer_close_terminates_the_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let shared = Arc::new(ControlState::new());
    let (status_tx, mut status_rx) = watch::channel(LinkStatus::default());
    let mut handle = LinkHandle::connect(loopback_config(port), shared, status_tx)
        .await
        .unwrap();

    let (peer, _) = listener.accept().await.unwrap();
    drop(peer);

    wait_for_disconnect(&mut status_rx).await;

    match handle.shutdown().await {
        Err(LinkError::TransmissionError(_)) => {}
        other => panic!("expected transmission error, got {:?}", other),
    }
}

#[tokio::test]
async fn connect_to_closed_port_reports_failure() {
    // bind and drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let shared = Arc::new(ControlState::new());
    let (status_tx, status_rx) = watch::channel(LinkStatus::default());
    let result = LinkHandle::connect(loopback_config(port), shared, status_tx).await;

    match result {
        Err(LinkError::ConnectionError(_)) => {}
        other => panic!("expected connection error, got {:?}", other),
    }
    match &*status_rx.borrow() {
        LinkStatus::Failed(_) => {}
        other => panic!("expected failed status, got {:?}", other),
    };
}

#[tokio::test]
async fn zero_tick_interval_is_rejected_without_a_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let config = LinkConfig {
        host: "127.0.0.1".to_string(),
        port,
        connect_timeout_ms: 1000,
        tick_interval_ms: 0,
    };
    let shared = Arc::new(ControlState::new());
    let (status_tx, status_rx) = watch::channel(LinkStatus::default());

    match LinkHandle::connect(config, shared, status_tx).await {
        Err(LinkError::InitializationError(_)) => {}
        other => panic!("expected initialization error, got {:?}", other),
    }

    // rejected before anything ran: no session, no status transition
    assert_eq!(*status_rx.borrow(), LinkStatus::Disconnected);
}

#[tokio::test]
async fn connect_timeout_is_bounded() {
    // A listener with a saturated accept backlog leaves further connects
    // hanging in SYN retry instead of refusing them, which is exactly the
    // silent-receiver case the timeout exists for.
    let socket = TcpSocket::new_v4().unwrap();
    socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let listener = socket.listen(1).unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut parked = Vec::new();
    for _ in 0..64 {
        match timeout(
            Duration::from_millis(100),
            TcpStream::connect(("127.0.0.1", port)),
        )
        .await
        {
            Ok(Ok(stream)) => parked.push(stream),
            // backlog is full once connects stop completing
            _ => break,
        }
    }

    let config = LinkConfig {
        host: "127.0.0.1".to_string(),
        port,
        connect_timeout_ms: 250,
        tick_interval_ms: 20,
    };
    let shared = Arc::new(ControlState::new());
    let (status_tx, status_rx) = watch::channel(LinkStatus::default());

    let started = Instant::now();
    let result = LinkHandle::connect(config, shared, status_tx).await;
    let elapsed = started.elapsed();

    match result {
        Err(LinkError::TimeoutError(ms)) => assert_eq!(ms, 250),
        other => panic!("expected timeout, got {:?}", other),
    }
    assert!(elapsed >= Duration::from_millis(250));
    assert!(
        elapsed < Duration::from_secs(2),
        "timeout returned only after {:?}",
        elapsed
    );
    assert_eq!(*status_rx.borrow(), LinkStatus::TimedOut);

    drop(parked);
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let shared = Arc::new(ControlState::new());
    let (status_tx, mut status_rx) = watch::channel(LinkStatus::default());
    let mut handle = LinkHandle::connect(loopback_config(port), shared, status_tx)
        .await
        .unwrap();
    let (_peer, _) = listener.accept().await.unwrap();

    handle.shutdown().await.unwrap();
    wait_for_disconnect(&mut status_rx).await;

    // a second shutdown has nothing left to do and must not fail
    handle.shutdown().await.unwrap();
}

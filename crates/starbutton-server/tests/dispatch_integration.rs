//! End-to-end tests: a real `DispatchServer` on an ephemeral localhost port,
//! driven by plain std `UdpSocket` clients.

use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::{Duration, Instant};

use starbutton_core::{decode_packet, protocol::MouseButton, Packet, PacketId, PacketType, Point};
use starbutton_server::application::{
    drag_loop::{DragLoopController, DragTimings, LoopRunState},
    emulate_input::PlatformInputEmulator,
    events::{DiscoveryState, EventSink, ServerEvent, ServerStatus},
    ports::BrowserTrigger,
};
use starbutton_server::infrastructure::{
    discovery::NoopAdvertiser,
    input_emulation::mock::{InputCall, MockInputEmulator},
    network::{DispatchServer, ServerConfig, ServerDeps},
};

const CAPTURE_SRC: &[u8] = br#"{"type":"CAPTURE_MOUSE_POSITION","payload":"{\"purpose\":\"SRC\"}"}"#;
const CAPTURE_DES: &[u8] = br#"{"type":"CAPTURE_MOUSE_POSITION","payload":"{\"purpose\":\"DES\"}"}"#;
const LOOP_START: &[u8] = br#"{"type":"AUTO_DRAG_LOOP_COMMAND","payload":"{\"action\":\"START\"}"}"#;
const LOOP_STOP: &[u8] = br#"{"type":"AUTO_DRAG_LOOP_COMMAND","payload":"{\"action\":\"STOP\"}"}"#;

// ── Helpers ───────────────────────────────────────────────────────────────────

struct IgnoreBrowser;

impl BrowserTrigger for IgnoreBrowser {
    fn open(&self, _url: &str) {}
}

fn fast_timings() -> DragTimings {
    DragTimings {
        settle: Duration::from_millis(1),
        drag_duration: Duration::from_millis(10),
        post_drag: Duration::from_millis(1),
        loop_interval: Duration::from_millis(5),
        unset_retry: Duration::from_millis(20),
        stop_timeout: Duration::from_secs(1),
    }
}

fn deps_with(emulator: &Arc<MockInputEmulator>, events: EventSink) -> ServerDeps {
    let emulator = Arc::clone(emulator) as Arc<dyn PlatformInputEmulator>;
    ServerDeps {
        drag_loop: Arc::new(DragLoopController::new(Arc::clone(&emulator), fast_timings())),
        emulator,
        browser: Arc::new(IgnoreBrowser),
        advertiser: Arc::new(NoopAdvertiser),
        events,
    }
}

fn localhost_config() -> ServerConfig {
    ServerConfig {
        bind_address: Ipv4Addr::LOCALHOST.into(),
        port: 0,
        worker_capacity: 2,
        read_timeout: Duration::from_millis(50),
        drain_timeout: Duration::from_secs(2),
        ..ServerConfig::default()
    }
}

fn client() -> UdpSocket {
    let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    socket.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    socket
}

fn send(client: &UdpSocket, server: SocketAddr, datagram: &[u8]) {
    client.send_to(datagram, server).unwrap();
}

fn recv_packet(client: &UdpSocket) -> Option<(Instant, Packet)> {
    let mut buf = [0u8; 2048];
    let (len, _) = client.recv_from(&mut buf).ok()?;
    Some((Instant::now(), decode_packet(&buf[..len]).unwrap()))
}

fn wait_for_calls(emulator: &MockInputEmulator, count: usize) -> Vec<(Instant, InputCall)> {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let calls = emulator.timed_calls();
        if calls.len() >= count || Instant::now() > deadline {
            return calls;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// Polls `condition` for up to two seconds.
fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn untimed(calls: Vec<(Instant, InputCall)>) -> Vec<InputCall> {
    calls.into_iter().map(|(_, call)| call).collect()
}

fn start(emulator: &Arc<MockInputEmulator>) -> DispatchServer {
    DispatchServer::start(localhost_config(), deps_with(emulator, EventSink::disabled())).unwrap()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn test_ping_is_answered_with_pong_echoing_packet_id() {
    // Arrange
    let emulator = Arc::new(MockInputEmulator::new());
    let server = start(&emulator);
    let client = client();

    // Act
    let ping = br#"{"type":"HEALTH_CHECK_PING","packetId":"p-1","timestamp":1}"#;
    send(&client, server.local_addr(), ping);

    // Assert
    let (_, pong) = recv_packet(&client).expect("pong expected");
    assert_eq!(pong.packet_type, PacketType::HealthCheckPong);
    assert_eq!(pong.packet_id, Some(PacketId::from("p-1")));
    assert!(pong.timestamp.is_some());
    assert!(emulator.calls().is_empty());
}

#[test]
fn test_macro_command_acks_then_types_shift_a() {
    // Arrange
    let emulator = Arc::new(MockInputEmulator::new());
    let server = start(&emulator);
    let client = client();
    let datagram = br#"{"type":"MACRO_COMMAND","packetId":"42","timestamp":1718000000000,"payload":"{\"type\":\"key_event\",\"key\":\"a\",\"modifiers\":[\"shift\"],\"pressType\":{\"type\":\"tap\"}}"}"#;

    // Act
    let sent_at = Instant::now();
    send(&client, server.local_addr(), datagram);

    // Assert
    let (acked_at, ack) = recv_packet(&client).expect("ack expected");
    assert_eq!(ack.packet_type, PacketType::MacroAck);
    assert_eq!(ack.packet_id, Some(PacketId::from("42")));
    let ack_delay = acked_at - sent_at;
    assert!(ack_delay < Duration::from_millis(50), "ack took {ack_delay:?}");

    let calls = untimed(wait_for_calls(&emulator, 4));
    assert_eq!(
        calls,
        vec![
            InputCall::KeyDown("shift".into()),
            InputCall::KeyDown("a".into()),
            InputCall::KeyUp("a".into()),
            InputCall::KeyUp("shift".into()),
        ]
    );
}

#[test]
fn test_ack_arrives_before_held_key_is_released() {
    // Arrange
    let emulator = Arc::new(MockInputEmulator::new());
    let server = start(&emulator);
    let client = client();
    let datagram = br#"{"type":"MACRO_COMMAND","packetId":7,"payload":{"type":"key_event","key":"w","modifiers":[],"pressType":{"type":"hold","durationMs":300}}}"#;

    // Act
    send(&client, server.local_addr(), datagram);

    // Assert
    let (acked_at, ack) = recv_packet(&client).expect("ack expected");
    assert_eq!(ack.packet_type, PacketType::MacroAck);
    let calls = wait_for_calls(&emulator, 2);
    let (released_at, release) = calls.last().cloned().expect("key release expected");
    assert_eq!(release, InputCall::KeyUp("w".into()));
    assert!(acked_at < released_at);
}

#[test]
fn test_macro_without_packet_id_gets_no_ack_and_no_input() {
    // Arrange
    let emulator = Arc::new(MockInputEmulator::new());
    let server = start(&emulator);
    let client = client();
    client.set_read_timeout(Some(Duration::from_millis(200))).unwrap();

    // Act
    send(
        &client,
        server.local_addr(),
        br#"{"type":"MACRO_COMMAND","payload":"{\"type\":\"key_event\",\"key\":\"a\"}"}"#,
    );

    // Assert
    assert!(recv_packet(&client).is_none());
    assert!(emulator.calls().is_empty());
}

#[test]
fn test_malformed_datagram_does_not_stop_the_server() {
    // Arrange
    let emulator = Arc::new(MockInputEmulator::new());
    let server = start(&emulator);
    let client = client();

    // Act
    send(&client, server.local_addr(), b"\xff\xfe not json");
    send(&client, server.local_addr(), b"{\"type\":");
    send(&client, server.local_addr(), br#"{"type":"HEALTH_CHECK_PING","packetId":"after"}"#);

    // Assert
    let (_, pong) = recv_packet(&client).expect("server must still answer");
    assert_eq!(pong.packet_id, Some(PacketId::from("after")));
}

#[test]
fn test_failing_emulator_still_acks_and_server_keeps_serving() {
    // Arrange
    let emulator = Arc::new(MockInputEmulator::new());
    emulator.set_should_fail(true);
    let server = start(&emulator);
    let client = client();
    let first = br#"{"type":"MACRO_COMMAND","packetId":"f1","payload":"{\"type\":\"key_event\",\"key\":\"a\"}"}"#;
    let second = br#"{"type":"MACRO_COMMAND","packetId":"f2","payload":"{\"type\":\"key_event\",\"key\":\"b\"}"}"#;

    // Act
    send(&client, server.local_addr(), first);
    let (_, first_ack) = recv_packet(&client).expect("ack expected despite emulator failure");
    std::thread::sleep(Duration::from_millis(50));
    emulator.set_should_fail(false);
    send(&client, server.local_addr(), second);

    // Assert
    assert_eq!(first_ack.packet_id, Some(PacketId::from("f1")));
    let (_, second_ack) = recv_packet(&client).expect("server must keep serving");
    assert_eq!(second_ack.packet_id, Some(PacketId::from("f2")));
    assert_eq!(
        untimed(wait_for_calls(&emulator, 2)),
        vec![InputCall::KeyDown("b".into()), InputCall::KeyUp("b".into())]
    );
}

#[test]
fn test_scroll_and_right_click_macros_reach_emulator() {
    // Arrange
    let emulator = Arc::new(MockInputEmulator::new());
    let server = start(&emulator);
    let client = client();

    // Act
    send(
        &client,
        server.local_addr(),
        br#"{"type":"MACRO_COMMAND","packetId":"s","payload":"{\"type\":\"mouse_scroll\",\"direction\":\"DOWN\",\"clicks\":3}"}"#,
    );
    recv_packet(&client).expect("scroll ack");
    wait_for_calls(&emulator, 1);
    send(
        &client,
        server.local_addr(),
        br#"{"type":"MACRO_COMMAND","packetId":"c","payload":"{\"type\":\"mouse_event\",\"button\":\"RIGHT\"}"}"#,
    );
    recv_packet(&client).expect("click ack");

    // Assert
    let calls = untimed(wait_for_calls(&emulator, 3));
    assert_eq!(
        calls,
        vec![
            InputCall::Scroll(-3),
            InputCall::MouseButton(MouseButton::Right, true),
            InputCall::MouseButton(MouseButton::Right, false),
        ]
    );
}

#[test]
fn test_captured_endpoints_survive_server_restart() {
    // Arrange
    let emulator = Arc::new(MockInputEmulator::new());
    let deps = deps_with(&emulator, EventSink::disabled());
    let drag_loop = Arc::clone(&deps.drag_loop);
    let client = client();

    let mut first = DispatchServer::start(localhost_config(), deps.clone()).unwrap();
    emulator.set_cursor(Point::new(10, 20));
    send(&client, first.local_addr(), CAPTURE_SRC);
    assert!(wait_until(|| drag_loop.endpoints().source.is_some()));
    emulator.set_cursor(Point::new(300, 400));
    send(&client, first.local_addr(), CAPTURE_DES);
    assert!(wait_until(|| drag_loop.endpoints().complete().is_some()));

    // Act
    first.shutdown();
    let second = DispatchServer::start(localhost_config(), deps).unwrap();
    send(&client, second.local_addr(), LOOP_START);

    // Assert
    let endpoints = drag_loop.endpoints();
    assert_eq!(endpoints.source, Some(Point::new(10, 20)));
    assert_eq!(endpoints.destination, Some(Point::new(300, 400)));
    let left_down = InputCall::MouseButton(MouseButton::Left, true);
    assert!(wait_until(|| emulator.calls().contains(&left_down)));

    send(&client, second.local_addr(), LOOP_STOP);
    assert!(wait_until(|| drag_loop.run_state() == LoopRunState::Idle));
}

#[tokio::test]
async fn test_status_and_latency_events_are_published() {
    // Arrange
    let emulator = Arc::new(MockInputEmulator::new());
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let deps = deps_with(&emulator, EventSink::new(tx));
    let mut server = DispatchServer::start(localhost_config(), deps).unwrap();
    let addr = server.local_addr();

    // Act
    tokio::task::spawn_blocking(move || {
        let client = client();
        send(
            &client,
            addr,
            br#"{"type":"MACRO_COMMAND","packetId":"lat","payload":"{\"type\":\"key_event\",\"key\":\"space\"}"}"#,
        );
        recv_packet(&client).expect("ack expected");
    })
    .await
    .unwrap();

    // Assert
    let timeout = Duration::from_secs(2);
    let starting = tokio::time::timeout(timeout, rx.recv()).await.unwrap();
    assert_eq!(starting, Some(ServerEvent::Status(ServerStatus::Starting { port: 0 })));
    let running = tokio::time::timeout(timeout, rx.recv()).await.unwrap();
    assert_eq!(
        running,
        Some(ServerEvent::Status(ServerStatus::Running {
            port: addr.port(),
            discovery: DiscoveryState::Disabled,
        }))
    );
    let latency = tokio::time::timeout(timeout, rx.recv()).await.unwrap();
    match latency {
        Some(ServerEvent::Latency(sample)) => {
            assert_eq!(sample.packet_id, Some(PacketId::from("lat")));
            assert_eq!(sample.kind, "key_event");
        }
        other => panic!("expected latency sample, got {other:?}"),
    }

    tokio::task::spawn_blocking(move || server.shutdown()).await.unwrap();
    let stopped = tokio::time::timeout(timeout, rx.recv()).await.unwrap();
    assert_eq!(stopped, Some(ServerEvent::Status(ServerStatus::Stopped)));
}

//! Server events published to an observer (the binary's log loop, a future
//! GUI, or a test).

use std::time::Duration;

use starbutton_core::PacketId;
use tokio::sync::mpsc::UnboundedSender;

/// Whether the service advertisement is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    Active,
    Failed,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    Starting { port: u16 },
    Running { port: u16, discovery: DiscoveryState },
    Stopped,
}

/// Time from datagram receipt to the start of the primary input action.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencySample {
    pub packet_id: Option<PacketId>,
    pub kind: &'static str,
    pub latency: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Status(ServerStatus),
    Latency(LatencySample),
}

/// Optional, non-blocking event publisher.
///
/// Cloning is cheap.  Events sent after the receiver is dropped are discarded.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<UnboundedSender<ServerEvent>>,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<ServerEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that drops every event.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: ServerEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn status(&self, status: ServerStatus) {
        self.emit(ServerEvent::Status(status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_delivers_to_receiver() {
        // Arrange
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = EventSink::new(tx);

        // Act
        sink.status(ServerStatus::Stopped);

        // Assert
        assert_eq!(rx.try_recv().unwrap(), ServerEvent::Status(ServerStatus::Stopped));
    }

    #[test]
    fn test_emit_after_receiver_dropped_is_ignored() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = EventSink::new(tx);
        drop(rx);

        sink.status(ServerStatus::Starting { port: 5005 });
    }

    #[test]
    fn test_cloned_sinks_share_one_receiver_in_order() {
        // Arrange
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = EventSink::new(tx);
        let clone = sink.clone();

        // Act
        sink.status(ServerStatus::Starting { port: 1 });
        clone.emit(ServerEvent::Latency(LatencySample {
            packet_id: None,
            kind: "key_event",
            latency: Duration::from_millis(3),
        }));
        drop((sink, clone));

        // Assert
        let first = tokio_test::block_on(rx.recv());
        let second = tokio_test::block_on(rx.recv());
        assert_eq!(first, Some(ServerEvent::Status(ServerStatus::Starting { port: 1 })));
        assert!(matches!(second, Some(ServerEvent::Latency(s)) if s.kind == "key_event"));
        assert_eq!(tokio_test::block_on(rx.recv()), None);
    }

    #[test]
    fn test_disabled_sink_accepts_events() {
        EventSink::disabled().status(ServerStatus::Stopped);
    }
}

//! PacketDispatcher: the per-packet protocol.
//!
//! Called on the receive thread for every decoded packet.  Replies go out
//! through a [`ReplySink`] so the protocol can be tested without sockets.
//!
//! | Type                     | Needs id | Reply               | Work                        |
//! |--------------------------|----------|---------------------|-----------------------------|
//! | `HEALTH_CHECK_PING`      | yes      | `HEALTH_CHECK_PONG` | none                        |
//! | `MACRO_COMMAND`          | yes      | `MACRO_ACK` first   | action on the worker pool   |
//! | `TRIGGER_IMPORT_BROWSER` | no       | none                | open the URL                |
//! | `CAPTURE_MOUSE_POSITION` | no       | none                | capture a drag endpoint     |
//! | `AUTO_DRAG_LOOP_COMMAND` | no       | none                | start or stop the drag loop |
//!
//! Anything else is logged and ignored.  Every failure is confined to its
//! packet.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use starbutton_core::{
    encode_packet,
    protocol::{BrowserRequest, CaptureRequest, LoopCommand, LoopCommandRequest},
    Action, DecodeError, Packet, PacketId, PacketType,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::drag_loop::DragLoopController;
use super::execute_action::{ActionExecutor, RequestContext};
use super::ports::BrowserTrigger;
use super::worker_pool::{PoolError, WorkerPool};

/// Destination for reply datagrams.
pub trait ReplySink {
    fn send_reply(&self, datagram: &[u8], dest: SocketAddr) -> io::Result<usize>;
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{packet_type} packet is missing required field {field}")]
    ProtocolViolation {
        packet_type: PacketType,
        field: &'static str,
    },
    #[error(transparent)]
    Payload(#[from] DecodeError),
    #[error("could not queue macro: {0}")]
    Pool(#[from] PoolError),
}

pub struct PacketDispatcher {
    executor: Arc<ActionExecutor>,
    pool: Arc<WorkerPool>,
    drag_loop: Arc<DragLoopController>,
    browser: Arc<dyn BrowserTrigger>,
}

impl PacketDispatcher {
    pub fn new(
        executor: Arc<ActionExecutor>,
        pool: Arc<WorkerPool>,
        drag_loop: Arc<DragLoopController>,
        browser: Arc<dyn BrowserTrigger>,
    ) -> Self {
        Self {
            executor,
            pool,
            drag_loop,
            browser,
        }
    }

    /// Handles one packet received from `src` at `received_at`.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] describing why the packet was dropped.
    /// Reply-send failures are logged here and are not errors.
    pub fn dispatch(
        &self,
        packet: Packet,
        src: SocketAddr,
        received_at: Instant,
        replies: &dyn ReplySink,
    ) -> Result<(), DispatchError> {
        let id_label = packet
            .packet_id
            .as_ref()
            .map_or_else(|| "-".to_string(), ToString::to_string);
        info!(packet_type = %packet.packet_type, packet_id = %id_label, %src, "packet received");

        match packet.packet_type {
            PacketType::HealthCheckPing => {
                let id = required_id(&packet)?;
                send(replies, &Packet::pong(id, now_millis()), src);
                Ok(())
            }
            PacketType::MacroCommand => self.handle_macro(&packet, src, received_at, replies),
            PacketType::TriggerImportBrowser => {
                let request: BrowserRequest = required_payload(&packet)?;
                let url = request.url.trim();
                if url.is_empty() {
                    return Err(DispatchError::ProtocolViolation {
                        packet_type: packet.packet_type.clone(),
                        field: "url",
                    });
                }
                self.browser.open(url);
                Ok(())
            }
            PacketType::CaptureMousePosition => {
                let request: CaptureRequest = required_payload(&packet)?;
                // Failures are logged by the controller.
                let _ = self.drag_loop.capture(request.purpose);
                Ok(())
            }
            PacketType::AutoDragLoopCommand => {
                let request: LoopCommandRequest = required_payload(&packet)?;
                match request.action {
                    LoopCommand::Start => {
                        let outcome = self.drag_loop.start();
                        debug!("drag loop start: {outcome:?}");
                    }
                    LoopCommand::Stop => {
                        let outcome = self.drag_loop.stop();
                        debug!("drag loop stop: {outcome:?}");
                    }
                }
                Ok(())
            }
            PacketType::HealthCheckPong | PacketType::MacroAck | PacketType::Unknown(_) => {
                warn!(packet_type = %packet.packet_type, %src, "ignoring unexpected packet type");
                Ok(())
            }
        }
    }

    fn handle_macro(
        &self,
        packet: &Packet,
        src: SocketAddr,
        received_at: Instant,
        replies: &dyn ReplySink,
    ) -> Result<(), DispatchError> {
        let id = required_id(packet)?;

        // The ACK confirms receipt, not execution, so it goes out before the
        // payload is even looked at.
        send(replies, &Packet::macro_ack(id.clone(), now_millis()), src);

        let Some(action) = packet.decode_payload::<Action>()? else {
            warn!(packet_id = %id, %src, "MACRO_COMMAND has no payload; nothing to execute");
            return Ok(());
        };

        let executor = Arc::clone(&self.executor);
        let ctx = RequestContext {
            packet_id: Some(id),
            received_at,
        };
        self.pool.submit(move || executor.run(&action, &ctx))?;
        Ok(())
    }
}

fn required_id(packet: &Packet) -> Result<PacketId, DispatchError> {
    packet
        .packet_id
        .clone()
        .ok_or_else(|| DispatchError::ProtocolViolation {
            packet_type: packet.packet_type.clone(),
            field: "packetId",
        })
}

fn required_payload<T: DeserializeOwned>(packet: &Packet) -> Result<T, DispatchError> {
    packet
        .decode_payload()?
        .ok_or_else(|| DispatchError::ProtocolViolation {
            packet_type: packet.packet_type.clone(),
            field: "payload",
        })
}

fn send(replies: &dyn ReplySink, reply: &Packet, dest: SocketAddr) {
    let bytes = match encode_packet(reply) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("failed to encode {} reply: {e}", reply.packet_type);
            return;
        }
    };
    if let Err(e) = replies.send_reply(&bytes, dest) {
        warn!("failed to send {} to {dest}: {e}", reply.packet_type);
    }
}

/// Wall-clock milliseconds since the Unix epoch.
fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

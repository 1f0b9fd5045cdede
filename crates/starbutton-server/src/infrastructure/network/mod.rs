//! UDP dispatch server.
//!
//! Binds one UDP socket and runs a blocking receive loop on a dedicated
//! thread.  Every datagram is decoded and handed to the application layer's
//! [`PacketDispatcher`], which replies through the same socket.
//!
//! # Read timeout
//!
//! The socket is configured with a read timeout (1 second by default).
//! `recv_from` therefore returns at least once per interval even when no
//! traffic arrives, and the loop re-checks its `running` flag.  Shutdown is
//! observed within one timeout interval.
//!
//! # Lifecycle
//!
//! [`DispatchServer::start`] binds the socket, creates the worker pool,
//! spawns the receive thread, and registers the LAN advertisement.
//! [`DispatchServer::shutdown`] undoes all of it in reverse dependency order
//! and is safe to call more than once; it also runs on `Drop`.  The drag loop
//! controller is shared with the caller, so captured endpoints survive a
//! stop/start cycle.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use starbutton_core::decode_packet;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::application::{
    dispatch::{PacketDispatcher, ReplySink},
    drag_loop::DragLoopController,
    emulate_input::PlatformInputEmulator,
    events::{DiscoveryState, EventSink, ServerStatus},
    execute_action::ActionExecutor,
    ports::{BrowserTrigger, ServiceAdvertiser},
    task::{join_with_timeout, spawn_named},
    worker_pool::{PoolError, WorkerPool},
};

/// Smallest receive buffer; datagrams larger than this are truncated by the OS.
pub const MIN_BUFFER_SIZE: usize = 2048;

/// Extra time allowed for the receive thread to notice the stop flag.
const JOIN_MARGIN: Duration = Duration::from_millis(500);

/// Errors that can occur while starting the dispatch server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The UDP socket could not be bound.
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    /// The bound socket could not be configured.
    #[error("failed to configure UDP socket: {0}")]
    Socket(#[source] io::Error),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error("failed to spawn receive thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Settings for one server run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: IpAddr,
    /// UDP port; `0` lets the OS choose (used by tests).
    pub port: u16,
    pub buffer_size: usize,
    pub worker_capacity: usize,
    pub drain_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5005,
            buffer_size: MIN_BUFFER_SIZE,
            worker_capacity: 10,
            drain_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(1),
        }
    }
}

/// Collaborators shared across server runs.
#[derive(Clone)]
pub struct ServerDeps {
    pub emulator: Arc<dyn PlatformInputEmulator>,
    pub drag_loop: Arc<DragLoopController>,
    pub browser: Arc<dyn BrowserTrigger>,
    pub advertiser: Arc<dyn ServiceAdvertiser>,
    pub events: EventSink,
}

impl ReplySink for UdpSocket {
    fn send_reply(&self, datagram: &[u8], dest: SocketAddr) -> io::Result<usize> {
        self.send_to(datagram, dest)
    }
}

/// A running dispatch server.
pub struct DispatchServer {
    local_addr: SocketAddr,
    socket: Option<Arc<UdpSocket>>,
    running: Arc<AtomicBool>,
    receiver: Option<JoinHandle<()>>,
    pool: Arc<WorkerPool>,
    drag_loop: Arc<DragLoopController>,
    advertiser: Arc<dyn ServiceAdvertiser>,
    events: EventSink,
    config: ServerConfig,
    stopped: bool,
}

impl DispatchServer {
    /// Binds the socket and starts serving.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address is unavailable; this is
    /// never retried.  Other variants report thread or socket setup failures.
    pub fn start(config: ServerConfig, deps: ServerDeps) -> Result<Self, ServerError> {
        let addr = SocketAddr::new(config.bind_address, config.port);
        deps.events.status(ServerStatus::Starting { port: config.port });

        let socket = UdpSocket::bind(addr).map_err(|source| ServerError::Bind { addr, source })?;
        socket
            .set_read_timeout(Some(config.read_timeout))
            .map_err(ServerError::Socket)?;
        let local_addr = socket.local_addr().map_err(ServerError::Socket)?;
        let socket = Arc::new(socket);

        let pool = Arc::new(WorkerPool::new(config.worker_capacity)?);
        let executor = Arc::new(ActionExecutor::new(
            Arc::clone(&deps.emulator),
            deps.events.clone(),
        ));
        let dispatcher = PacketDispatcher::new(
            executor,
            Arc::clone(&pool),
            Arc::clone(&deps.drag_loop),
            Arc::clone(&deps.browser),
        );

        let discovery = advertise(deps.advertiser.as_ref(), local_addr.port());

        let running = Arc::new(AtomicBool::new(true));
        let receiver = {
            let socket = Arc::clone(&socket);
            let running = Arc::clone(&running);
            let buffer_size = config.buffer_size.max(MIN_BUFFER_SIZE);
            spawn_named("starbutton-recv", move || {
                receive_loop(&socket, &dispatcher, &running, buffer_size)
            })
        };
        let receiver = match receiver {
            Ok(handle) => handle,
            Err(e) => {
                pool.shutdown(config.drain_timeout);
                deps.advertiser.unregister();
                deps.events.status(ServerStatus::Stopped);
                return Err(ServerError::Spawn(e));
            }
        };

        info!(
            "dispatch server listening on UDP {local_addr} with {} workers",
            pool.capacity()
        );
        deps.events.status(ServerStatus::Running {
            port: local_addr.port(),
            discovery,
        });

        Ok(Self {
            local_addr,
            socket: Some(socket),
            running,
            receiver: Some(receiver),
            pool,
            drag_loop: deps.drag_loop,
            advertiser: deps.advertiser,
            events: deps.events,
            config,
            stopped: false,
        })
    }

    /// The bound address (with the OS-assigned port when started on port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        !self.stopped
    }

    /// Stops the server.  Idempotent.
    ///
    /// Order: receive loop, drag loop, worker pool drain, socket, service
    /// advertisement, then the `Stopped` status event.
    pub fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        info!("dispatch server shutting down");

        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.receiver.take() {
            match join_with_timeout(handle, self.config.read_timeout + JOIN_MARGIN) {
                Ok(Ok(())) => debug!("receive thread joined"),
                Ok(Err(_)) => error!("receive thread panicked"),
                Err(_) => warn!("receive thread did not stop in time; detaching it"),
            }
        }

        self.drag_loop.stop();
        self.pool.shutdown(self.config.drain_timeout);
        self.socket.take();
        self.advertiser.unregister();

        self.events.status(ServerStatus::Stopped);
        info!("dispatch server stopped");
    }
}

impl Drop for DispatchServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn advertise(advertiser: &dyn ServiceAdvertiser, port: u16) -> DiscoveryState {
    if !advertiser.is_enabled() {
        return DiscoveryState::Disabled;
    }
    match advertiser.register(port) {
        Ok(()) => DiscoveryState::Active,
        Err(e) => {
            warn!("service advertisement unavailable, continuing without discovery: {e}");
            DiscoveryState::Failed
        }
    }
}

/// The main receive loop executed on the receive thread.
fn receive_loop(
    socket: &UdpSocket,
    dispatcher: &PacketDispatcher,
    running: &AtomicBool,
    buffer_size: usize,
) {
    let mut buf = vec![0u8; buffer_size];

    while running.load(Ordering::Relaxed) {
        let (len, src) = match socket.recv_from(&mut buf) {
            Ok(pair) => pair,
            Err(e) if is_timeout_error(&e) => continue,
            Err(e) => {
                // Windows reports ICMP port-unreachable for an earlier reply
                // as ConnectionReset on the next receive.
                if e.kind() == io::ErrorKind::ConnectionReset {
                    debug!("recv reported connection reset: {e}");
                } else {
                    error!("recv error: {e}");
                }
                continue;
            }
        };
        let received_at = Instant::now();

        let packet = match decode_packet(&buf[..len]) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(%src, "dropping undecodable datagram: {e}");
                continue;
            }
        };

        if let Err(e) = dispatcher.dispatch(packet, src, received_at, socket) {
            warn!(%src, "packet dropped: {e}");
        }
    }

    debug!("receive loop stopped");
}

/// Returns `true` for OS timeout / would-block errors that should be retried.
fn is_timeout_error(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Image stream bridge: UDP frame ingress, TCP fan-out.
//!
//! One datagram is one frame.  The ingress worker replaces a last-write-wins
//! frame register on every successful receive; no reassembly across
//! datagrams is attempted.  Every accepted TCP subscriber gets its own worker
//! that repeatedly writes the current frame, raw and unframed, roughly every
//! 30 ms.  Subscribers are expected to know frame boundaries out-of-band.
//!
//! ```text
//!  UDP :udp_port ──► ingress ──► [frame register] ──► subscriber 1 ──► TCP
//!                                       │──────────► subscriber 2 ──► TCP
//!  TCP :tcp_port ──► accept ─── spawns ─┘            ...
//! ```
//!
//! Subscriber workers are owned by the bridge and joined in `stop()`.

use std::io::{self, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::net::{
    create_datagram_socket, create_stream_listener, is_timeout_error, Endpoint, SocketError,
};
use crate::services::lifecycle::{lock, BridgeService, ServiceError, WorkerSet};

/// Largest frame accepted in one datagram.
pub const MAX_FRAME_DATAGRAM: usize = 2 * 1024 * 1024;

/// Pause between two writes of the current frame to one subscriber.
pub const FRAME_SEND_INTERVAL: Duration = Duration::from_millis(30);

/// Pause before re-checking an empty frame register.
pub const EMPTY_FRAME_RETRY: Duration = Duration::from_millis(50);

const RECV_POLL_INTERVAL: Duration = Duration::from_millis(100);
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Bounds one blocking write so a stalled subscriber still observes `stop()`.
const SUBSCRIBER_WRITE_POLL: Duration = Duration::from_millis(100);
/// Pause after a receive error that is not a poll timeout.
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Settings for [`ImageStreamBridge`].
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBridgeConfig {
    /// Address both sockets bind to.
    pub bind_ip: String,
    pub udp_port: u16,
    pub tcp_port: u16,
}

impl Default for ImageBridgeConfig {
    fn default() -> Self {
        Self {
            bind_ip: "0.0.0.0".to_string(),
            udp_port: 9998,
            tcp_port: 9999,
        }
    }
}

impl ImageBridgeConfig {
    pub fn udp_endpoint(&self) -> Endpoint {
        Endpoint::new(self.bind_ip.clone(), self.udp_port)
    }

    pub fn tcp_endpoint(&self) -> Endpoint {
        Endpoint::new(self.bind_ip.clone(), self.tcp_port)
    }
}

/// Snapshot of the bridge.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ImageStreamStatus {
    pub udp_running: bool,
    pub tcp_running: bool,
    /// Size in bytes of the frame currently held, 0 before the first frame.
    pub last_frame_size: usize,
    /// When the current frame arrived.
    pub last_frame_time: Option<SystemTime>,
    pub client_count: usize,
}

#[derive(Default)]
struct StreamState {
    frame: Bytes,
    frame_time: Option<SystemTime>,
    client_count: usize,
    udp_addr: Option<SocketAddr>,
    tcp_addr: Option<SocketAddr>,
}

struct Shared {
    running: AtomicBool,
    state: Mutex<StreamState>,
    subscribers: Mutex<WorkerSet>,
}

impl Shared {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Republishes the most recent UDP frame to every TCP subscriber.
pub struct ImageStreamBridge {
    config: ImageBridgeConfig,
    shared: Arc<Shared>,
    workers: Mutex<WorkerSet>,
}

impl ImageStreamBridge {
    pub fn new(config: ImageBridgeConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                state: Mutex::new(StreamState::default()),
                subscribers: Mutex::new(WorkerSet::new()),
            }),
            workers: Mutex::new(WorkerSet::new()),
        }
    }

    /// Bound UDP and TCP addresses while the sockets are open.
    ///
    /// Useful when the configured ports are 0 and the OS picks them.
    pub fn local_addrs(&self) -> Option<(SocketAddr, SocketAddr)> {
        let state = lock(&self.shared.state);
        state.udp_addr.zip(state.tcp_addr)
    }

    /// Copy of the frame currently held (empty before the first frame).
    pub fn current_frame(&self) -> Bytes {
        lock(&self.shared.state).frame.clone()
    }

    fn open(&self) -> Result<(UdpSocket, TcpListener), SocketError> {
        let udp = create_datagram_socket(&self.config.udp_endpoint())?;
        udp.set_read_timeout(Some(RECV_POLL_INTERVAL))
            .map_err(SocketError::Configure)?;
        // On failure below, `udp` is dropped and therefore closed.
        let tcp = create_stream_listener(&self.config.tcp_endpoint())?;
        tcp.set_nonblocking(true).map_err(SocketError::Configure)?;
        Ok((udp, tcp))
    }

    /// Undoes a partially completed start.  Caller holds the lifecycle lock.
    fn abort_start(&self, workers: &mut WorkerSet) {
        self.shared.running.store(false, Ordering::Release);
        workers.join_all();
        let mut state = lock(&self.shared.state);
        state.udp_addr = None;
        state.tcp_addr = None;
    }
}

impl BridgeService for ImageStreamBridge {
    type Status = ImageStreamStatus;

    fn name(&self) -> &'static str {
        "image stream bridge"
    }

    fn start(&self) -> Result<(), ServiceError> {
        let mut workers = lock(&self.workers);
        if self.shared.is_running() {
            return Ok(());
        }

        let (udp, tcp) = self.open().map_err(|e| {
            error!("image stream bridge not started: {e}");
            e
        })?;
        let udp_addr = udp.local_addr().ok();
        let tcp_addr = tcp.local_addr().ok();
        {
            let mut state = lock(&self.shared.state);
            state.udp_addr = udp_addr;
            state.tcp_addr = tcp_addr;
        }
        self.shared.running.store(true, Ordering::Release);

        let ingress = Arc::clone(&self.shared);
        let spawned = workers
            .spawn("image-ingress", move || ingress_loop(udp, ingress))
            .and_then(|()| {
                let egress = Arc::clone(&self.shared);
                workers.spawn("image-accept", move || accept_loop(tcp, egress))
            });
        if let Err(e) = spawned {
            self.abort_start(&mut workers);
            error!("image stream bridge not started: {e}");
            return Err(e);
        }

        info!(
            "image stream bridge started on UDP {} and TCP {}",
            self.config.udp_endpoint(),
            self.config.tcp_endpoint()
        );
        Ok(())
    }

    fn stop(&self) {
        let mut workers = lock(&self.workers);
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }
        // Ingress and accept first, so no subscriber is admitted while the
        // subscriber set is being drained.
        workers.join_all();
        lock(&self.shared.subscribers).join_all();
        {
            let mut state = lock(&self.shared.state);
            state.udp_addr = None;
            state.tcp_addr = None;
        }
        info!("image stream bridge stopped");
    }

    fn status(&self) -> ImageStreamStatus {
        let state = lock(&self.shared.state);
        let running = self.shared.is_running();
        ImageStreamStatus {
            udp_running: running && state.udp_addr.is_some(),
            tcp_running: running && state.tcp_addr.is_some(),
            last_frame_size: state.frame.len(),
            last_frame_time: state.frame_time,
            client_count: state.client_count,
        }
    }

    fn is_running(&self) -> bool {
        self.shared.is_running()
    }
}

impl Drop for ImageStreamBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Workers ───────────────────────────────────────────────────────────────────

fn ingress_loop(socket: UdpSocket, shared: Arc<Shared>) {
    let mut buf = vec![0u8; MAX_FRAME_DATAGRAM];
    while shared.is_running() {
        match socket.recv_from(&mut buf) {
            Ok((len, _src)) => {
                let frame = Bytes::copy_from_slice(&buf[..len]);
                let mut state = lock(&shared.state);
                state.frame = frame;
                state.frame_time = Some(SystemTime::now());
            }
            Err(e) if is_timeout_error(&e) => continue,
            Err(e) => {
                if !shared.is_running() {
                    break;
                }
                debug!("image ingress recv error: {e}");
                thread::sleep(RECV_ERROR_BACKOFF);
            }
        }
    }
    lock(&shared.state).udp_addr = None;
    debug!("image ingress loop exited");
}

fn accept_loop(listener: TcpListener, shared: Arc<Shared>) {
    while shared.is_running() {
        match listener.accept() {
            Ok((stream, peer)) => admit_subscriber(&shared, stream, peer),
            Err(e) if is_timeout_error(&e) => thread::sleep(ACCEPT_POLL_INTERVAL),
            Err(e) => {
                if !shared.is_running() {
                    break;
                }
                warn!("image subscriber accept error: {e}");
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
        lock(&shared.subscribers).reap_finished();
    }
    lock(&shared.state).tcp_addr = None;
    debug!("image accept loop exited");
}

fn admit_subscriber(shared: &Arc<Shared>, stream: TcpStream, peer: SocketAddr) {
    // Accepted sockets may inherit the listener's non-blocking mode.
    let configured = stream
        .set_nonblocking(false)
        .and_then(|()| stream.set_write_timeout(Some(SUBSCRIBER_WRITE_POLL)));
    if let Err(e) = configured {
        warn!("dropping image subscriber {peer}: {e}");
        return;
    }

    lock(&shared.state).client_count += 1;
    let worker_shared = Arc::clone(shared);
    let spawned = lock(&shared.subscribers).spawn(format!("image-sub-{peer}"), move || {
        serve_subscriber(stream, peer, worker_shared)
    });
    if let Err(e) = spawned {
        error!("dropping image subscriber {peer}: {e}");
        release_client_slot(shared);
    }
}

fn serve_subscriber(mut stream: TcpStream, peer: SocketAddr, shared: Arc<Shared>) {
    info!("image subscriber {peer} connected");
    while shared.is_running() {
        let frame = lock(&shared.state).frame.clone();
        if frame.is_empty() {
            thread::sleep(EMPTY_FRAME_RETRY);
            continue;
        }
        match write_frame(&mut stream, &frame, &shared) {
            Ok(true) => thread::sleep(FRAME_SEND_INTERVAL),
            Ok(false) => break,
            Err(e) => {
                debug!("image subscriber {peer} write failed: {e}");
                break;
            }
        }
    }
    drop(stream);
    release_client_slot(&shared);
    info!("image subscriber {peer} disconnected");
}

/// Writes all of `frame`, resuming after write timeouts so a slow reader
/// never sees a truncated frame.  Returns `Ok(false)` if the bridge stopped
/// before the frame was complete.
fn write_frame(stream: &mut TcpStream, frame: &[u8], shared: &Shared) -> io::Result<bool> {
    let mut offset = 0;
    while offset < frame.len() {
        match stream.write(&frame[offset..]) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => offset += n,
            Err(e) if is_timeout_error(&e) || e.kind() == io::ErrorKind::Interrupted => {
                if !shared.is_running() {
                    return Ok(false);
                }
            }
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

fn release_client_slot(shared: &Shared) {
    let mut state = lock(&shared.state);
    state.client_count = state.client_count.saturating_sub(1);
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Datagram relay: one ingress socket, two fixed destinations.
//!
//! Every datagram received on the bind address is sent unchanged to the
//! `raw` and `proc` targets from the same socket, best-effort and
//! unacknowledged.  When a capture sink was supplied and is active, the
//! datagram is also handed to it.  Packet and byte counters only grow.

use std::net::{SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, error, info};

use crate::net::{create_datagram_socket, is_timeout_error, Endpoint, SocketError};
use crate::services::capture::PacketSink;
use crate::services::lifecycle::{lock, BridgeService, ServiceError, WorkerSet};

/// Largest datagram relayed.
pub const MAX_RELAY_DATAGRAM: usize = 64 * 1024;

const RECV_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(100);
const RECV_ERROR_BACKOFF: std::time::Duration = std::time::Duration::from_millis(10);

/// Settings for [`DatagramRelay`].
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub bind: Endpoint,
    /// Destination for the unprocessed copy.
    pub raw_target: Endpoint,
    /// Destination for the copy consumed by the processing pipeline.
    pub proc_target: Endpoint,
    /// When `false`, `start()` does nothing.
    pub enable: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: Endpoint::new("0.0.0.0", 10707),
            raw_target: Endpoint::new("127.0.0.1", 10708),
            proc_target: Endpoint::new("127.0.0.1", 10709),
            enable: true,
        }
    }
}

/// Snapshot of the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RelayStatus {
    pub running: bool,
    pub forwarded_packet_count: u64,
    pub forwarded_byte_count: u64,
}

#[derive(Default)]
struct Counters {
    packets: u64,
    bytes: u64,
    local_addr: Option<SocketAddr>,
}

struct Shared {
    running: AtomicBool,
    counters: Mutex<Counters>,
}

struct Route {
    raw: SocketAddrV4,
    proc: SocketAddrV4,
    sink: Option<Arc<dyn PacketSink>>,
}

/// Duplicates inbound datagrams to two destinations.
pub struct DatagramRelay {
    config: RelayConfig,
    sink: Option<Arc<dyn PacketSink>>,
    shared: Arc<Shared>,
    workers: Mutex<WorkerSet>,
}

impl DatagramRelay {
    /// Creates a stopped relay.  `sink` receives a copy of every relayed
    /// datagram while it reports itself active.
    pub fn new(config: RelayConfig, sink: Option<Arc<dyn PacketSink>>) -> Self {
        Self {
            config,
            sink,
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                counters: Mutex::new(Counters::default()),
            }),
            workers: Mutex::new(WorkerSet::new()),
        }
    }

    /// Bound ingress address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        lock(&self.shared.counters).local_addr
    }

    fn open(&self) -> Result<(UdpSocket, Route), SocketError> {
        let route = Route {
            raw: self.config.raw_target.resolve()?,
            proc: self.config.proc_target.resolve()?,
            sink: self.sink.clone(),
        };
        let socket = create_datagram_socket(&self.config.bind)?;
        socket
            .set_read_timeout(Some(RECV_POLL_INTERVAL))
            .map_err(SocketError::Configure)?;
        Ok((socket, route))
    }
}

impl BridgeService for DatagramRelay {
    type Status = RelayStatus;

    fn name(&self) -> &'static str {
        "udp relay"
    }

    fn start(&self) -> Result<(), ServiceError> {
        let mut workers = lock(&self.workers);
        if self.shared.running.load(Ordering::Acquire) {
            return Ok(());
        }
        if !self.config.enable {
            info!("udp relay disabled by configuration");
            return Ok(());
        }

        let (socket, route) = self.open().map_err(|e| {
            error!("udp relay not started: {e}");
            e
        })?;
        lock(&self.shared.counters).local_addr = socket.local_addr().ok();

        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        if let Err(e) = workers.spawn("udp-relay", move || relay_loop(socket, route, shared)) {
            self.shared.running.store(false, Ordering::Release);
            lock(&self.shared.counters).local_addr = None;
            error!("udp relay not started: {e}");
            return Err(e);
        }

        info!(
            "udp relay started on {} -> raw {}, proc {}",
            self.config.bind, self.config.raw_target, self.config.proc_target
        );
        Ok(())
    }

    fn stop(&self) {
        let mut workers = lock(&self.workers);
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }
        workers.join_all();
        lock(&self.shared.counters).local_addr = None;
        info!("udp relay stopped");
    }

    fn status(&self) -> RelayStatus {
        let counters = lock(&self.shared.counters);
        RelayStatus {
            running: self.shared.running.load(Ordering::Acquire),
            forwarded_packet_count: counters.packets,
            forwarded_byte_count: counters.bytes,
        }
    }

    fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }
}

impl Drop for DatagramRelay {
    fn drop(&mut self) {
        self.stop();
    }
}

fn relay_loop(socket: UdpSocket, route: Route, shared: Arc<Shared>) {
    let mut buf = vec![0u8; MAX_RELAY_DATAGRAM];
    while shared.running.load(Ordering::Acquire) {
        let len = match socket.recv_from(&mut buf) {
            Ok((len, _src)) => len,
            Err(e) if is_timeout_error(&e) => continue,
            Err(e) => {
                if !shared.running.load(Ordering::Acquire) {
                    break;
                }
                // Includes ICMP port-unreachable reports for earlier sends.
                debug!("udp relay recv error: {e}");
                std::thread::sleep(RECV_ERROR_BACKOFF);
                continue;
            }
        };
        let packet = &buf[..len];

        for target in [route.raw, route.proc] {
            if let Err(e) = socket.send_to(packet, target) {
                debug!("udp relay send to {target} failed: {e}");
            }
        }

        if let Some(sink) = &route.sink {
            if sink.is_active() {
                sink.log_packet(packet);
            }
        }

        let mut counters = lock(&shared.counters);
        counters.packets += 1;
        counters.bytes += len as u64;
    }
    debug!("udp relay loop exited");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Gimbal pose transmitter.
//!
//! Holds the latest requested [`Pose`] and sends it to the gimbal generator
//! as a 32-byte datagram every `send_interval` (50 ms by default), whether or
//! not the pose changed.  Sends are fire-and-forget: a failed send is logged
//! at debug level and the next cycle carries on.

use std::net::{SocketAddrV4, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::net::{create_ephemeral_datagram_socket, Endpoint};
use crate::protocol::capture::hex_dump;
use crate::protocol::gimbal::{encode_pose, Pose};
use crate::services::lifecycle::{lock, BridgeService, ServiceError, WorkerSet};

/// Default transmit period.
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_millis(50);

/// Settings for [`GimbalTransmitter`].
#[derive(Debug, Clone, PartialEq)]
pub struct GimbalConfig {
    /// Where pose datagrams are sent.
    pub generator: Endpoint,
    pub send_interval: Duration,
    /// Log every transmitted packet as hex at info level.
    pub show_packets: bool,
}

impl Default for GimbalConfig {
    fn default() -> Self {
        Self {
            generator: Endpoint::new("127.0.0.1", 10706),
            send_interval: DEFAULT_SEND_INTERVAL,
            show_packets: false,
        }
    }
}

/// Snapshot of the transmitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GimbalStatus {
    pub running: bool,
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    pub zoom: f64,
}

struct Shared {
    running: AtomicBool,
    pose: Mutex<Pose>,
}

/// Periodically transmits the latest gimbal pose.
pub struct GimbalTransmitter {
    config: GimbalConfig,
    shared: Arc<Shared>,
    workers: Mutex<WorkerSet>,
}

impl GimbalTransmitter {
    pub fn new(config: GimbalConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                pose: Mutex::new(Pose::default()),
            }),
            workers: Mutex::new(WorkerSet::new()),
        }
    }

    /// Replaces the pose sent on the next cycle.  Does not transmit.
    pub fn update_pose(&self, yaw: f64, pitch: f64, roll: f64, zoom: f64) {
        *lock(&self.shared.pose) = Pose {
            yaw,
            pitch,
            roll,
            zoom,
        };
    }

    pub fn pose(&self) -> Pose {
        *lock(&self.shared.pose)
    }

    fn open(&self) -> Result<(UdpSocket, SocketAddrV4), ServiceError> {
        let target = self.config.generator.resolve()?;
        let socket = create_ephemeral_datagram_socket()?;
        Ok((socket, target))
    }
}

impl BridgeService for GimbalTransmitter {
    type Status = GimbalStatus;

    fn name(&self) -> &'static str {
        "gimbal control"
    }

    fn start(&self) -> Result<(), ServiceError> {
        let mut workers = lock(&self.workers);
        if self.shared.running.load(Ordering::Acquire) {
            return Ok(());
        }

        let (socket, target) = self.open().map_err(|e| {
            error!("gimbal control not started: {e}");
            e
        })?;

        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let interval = self.config.send_interval;
        let show_packets = self.config.show_packets;
        if let Err(e) = workers.spawn("gimbal-tx", move || {
            transmit_loop(socket, target, shared, interval, show_packets)
        }) {
            self.shared.running.store(false, Ordering::Release);
            error!("gimbal control not started: {e}");
            return Err(e);
        }

        info!("gimbal control started, sending to {target}");
        Ok(())
    }

    fn stop(&self) {
        let mut workers = lock(&self.workers);
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }
        workers.join_all();
        info!("gimbal control stopped");
    }

    fn status(&self) -> GimbalStatus {
        let pose = lock(&self.shared.pose);
        GimbalStatus {
            running: self.shared.running.load(Ordering::Acquire),
            yaw: pose.yaw,
            pitch: pose.pitch,
            roll: pose.roll,
            zoom: pose.zoom,
        }
    }

    fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }
}

impl Drop for GimbalTransmitter {
    fn drop(&mut self) {
        self.stop();
    }
}

fn transmit_loop(
    socket: UdpSocket,
    target: SocketAddrV4,
    shared: Arc<Shared>,
    interval: Duration,
    show_packets: bool,
) {
    while shared.running.load(Ordering::Acquire) {
        let packet = encode_pose(&lock(&shared.pose));
        match socket.send_to(&packet, target) {
            Ok(_) if show_packets => info!("gimbal -> {target}: {}", hex_dump(&packet)),
            Ok(_) => {}
            Err(e) => debug!("gimbal send to {target} failed: {e}"),
        }
        thread::sleep(interval);
    }
    debug!("gimbal transmit loop exited");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

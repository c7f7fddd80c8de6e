//! # rig-bridge-core
//!
//! Real-time bridge between a remote vehicle/sensor rig and local consumers.
//! Three independent data paths run as concurrent services:
//!
//! - **Gimbal pose transmitter** – sends the latest requested pose to the
//!   gimbal generator as a fixed 32-byte datagram every 50 ms.
//! - **Image stream bridge** – ingests frames over UDP and republishes the
//!   most recent one to any number of TCP subscribers.
//! - **Datagram relay** – duplicates inbound telemetry datagrams to two
//!   destinations and optionally records them in a capture log.
//!
//! Every service follows the same lifecycle ([`BridgeService`]): `start()`
//! opens sockets and spawns worker threads, `stop()` signals and joins them,
//! and `status()` returns a value snapshot that is safe to poll from any
//! thread at any rate.
//!
//! This crate does not read configuration files or install a log
//! subscriber; it logs through `tracing` and takes plain config structs.

pub mod net;
pub mod protocol;
pub mod services;

pub use net::{Endpoint, SocketError};
pub use protocol::gimbal::Pose;
pub use services::{
    BridgeService, CaptureLogger, CaptureStatus, DatagramRelay, GimbalConfig, GimbalStatus,
    GimbalTransmitter, ImageBridgeConfig, ImageStreamBridge, ImageStreamStatus, PacketSink,
    RelayConfig, RelayStatus, ServiceError,
};

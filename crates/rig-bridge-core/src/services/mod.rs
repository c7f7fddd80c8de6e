//! The bridge services.
//!
//! # Sub-modules
//!
//! - **`lifecycle`** – the [`BridgeService`] trait every service implements,
//!   the supervised [`WorkerSet`], and [`ServiceError`].
//! - **`capture`** – session-scoped packet capture log, usable as a
//!   [`PacketSink`] by the relay.
//! - **`gimbal`** – periodic gimbal pose transmitter.
//! - **`image_bridge`** – UDP frame ingress with TCP fan-out.
//! - **`relay`** – UDP relay duplicating inbound datagrams to two targets.
//!
//! The services never talk to each other; the only shared object is the
//! capture logger handed to the relay.

pub mod capture;
pub mod gimbal;
pub mod image_bridge;
pub mod lifecycle;
pub mod relay;

pub use capture::{CaptureError, CaptureLogger, CaptureStatus, PacketSink};
pub use gimbal::{GimbalConfig, GimbalStatus, GimbalTransmitter};
pub use image_bridge::{ImageBridgeConfig, ImageStreamBridge, ImageStreamStatus};
pub use lifecycle::{BridgeService, ServiceError, WorkerSet};
pub use relay::{DatagramRelay, RelayConfig, RelayStatus};

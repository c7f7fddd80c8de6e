//! Composition root: builds every service from [`AppConfig`] and drives their
//! lifecycles in dependency order.
//!
//! ```text
//! start:  capture ─► image bridge ─► gimbal ─► relay
//! stop:   relay ─► gimbal ─► image bridge ─► capture
//! ```
//!
//! The relay holds the capture logger as its packet sink, so the logger is the
//! first thing opened and the last thing closed.

use std::path::Path;
use std::sync::Arc;

use rig_bridge_core::{
    BridgeService, CaptureLogger, CaptureStatus, DatagramRelay, GimbalStatus, GimbalTransmitter,
    ImageStreamBridge, ImageStreamStatus, PacketSink, RelayStatus,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::AppConfig;

/// Point-in-time status of every service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub image: ImageStreamStatus,
    pub gimbal: GimbalStatus,
    pub relay: RelayStatus,
    /// `None` when no capture log is configured.
    pub capture: Option<CaptureStatus>,
}

/// Owns the services of one bridge process.
pub struct Bridge {
    capture: Option<Arc<CaptureLogger>>,
    image: ImageStreamBridge,
    gimbal: GimbalTransmitter,
    relay: DatagramRelay,
}

impl Bridge {
    /// Builds all services from `config`.  Nothing is bound or spawned yet.
    ///
    /// `base_dir` anchors the default capture directory.
    pub fn new(config: &AppConfig, base_dir: &Path) -> Self {
        let capture = config.capture_selection(base_dir).map(|selection| {
            info!(
                "capturing relayed packets to {} ({} log)",
                selection.directory.display(),
                selection.prefix
            );
            Arc::new(CaptureLogger::new(selection.directory, selection.prefix))
        });
        let sink = capture
            .as_ref()
            .map(|logger| Arc::clone(logger) as Arc<dyn PacketSink>);

        Self {
            image: ImageStreamBridge::new(config.image_bridge_config()),
            gimbal: GimbalTransmitter::new(config.gimbal_config()),
            relay: DatagramRelay::new(config.relay_config(), sink),
            capture,
        }
    }

    /// Starts every service.  A service that fails to start is logged and
    /// skipped; the others still start.
    ///
    /// Returns the names of the services that failed.
    pub fn start_all(&self) -> Vec<&'static str> {
        let mut failed = Vec::new();
        if let Some(capture) = &self.capture {
            start_service(capture.as_ref(), &mut failed);
        }
        start_service(&self.image, &mut failed);
        start_service(&self.gimbal, &mut failed);
        start_service(&self.relay, &mut failed);
        failed
    }

    /// Stops every service in reverse start order, joining their workers.
    pub fn stop_all(&self) {
        self.relay.stop();
        self.gimbal.stop();
        self.image.stop();
        if let Some(capture) = &self.capture {
            capture.stop();
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            image: self.image.status(),
            gimbal: self.gimbal.status(),
            relay: self.relay.status(),
            capture: self.capture.as_ref().map(|c| c.status()),
        }
    }

    pub fn image(&self) -> &ImageStreamBridge {
        &self.image
    }

    /// The gimbal transmitter, for pose updates.
    pub fn gimbal(&self) -> &GimbalTransmitter {
        &self.gimbal
    }

    pub fn relay(&self) -> &DatagramRelay {
        &self.relay
    }

    pub fn capture(&self) -> Option<&CaptureLogger> {
        self.capture.as_deref()
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.stop_all();
    }
}

fn start_service<S: BridgeService>(service: &S, failed: &mut Vec<&'static str>) {
    if let Err(e) = service.start() {
        warn!("{} not started: {e}", service.name());
        failed.push(service.name());
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

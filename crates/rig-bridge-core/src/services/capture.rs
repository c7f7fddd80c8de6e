//! Session-scoped packet capture log.
//!
//! Each `start()`/`stop()` bracket is one capture session backed by one file,
//! `<directory>/<prefix>-YYYYMMDD-HHMMSS.log`, opened in append mode.  Every
//! packet handed to [`CaptureLogger::log_packet`] while the session is open
//! becomes one timestamped hex-dump line (see [`crate::protocol::capture`]).
//!
//! Concurrent writers are serialized by the session mutex; each line goes
//! out in a single `write_all`.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::Local;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::protocol::capture::{format_capture_line, session_file_name};
use crate::services::lifecycle::{lock, BridgeService, ServiceError};

/// Error type for capture session set-up.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to create capture directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open capture log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Destination for raw packets observed by a relay.
///
/// Implementations must tolerate concurrent callers.
#[cfg_attr(test, mockall::automock)]
pub trait PacketSink: Send + Sync {
    /// Whether packets passed to [`PacketSink::log_packet`] will be recorded.
    fn is_active(&self) -> bool;

    fn log_packet(&self, packet: &[u8]);
}

/// Snapshot of the capture logger.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CaptureStatus {
    pub active: bool,
    pub lines_written: u64,
    /// File of the open session, if any.
    pub path: Option<PathBuf>,
}

struct CaptureSession {
    file: File,
    path: PathBuf,
}

/// Appends timestamped hex dumps of packets to a per-session log file.
pub struct CaptureLogger {
    directory: PathBuf,
    prefix: String,
    active: AtomicBool,
    lines: AtomicU64,
    session: Mutex<Option<CaptureSession>>,
}

impl CaptureLogger {
    /// Creates an inactive logger writing into `directory`.
    ///
    /// Nothing touches the file system until [`BridgeService::start`].
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
            active: AtomicBool::new(false),
            lines: AtomicU64::new(0),
            session: Mutex::new(None),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Appends one line for `packet`.  A no-op unless a session is open.
    pub fn log_packet(&self, packet: &[u8]) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }
        let mut session = lock(&self.session);
        let Some(session) = session.as_mut() else {
            return;
        };
        let line = format_capture_line(&Local::now(), packet);
        match session.file.write_all(line.as_bytes()) {
            Ok(()) => {
                self.lines.fetch_add(1, Ordering::AcqRel);
            }
            Err(e) => warn!("capture write to {} failed: {e}", session.path.display()),
        }
    }

    pub fn active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Lines written over the logger's lifetime, across all sessions.
    pub fn lines_written(&self) -> u64 {
        self.lines.load(Ordering::Acquire)
    }

    fn open_session(&self) -> Result<CaptureSession, CaptureError> {
        std::fs::create_dir_all(&self.directory).map_err(|source| CaptureError::CreateDir {
            path: self.directory.clone(),
            source,
        })?;
        let path = self
            .directory
            .join(session_file_name(&self.prefix, &Local::now()));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| CaptureError::Open {
                path: path.clone(),
                source,
            })?;
        Ok(CaptureSession { file, path })
    }
}

impl BridgeService for CaptureLogger {
    type Status = CaptureStatus;

    fn name(&self) -> &'static str {
        "packet capture"
    }

    fn start(&self) -> Result<(), ServiceError> {
        let mut session = lock(&self.session);
        if session.is_some() {
            return Ok(());
        }
        match self.open_session() {
            Ok(opened) => {
                info!("capturing packets to {}", opened.path.display());
                *session = Some(opened);
                self.active.store(true, Ordering::Release);
                Ok(())
            }
            Err(e) => {
                error!("packet capture not started: {e}");
                Err(e.into())
            }
        }
    }

    fn stop(&self) {
        let mut session = lock(&self.session);
        let Some(mut closed) = session.take() else {
            return;
        };
        self.active.store(false, Ordering::Release);
        if let Err(e) = closed.file.flush() {
            warn!("capture flush of {} failed: {e}", closed.path.display());
        }
        info!(
            "packet capture stopped ({} lines total, last file {})",
            self.lines_written(),
            closed.path.display()
        );
    }

    fn status(&self) -> CaptureStatus {
        let session = lock(&self.session);
        CaptureStatus {
            active: session.is_some(),
            lines_written: self.lines_written(),
            path: session.as_ref().map(|s| s.path.clone()),
        }
    }

    fn is_running(&self) -> bool {
        self.active()
    }
}

impl PacketSink for CaptureLogger {
    fn is_active(&self) -> bool {
        self.active()
    }

    fn log_packet(&self, packet: &[u8]) {
        CaptureLogger::log_packet(self, packet);
    }
}

impl Drop for CaptureLogger {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Shared start/stop/status lifecycle for every bridge service.
//!
//! Each service owns its sockets and a [`WorkerSet`] of OS threads.  The
//! running flag is private to the service and only `start`/`stop` change it.
//! Workers poll the flag at the top of their loop; blocking socket calls are
//! bounded by short timeouts so the flag is observed promptly.  `stop` joins
//! every owned worker before returning, which drops and therefore closes
//! every owned socket.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, error};

use crate::net::SocketError;
use crate::services::capture::CaptureError;

/// Setup failures reported by [`BridgeService::start`].
///
/// The service has already logged the failure and is stopped when one of
/// these is returned.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Socket(#[from] SocketError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// The OS refused to create a worker thread.
    #[error("failed to spawn worker thread {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Common lifecycle of the bridge services.
///
/// All methods take `&self` so a service can be shared behind an `Arc` with a
/// status poller running on another thread.
pub trait BridgeService: Send + Sync {
    /// Point-in-time copy of the service's status fields.
    type Status: Clone + Send + 'static;

    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Opens resources and spawns workers.  A no-op when already running.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] when setup fails; nothing is left open and
    /// the service stays stopped.
    fn start(&self) -> Result<(), ServiceError>;

    /// Signals every worker to exit and waits for all of them.  A no-op when
    /// already stopped.
    fn stop(&self);

    /// Snapshot taken under the service's lock.
    fn status(&self) -> Self::Status;

    fn is_running(&self) -> bool;
}

/// Locks `mutex`, recovering the data if a worker panicked while holding it.
///
/// Every value guarded in this crate is a plain register or counter that is
/// replaced wholesale, so a poisoned guard never exposes a half-written value.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Worker {
    name: String,
    handle: JoinHandle<()>,
}

/// Owned handles to every thread a service has spawned.
#[derive(Default)]
pub struct WorkerSet {
    workers: Vec<Worker>,
}

impl WorkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a named worker thread and keeps its handle.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Spawn`] if the thread cannot be created.  The
    /// closure (and everything it captured) is dropped in that case.
    pub fn spawn<F>(&mut self, name: impl Into<String>, body: F) -> Result<(), ServiceError>
    where
        F: FnOnce() + Send + 'static,
    {
        let name = name.into();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(body)
            .map_err(|source| ServiceError::Spawn {
                name: name.clone(),
                source,
            })?;
        self.workers.push(Worker { name, handle });
        Ok(())
    }

    /// Joins workers that have already returned.  Returns how many were reaped.
    pub fn reap_finished(&mut self) -> usize {
        let (finished, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.workers)
            .into_iter()
            .partition(|w| w.handle.is_finished());
        self.workers = live;
        let reaped = finished.len();
        finished.into_iter().for_each(join_worker);
        reaped
    }

    /// Joins every worker, blocking until all have returned.
    pub fn join_all(&mut self) {
        self.workers.drain(..).for_each(join_worker);
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

fn join_worker(worker: Worker) {
    match worker.handle.join() {
        Ok(()) => debug!("worker {} joined", worker.name),
        Err(_) => error!("worker {} panicked", worker.name),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

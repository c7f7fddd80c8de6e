//! Process shutdown signals: Ctrl+C everywhere, SIGTERM on Unix.

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::error;

/// Which signal ended the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
}

/// Shutdown listener.  SIGTERM is registered in [`ShutdownSignal::install`],
/// so it is handled from that point on instead of killing the process.
pub struct ShutdownSignal {
    #[cfg(unix)]
    terminate: Option<Signal>,
}

impl ShutdownSignal {
    /// Registers the handlers.  Must be called inside a tokio runtime.
    ///
    /// A handler that cannot be registered is logged and never fires.
    pub fn install() -> Self {
        #[cfg(unix)]
        {
            let terminate = match signal(SignalKind::terminate()) {
                Ok(sig) => Some(sig),
                Err(e) => {
                    error!("failed to install SIGTERM handler: {e}");
                    None
                }
            };
            Self { terminate }
        }
        #[cfg(not(unix))]
        {
            Self {}
        }
    }

    /// Resolves on the first shutdown signal.
    pub async fn wait(mut self) -> ShutdownReason {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("failed to listen for Ctrl+C signal: {e}");
                }
                ShutdownReason::Interrupt
            }
            () = self.terminated() => ShutdownReason::Terminate,
        }
    }

    #[cfg(unix)]
    async fn terminated(&mut self) {
        match self.terminate.as_mut() {
            Some(sig) => {
                sig.recv().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    #[cfg(not(unix))]
    async fn terminated(&mut self) {
        std::future::pending::<()>().await
    }
}

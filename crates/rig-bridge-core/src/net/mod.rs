//! Socket primitives shared by every service.
//!
//! All sockets are plain `std::net` sockets driven from dedicated worker
//! threads.  A socket is closed when its owning value is dropped; each
//! worker owns its socket(s), so joining the worker closes them.
//!
//! Addresses are IPv4 literals only.  Host names are rejected at the point a
//! socket address is derived from an [`Endpoint`].

pub mod endpoint;

pub use endpoint::{resolve, Endpoint};

use std::net::{TcpListener, UdpSocket};

use thiserror::Error;

/// Error type for socket creation and address resolution.
#[derive(Debug, Error)]
pub enum SocketError {
    /// The address string is not a dotted IPv4 literal.
    #[error("invalid IPv4 address: {address:?}")]
    InvalidAddress { address: String },

    /// The socket could not be bound (or, for a listener, put into listen state).
    #[error("failed to bind {kind} socket on {endpoint}: {source}")]
    Bind {
        kind: &'static str,
        endpoint: Endpoint,
        #[source]
        source: std::io::Error,
    },

    /// A socket option (timeout, blocking mode) could not be applied.
    #[error("failed to configure socket: {0}")]
    Configure(#[source] std::io::Error),
}

/// Binds a UDP socket on `bind`.
///
/// # Errors
///
/// Returns [`SocketError::InvalidAddress`] if the endpoint is not an IPv4
/// literal and [`SocketError::Bind`] if the OS refuses the bind.
pub fn create_datagram_socket(bind: &Endpoint) -> Result<UdpSocket, SocketError> {
    let addr = bind.resolve()?;
    UdpSocket::bind(addr).map_err(|source| SocketError::Bind {
        kind: "UDP",
        endpoint: bind.clone(),
        source,
    })
}

/// Binds a transmit-only UDP socket on an OS-assigned port.
///
/// # Errors
///
/// Returns [`SocketError::Bind`] if no ephemeral port is available.
pub fn create_ephemeral_datagram_socket() -> Result<UdpSocket, SocketError> {
    create_datagram_socket(&Endpoint::new("0.0.0.0", 0))
}

/// Binds and listens a TCP socket on `bind`.
///
/// # Errors
///
/// Returns [`SocketError::InvalidAddress`] if the endpoint is not an IPv4
/// literal and [`SocketError::Bind`] if bind or listen fails.
pub fn create_stream_listener(bind: &Endpoint) -> Result<TcpListener, SocketError> {
    let addr = bind.resolve()?;
    TcpListener::bind(addr).map_err(|source| SocketError::Bind {
        kind: "TCP",
        endpoint: bind.clone(),
        source,
    })
}

/// Returns `true` for OS timeout / would-block errors that should be retried.
pub fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────

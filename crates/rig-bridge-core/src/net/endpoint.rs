//! Address/port pairs and their resolution to socket addresses.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

use super::SocketError;

/// A destination or bind target.
///
/// Validity is not checked on construction; [`Endpoint::resolve`] is the
/// single point where the address string is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Dotted IPv4 literal, e.g. `"127.0.0.1"`.
    pub address: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }

    /// Parses the endpoint into a socket address.
    ///
    /// # Errors
    ///
    /// Returns [`SocketError::InvalidAddress`] if `address` is not an IPv4
    /// literal.
    pub fn resolve(&self) -> Result<SocketAddrV4, SocketError> {
        resolve(&self.address, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Resolves an IPv4 literal and port into a socket address.
///
/// No DNS lookup is performed: `"localhost"` is rejected.
///
/// # Errors
///
/// Returns [`SocketError::InvalidAddress`] for anything that is not a dotted
/// IPv4 literal.
pub fn resolve(ip: &str, port: u16) -> Result<SocketAddrV4, SocketError> {
    let ip: Ipv4Addr = ip.parse().map_err(|_| SocketError::InvalidAddress {
        address: ip.to_string(),
    })?;
    Ok(SocketAddrV4::new(ip, port))
}

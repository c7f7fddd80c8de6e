//! rig-bridge application crate.
//!
//! Wires the services of `rig-bridge-core` into one process:
//!
//! ```text
//! config.toml ──► AppConfig ◄── CLI overrides
//!                     │
//!                     ▼
//!                  Bridge ──► capture log, image stream bridge,
//!                     │       gimbal transmitter, datagram relay
//!                     ▼
//!                   HUD (periodic status line)
//! ```

/// Composition root: owns and sequences the services.
pub mod bridge;

/// Command-line overrides.
pub mod cli;

/// Persisted TOML configuration.
pub mod config;

/// Console status line.
pub mod hud;

/// Ctrl+C and SIGTERM handling.
pub mod signal;

//! TOML configuration persistence for the bridge.
//!
//! The file lives at `<base_dir>/savedata/config.toml`:
//!
//! ```toml
//! console_hud = true
//! hud_interval = 1.0
//!
//! [bridge]
//! ip = "0.0.0.0"
//! tcp_port = 9999
//! udp_port = 9998
//!
//! [gimbal]
//! generator_ip = "127.0.0.1"
//! generator_port = 10706
//! show_packets = false
//!
//! [relay]
//! bind_ip = "0.0.0.0"
//! bind_port = 10707
//! raw_ip = "127.0.0.1"
//! raw_port = 10708
//! proc_ip = "127.0.0.1"
//! proc_port = 10709
//! enable = true
//! log_packets = false
//!
//! [rover]
//! enable_logging = false
//! log_directory = ""
//! ```
//!
//! Every field has a serde default, so a partial or missing file still yields
//! a complete [`AppConfig`].

use std::io::Write;
use std::path::{Path, PathBuf};

use rig_bridge_core::{Endpoint, GimbalConfig, ImageBridgeConfig, RelayConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Directory under the base directory holding config and default logs.
pub const SAVEDATA_DIR: &str = "savedata";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Print a periodic status line to the console.
    #[serde(default = "default_true")]
    pub console_hud: bool,
    /// Seconds between two status lines.
    #[serde(default = "default_hud_interval")]
    pub hud_interval: f64,
    #[serde(default)]
    pub bridge: BridgeSection,
    #[serde(default)]
    pub gimbal: GimbalSection,
    #[serde(default)]
    pub relay: RelaySection,
    #[serde(default)]
    pub rover: RoverSection,
}

/// Image stream bridge sockets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeSection {
    #[serde(default = "default_any_ip")]
    pub ip: String,
    #[serde(default = "default_bridge_tcp_port")]
    pub tcp_port: u16,
    #[serde(default = "default_bridge_udp_port")]
    pub udp_port: u16,
}

/// Gimbal generator destination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GimbalSection {
    #[serde(default = "default_loopback_ip")]
    pub generator_ip: String,
    #[serde(default = "default_generator_port")]
    pub generator_port: u16,
    /// Log every transmitted pose packet as hex.
    #[serde(default)]
    pub show_packets: bool,
}

/// Datagram relay sockets and its capture switch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelaySection {
    #[serde(default = "default_any_ip")]
    pub bind_ip: String,
    #[serde(default = "default_relay_bind_port")]
    pub bind_port: u16,
    #[serde(default = "default_loopback_ip")]
    pub raw_ip: String,
    #[serde(default = "default_relay_raw_port")]
    pub raw_port: u16,
    #[serde(default = "default_loopback_ip")]
    pub proc_ip: String,
    #[serde(default = "default_relay_proc_port")]
    pub proc_port: u16,
    #[serde(default = "default_true")]
    pub enable: bool,
    /// Capture relayed datagrams into the `gazebo` log.
    #[serde(default)]
    pub log_packets: bool,
}

/// Rover capture settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoverSection {
    /// Capture relayed datagrams into the `rover` log.
    #[serde(default)]
    pub enable_logging: bool,
    /// Root for capture directories.  Empty means `<base_dir>/savedata`.
    #[serde(default)]
    pub log_directory: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}
fn default_hud_interval() -> f64 {
    1.0
}
fn default_any_ip() -> String {
    "0.0.0.0".to_string()
}
fn default_loopback_ip() -> String {
    "127.0.0.1".to_string()
}
fn default_bridge_tcp_port() -> u16 {
    9999
}
fn default_bridge_udp_port() -> u16 {
    9998
}
fn default_generator_port() -> u16 {
    10706
}
fn default_relay_bind_port() -> u16 {
    10707
}
fn default_relay_raw_port() -> u16 {
    10708
}
fn default_relay_proc_port() -> u16 {
    10709
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            console_hud: default_true(),
            hud_interval: default_hud_interval(),
            bridge: BridgeSection::default(),
            gimbal: GimbalSection::default(),
            relay: RelaySection::default(),
            rover: RoverSection::default(),
        }
    }
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            ip: default_any_ip(),
            tcp_port: default_bridge_tcp_port(),
            udp_port: default_bridge_udp_port(),
        }
    }
}

impl Default for GimbalSection {
    fn default() -> Self {
        Self {
            generator_ip: default_loopback_ip(),
            generator_port: default_generator_port(),
            show_packets: false,
        }
    }
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            bind_ip: default_any_ip(),
            bind_port: default_relay_bind_port(),
            raw_ip: default_loopback_ip(),
            raw_port: default_relay_raw_port(),
            proc_ip: default_loopback_ip(),
            proc_port: default_relay_proc_port(),
            enable: true,
            log_packets: false,
        }
    }
}

impl Default for RoverSection {
    fn default() -> Self {
        Self {
            enable_logging: false,
            log_directory: String::new(),
        }
    }
}

// ── Service configs ───────────────────────────────────────────────────────────

/// Which capture log, if any, receives relayed datagrams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSelection {
    pub directory: PathBuf,
    /// File name prefix, `gazebo` or `rover`.
    pub prefix: &'static str,
}

impl AppConfig {
    pub fn image_bridge_config(&self) -> ImageBridgeConfig {
        ImageBridgeConfig {
            bind_ip: self.bridge.ip.clone(),
            udp_port: self.bridge.udp_port,
            tcp_port: self.bridge.tcp_port,
        }
    }

    pub fn gimbal_config(&self) -> GimbalConfig {
        GimbalConfig {
            generator: Endpoint::new(self.gimbal.generator_ip.clone(), self.gimbal.generator_port),
            show_packets: self.gimbal.show_packets,
            ..GimbalConfig::default()
        }
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            bind: Endpoint::new(self.relay.bind_ip.clone(), self.relay.bind_port),
            raw_target: Endpoint::new(self.relay.raw_ip.clone(), self.relay.raw_port),
            proc_target: Endpoint::new(self.relay.proc_ip.clone(), self.relay.proc_port),
            enable: self.relay.enable,
        }
    }

    /// Enforces that at most one capture log is enabled.
    ///
    /// When both `relay.log_packets` and `rover.enable_logging` are set, the
    /// relay (gazebo) capture is switched off.  Returns `true` if the config
    /// was changed.
    pub fn resolve_capture_conflict(&mut self) -> bool {
        if self.relay.log_packets && self.rover.enable_logging {
            warn!("relay packet logging and rover logging are both enabled; disabling relay logging");
            self.relay.log_packets = false;
            return true;
        }
        false
    }

    /// Picks the capture log for this run.
    ///
    /// Rover logging wins over relay logging.  The directory is
    /// `<root>/rover` or `<root>/gazebo`, where `<root>` is
    /// `rover.log_directory` or `<base_dir>/savedata` when that is empty.
    pub fn capture_selection(&self, base_dir: &Path) -> Option<CaptureSelection> {
        let prefix = if self.rover.enable_logging {
            "rover"
        } else if self.relay.log_packets {
            "gazebo"
        } else {
            return None;
        };
        let root = if self.rover.log_directory.trim().is_empty() {
            base_dir.join(SAVEDATA_DIR)
        } else {
            PathBuf::from(self.rover.log_directory.trim())
        };
        Some(CaptureSelection {
            directory: root.join(prefix),
            prefix,
        })
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the config file path under `base_dir`.
pub fn config_file_path(base_dir: &Path) -> PathBuf {
    base_dir.join(SAVEDATA_DIR).join("config.toml")
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the file
/// does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg: AppConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`.
///
/// The content goes to a sibling `.tmp` file first and is renamed over the
/// target, so a crash never leaves a half-written config behind.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    let tmp = path.with_extension("toml.tmp");
    let io_err = |source| ConfigError::Io {
        path: tmp.clone(),
        source,
    };
    let mut file = std::fs::File::create(&tmp).map_err(io_err)?;
    file.write_all(content.as_bytes()).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    drop(file);

    std::fs::rename(&tmp, path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

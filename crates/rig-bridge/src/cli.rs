//! Command-line overrides for the persisted configuration.
//!
//! Every option is optional.  Options that are given replace the matching
//! value loaded from `config.toml`; the patched config is then saved back, so
//! an override sticks for later runs.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use crate::config::AppConfig;

/// Rig bridge: image stream fan-out, gimbal pose transmitter and datagram
/// relay.
#[derive(Debug, Default, Parser)]
#[command(name = "rig-bridge", version)]
pub struct Cli {
    /// Directory holding `savedata/`.  Defaults to the executable's directory.
    #[arg(long, env = "RIG_BRIDGE_BASE_DIR")]
    pub base_dir: Option<PathBuf>,

    /// Print the periodic status line.
    #[arg(long, overrides_with = "no_console_hud")]
    pub console_hud: bool,

    /// Do not print the periodic status line.
    #[arg(long, overrides_with = "console_hud")]
    pub no_console_hud: bool,

    /// Seconds between two status lines.
    #[arg(long)]
    pub hud_interval: Option<f64>,

    /// Print the status line as one JSON object per line.
    #[arg(long)]
    pub hud_json: bool,

    /// Bind address for the image stream UDP and TCP sockets.
    #[arg(long)]
    pub bridge_ip: Option<String>,

    /// TCP port image subscribers connect to.
    #[arg(long)]
    pub bridge_tcp: Option<u16>,

    /// UDP port image frames arrive on.
    #[arg(long)]
    pub bridge_udp: Option<u16>,

    /// Gimbal generator IP address.
    #[arg(long)]
    pub gen_ip: Option<String>,

    /// Gimbal generator UDP port.
    #[arg(long)]
    pub gen_port: Option<u16>,

    /// Log every gimbal pose packet as hex.
    #[arg(long)]
    pub show_gimbal_packets: bool,

    #[arg(long)]
    pub relay_bind_ip: Option<String>,

    /// UDP port the relay listens on.
    #[arg(long)]
    pub relay_port: Option<u16>,

    #[arg(long)]
    pub relay_raw_ip: Option<String>,

    #[arg(long)]
    pub relay_raw_port: Option<u16>,

    #[arg(long)]
    pub relay_proc_ip: Option<String>,

    #[arg(long)]
    pub relay_proc_port: Option<u16>,

    /// Capture relayed datagrams into the gazebo log.
    #[arg(long, overrides_with = "no_relay_log")]
    pub relay_log: bool,

    #[arg(long, overrides_with = "relay_log")]
    pub no_relay_log: bool,

    /// Capture relayed datagrams into the rover log.
    #[arg(long, overrides_with = "disable_rover_logging")]
    pub enable_rover_logging: bool,

    #[arg(long, overrides_with = "enable_rover_logging")]
    pub disable_rover_logging: bool,
}

/// Collapses a `--flag/--no-flag` pair into an override.
fn flag_pair(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}

impl Cli {
    /// Directory holding `savedata/`: `--base-dir`, else the executable's
    /// directory, else the working directory.
    ///
    /// # Errors
    ///
    /// Returns an error only if none of those can be determined.
    pub fn resolve_base_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.base_dir {
            return Ok(dir.clone());
        }
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(PathBuf::from));
        match exe_dir {
            Some(dir) => Ok(dir),
            None => std::env::current_dir().context("cannot determine a base directory"),
        }
    }

    /// Writes every given option into `config`.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(v) = flag_pair(self.console_hud, self.no_console_hud) {
            config.console_hud = v;
        }
        if let Some(v) = self.hud_interval {
            config.hud_interval = v;
        }

        if let Some(v) = &self.bridge_ip {
            config.bridge.ip = v.clone();
        }
        if let Some(v) = self.bridge_tcp {
            config.bridge.tcp_port = v;
        }
        if let Some(v) = self.bridge_udp {
            config.bridge.udp_port = v;
        }

        if let Some(v) = &self.gen_ip {
            config.gimbal.generator_ip = v.clone();
        }
        if let Some(v) = self.gen_port {
            config.gimbal.generator_port = v;
        }
        if self.show_gimbal_packets {
            config.gimbal.show_packets = true;
        }

        if let Some(v) = &self.relay_bind_ip {
            config.relay.bind_ip = v.clone();
        }
        if let Some(v) = self.relay_port {
            config.relay.bind_port = v;
        }
        if let Some(v) = &self.relay_raw_ip {
            config.relay.raw_ip = v.clone();
        }
        if let Some(v) = self.relay_raw_port {
            config.relay.raw_port = v;
        }
        if let Some(v) = &self.relay_proc_ip {
            config.relay.proc_ip = v.clone();
        }
        if let Some(v) = self.relay_proc_port {
            config.relay.proc_port = v;
        }
        if let Some(v) = flag_pair(self.relay_log, self.no_relay_log) {
            config.relay.log_packets = v;
        }
        if let Some(v) = flag_pair(self.enable_rover_logging, self.disable_rover_logging) {
            config.rover.enable_logging = v;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("rig-bridge").chain(args.iter().copied()))
    }

    #[test]
    fn test_no_arguments_leave_config_untouched() {
        // Arrange
        let cli = parse(&[]);
        let mut cfg = AppConfig::default();

        // Act
        cli.apply(&mut cfg);

        // Assert
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_port_and_ip_overrides() {
        let cli = parse(&[
            "--bridge-ip",
            "127.0.0.1",
            "--bridge-tcp",
            "8000",
            "--bridge-udp",
            "8001",
            "--gen-ip",
            "10.1.1.1",
            "--gen-port",
            "7000",
            "--relay-port",
            "7001",
            "--relay-raw-port",
            "7002",
            "--relay-proc-ip",
            "10.1.1.2",
        ]);
        let mut cfg = AppConfig::default();

        cli.apply(&mut cfg);

        assert_eq!(cfg.bridge.ip, "127.0.0.1");
        assert_eq!(cfg.bridge.tcp_port, 8000);
        assert_eq!(cfg.bridge.udp_port, 8001);
        assert_eq!(cfg.gimbal.generator_ip, "10.1.1.1");
        assert_eq!(cfg.gimbal.generator_port, 7000);
        assert_eq!(cfg.relay.bind_port, 7001);
        assert_eq!(cfg.relay.raw_port, 7002);
        assert_eq!(cfg.relay.proc_ip, "10.1.1.2");
        assert_eq!(cfg.relay.bind_ip, "0.0.0.0");
    }

    #[test]
    fn test_negative_flags_turn_features_off() {
        let cli = parse(&["--no-console-hud", "--no-relay-log", "--disable-rover-logging"]);
        let mut cfg = AppConfig::default();
        cfg.relay.log_packets = true;
        cfg.rover.enable_logging = true;

        cli.apply(&mut cfg);

        assert!(!cfg.console_hud);
        assert!(!cfg.relay.log_packets);
        assert!(!cfg.rover.enable_logging);
    }

    #[test]
    fn test_last_of_a_flag_pair_wins() {
        let cli = parse(&["--no-relay-log", "--relay-log"]);
        let mut cfg = AppConfig::default();

        cli.apply(&mut cfg);

        assert!(cfg.relay.log_packets);
    }

    #[test]
    fn test_hud_and_gimbal_options() {
        let cli = parse(&["--hud-interval", "0.5", "--hud-json", "--show-gimbal-packets"]);
        let mut cfg = AppConfig::default();

        cli.apply(&mut cfg);

        assert_eq!(cfg.hud_interval, 0.5);
        assert!(cfg.gimbal.show_packets);
        assert!(cli.hud_json);
    }

    #[test]
    fn test_explicit_base_dir_is_used() {
        let cli = parse(&["--base-dir", "/srv/rig"]);
        assert_eq!(cli.resolve_base_dir().unwrap(), PathBuf::from("/srv/rig"));
    }

    #[test]
    fn test_flag_pair_resolution() {
        assert_eq!(flag_pair(false, false), None);
        assert_eq!(flag_pair(true, false), Some(true));
        assert_eq!(flag_pair(false, true), Some(false));
    }
}

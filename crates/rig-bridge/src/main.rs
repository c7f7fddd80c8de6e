//! Rig bridge entry point.
//!
//! # Usage
//!
//! ```text
//! rig-bridge [OPTIONS]
//!
//!   --base-dir <DIR>          Directory holding savedata/ [env: RIG_BRIDGE_BASE_DIR]
//!   --console-hud             Print the periodic status line
//!   --no-console-hud          Do not print the status line
//!   --hud-interval <SECS>     Seconds between status lines
//!   --hud-json                Status line as JSON
//!   --bridge-ip <IP>          Image stream bind address
//!   --bridge-tcp <PORT>       Image subscriber TCP port
//!   --bridge-udp <PORT>       Image frame UDP port
//!   --gen-ip <IP>             Gimbal generator address
//!   --gen-port <PORT>         Gimbal generator port
//!   --show-gimbal-packets     Log every pose packet as hex
//!   --relay-bind-ip <IP>      Relay bind address
//!   --relay-port <PORT>       Relay listen port
//!   --relay-raw-ip <IP>       --relay-raw-port <PORT>
//!   --relay-proc-ip <IP>      --relay-proc-port <PORT>
//!   --relay-log / --no-relay-log
//!   --enable-rover-logging / --disable-rover-logging
//! ```
//!
//! Options override `<base-dir>/savedata/config.toml` and are saved back to
//! it.  Log verbosity follows `RUST_LOG` (default `info`).  Ctrl+C or SIGTERM
//! stops every service before exit.

use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rig_bridge::bridge::Bridge;
use rig_bridge::cli::Cli;
use rig_bridge::config::{config_file_path, load_config, save_config, AppConfig};
use rig_bridge::hud::{format_hud_json, format_hud_line, hud_period};
use rig_bridge::signal::ShutdownSignal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ─────────────────────────────────────────────────────────
    let cli = Cli::parse();
    let base_dir = cli.resolve_base_dir()?;
    let config_path = config_file_path(&base_dir);

    let mut config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            warn!("{e}; continuing with default configuration");
            AppConfig::default()
        }
    };
    cli.apply(&mut config);
    config.resolve_capture_conflict();
    match save_config(&config_path, &config) {
        Ok(()) => info!("configuration saved to {}", config_path.display()),
        Err(e) => warn!("could not save configuration: {e}"),
    }

    // Registered before any worker starts, so SIGTERM always reaches stop_all.
    let shutdown = ShutdownSignal::install();

    // ── Services ──────────────────────────────────────────────────────────────
    let bridge = Arc::new(Bridge::new(&config, &base_dir));
    let failed = bridge.start_all();
    if !failed.is_empty() {
        warn!("running without: {}", failed.join(", "));
    }

    let hud = if config.console_hud {
        info!("console HUD enabled");
        let bridge = Arc::clone(&bridge);
        let json = cli.hud_json;
        let mut ticker = tokio::time::interval(hud_period(config.hud_interval));
        Some(tokio::spawn(async move {
            loop {
                ticker.tick().await;
                let snapshot = bridge.snapshot();
                let now = SystemTime::now();
                if json {
                    match format_hud_json(&snapshot, now) {
                        Ok(line) => println!("{line}"),
                        Err(e) => warn!("HUD serialization failed: {e}"),
                    }
                } else {
                    println!("{}", format_hud_line(&snapshot, now));
                }
            }
        }))
    } else {
        None
    };

    info!("rig bridge running; press Ctrl+C to exit");
    let reason = shutdown.wait().await;
    info!("received shutdown request ({reason:?})");

    // ── Shutdown ──────────────────────────────────────────────────────────────
    if let Some(hud) = hud {
        hud.abort();
    }
    // Stopping joins worker threads; keep that off the async workers.
    let stopping = Arc::clone(&bridge);
    tokio::task::spawn_blocking(move || stopping.stop_all())
        .await
        .context("shutdown task panicked")?;

    info!("shutdown complete");
    Ok(())
}

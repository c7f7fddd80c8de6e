//! Console status line.
//!
//! ```text
//! HUD | UDP:on TCP:on Clients:2 LastFrame:48213B (12ms ago) | Gimbal yaw:10 pitch:-5 roll:0 zoom:1 | Relay packets:812 bytes:51968
//! ```

use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::bridge::Snapshot;

/// Period used when the configured interval is not a positive number.
pub const DEFAULT_HUD_PERIOD: Duration = Duration::from_secs(1);

const MIN_HUD_PERIOD_SECS: f64 = 0.001;
const MAX_HUD_PERIOD_SECS: f64 = 3600.0;

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// Converts the configured `hud_interval` (seconds) into a timer period.
///
/// The result is never zero; positive values are clamped to 1 ms ..= 1 h.
pub fn hud_period(seconds: f64) -> Duration {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::from_secs_f64(seconds.clamp(MIN_HUD_PERIOD_SECS, MAX_HUD_PERIOD_SECS))
    } else {
        DEFAULT_HUD_PERIOD
    }
}

/// Age of the current frame at `now`, `None` before the first frame.
pub fn frame_age(snapshot: &Snapshot, now: SystemTime) -> Option<Duration> {
    snapshot
        .image
        .last_frame_time
        .map(|t| now.duration_since(t).unwrap_or(Duration::ZERO))
}

/// Renders the single-line text HUD.
pub fn format_hud_line(snapshot: &Snapshot, now: SystemTime) -> String {
    let img = &snapshot.image;
    let gib = &snapshot.gimbal;
    let rel = &snapshot.relay;
    let age = match frame_age(snapshot, now) {
        Some(age) => format!("{}ms ago", age.as_millis()),
        None => "n/a".to_string(),
    };
    format!(
        "HUD | UDP:{} TCP:{} Clients:{} LastFrame:{}B ({}) | Gimbal yaw:{} pitch:{} roll:{} zoom:{} | Relay packets:{} bytes:{}",
        on_off(img.udp_running),
        on_off(img.tcp_running),
        img.client_count,
        img.last_frame_size,
        age,
        gib.yaw,
        gib.pitch,
        gib.roll,
        gib.zoom,
        rel.forwarded_packet_count,
        rel.forwarded_byte_count,
    )
}

#[derive(Serialize)]
struct HudRecord<'a> {
    #[serde(flatten)]
    snapshot: &'a Snapshot,
    last_frame_age_ms: Option<u64>,
}

/// Renders the snapshot as one JSON object, with the frame age precomputed.
pub fn format_hud_json(snapshot: &Snapshot, now: SystemTime) -> Result<String, serde_json::Error> {
    serde_json::to_string(&HudRecord {
        snapshot,
        last_frame_age_ms: frame_age(snapshot, now)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

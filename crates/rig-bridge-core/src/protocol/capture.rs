//! Capture log line format.
//!
//! One line per packet:
//! ```text
//! YYYY-MM-DD HH:MM:SS.mmm\tlen=<decimal>\t<lowercase hex bytes, space separated>\n
//! ```
//! Session files are named `<prefix>-YYYYMMDD-HHMMSS.log` from the time the
//! capture session started.

use std::fmt::{self, Write as _};

use chrono::{DateTime, TimeZone};

/// Renders `data` as lowercase two-digit hex bytes separated by single spaces.
pub fn hex_dump(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3);
    for (i, byte) in data.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        // Writing into a String cannot fail.
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Builds one newline-terminated capture log line for `packet`.
pub fn format_capture_line<Tz>(timestamp: &DateTime<Tz>, packet: &[u8]) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!(
        "{}\tlen={}\t{}\n",
        timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
        packet.len(),
        hex_dump(packet)
    )
}

/// File name for a capture session that started at `started`.
pub fn session_file_name<Tz>(prefix: &str, started: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!("{prefix}-{}.log", started.format("%Y%m%d-%H%M%S"))
}

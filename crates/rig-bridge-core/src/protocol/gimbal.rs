//! Gimbal pose datagram codec.
//!
//! Wire format (32 bytes, no version field, no checksum):
//! ```text
//! [yaw:4][pitch:4][roll:4][zoom:4][reserved:16]
//! ```
//! Each field is a big-endian `i32` holding `round(value * 100)`.  The
//! reserved tail is always zero.

use serde::Serialize;
use thiserror::Error;

/// Total size of one gimbal datagram.
pub const GIMBAL_PACKET_LEN: usize = 32;

/// Number of leading bytes that carry pose fields.
const POSE_FIELDS_LEN: usize = 16;

/// Fixed-point scale applied to every field before transmission.
const WIRE_SCALE: f64 = 100.0;

/// Errors raised when inspecting a received gimbal datagram.
#[derive(Debug, Error, PartialEq)]
pub enum PacketError {
    #[error("gimbal packet must be {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}

/// Requested gimbal orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pose {
    /// Degrees.
    pub yaw: f64,
    /// Degrees.
    pub pitch: f64,
    /// Degrees.
    pub roll: f64,
    /// Optical zoom multiplier.
    pub zoom: f64,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            zoom: 1.0,
        }
    }
}

/// Converts a pose value to its fixed-point wire representation.
///
/// Rounds half away from zero.  Out-of-range values saturate at the `i32`
/// bounds and NaN encodes as 0.
pub fn scale_to_wire(value: f64) -> i32 {
    (value * WIRE_SCALE).round() as i32
}

/// Encodes `pose` into a 32-byte datagram.
pub fn encode_pose(pose: &Pose) -> [u8; GIMBAL_PACKET_LEN] {
    let mut packet = [0u8; GIMBAL_PACKET_LEN];
    let fields = [pose.yaw, pose.pitch, pose.roll, pose.zoom];
    for (chunk, value) in packet[..POSE_FIELDS_LEN].chunks_exact_mut(4).zip(fields) {
        chunk.copy_from_slice(&scale_to_wire(value).to_be_bytes());
    }
    packet
}

/// Extracts the four scaled fields `[yaw, pitch, roll, zoom]` from a datagram.
///
/// # Errors
///
/// Returns [`PacketError::Length`] unless `packet` is exactly
/// [`GIMBAL_PACKET_LEN`] bytes.
pub fn decode_pose_fields(packet: &[u8]) -> Result<[i32; 4], PacketError> {
    if packet.len() != GIMBAL_PACKET_LEN {
        return Err(PacketError::Length {
            expected: GIMBAL_PACKET_LEN,
            actual: packet.len(),
        });
    }
    let mut fields = [0i32; 4];
    for (field, chunk) in fields.iter_mut().zip(packet[..POSE_FIELDS_LEN].chunks_exact(4)) {
        *field = i32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Ok(fields)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_pose_lays_out_big_endian_fields() {
        // Arrange
        let pose = Pose {
            yaw: 1.0,
            pitch: -1.0,
            roll: 0.5,
            zoom: 2.0,
        };

        // Act
        let packet = encode_pose(&pose);

        // Assert
        assert_eq!(&packet[0..4], &[0x00, 0x00, 0x00, 0x64]);
        assert_eq!(&packet[4..8], &[0xFF, 0xFF, 0xFF, 0x9C]);
        assert_eq!(&packet[8..12], &[0x00, 0x00, 0x00, 0x32]);
        assert_eq!(&packet[12..16], &[0x00, 0x00, 0x00, 0xC8]);
    }

    #[test]
    fn test_encode_pose_reserved_tail_is_zero() {
        let pose = Pose {
            yaw: 359.99,
            pitch: -90.0,
            roll: 12.34,
            zoom: 30.0,
        };
        let packet = encode_pose(&pose);
        assert!(packet[POSE_FIELDS_LEN..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_encode_pose_is_exactly_32_bytes() {
        assert_eq!(encode_pose(&Pose::default()).len(), 32);
    }

    #[test]
    fn test_scale_to_wire_rounds_instead_of_truncating() {
        // 0.29 * 100 is 28.999999999999996 in binary floating point.
        assert_eq!(scale_to_wire(0.29), 29);
        assert_eq!(scale_to_wire(-0.29), -29);
    }

    #[test]
    fn test_scale_to_wire_rounds_half_away_from_zero() {
        assert_eq!(scale_to_wire(0.125), 13);
        assert_eq!(scale_to_wire(-0.125), -13);
    }

    #[test]
    fn test_scale_to_wire_saturates_out_of_range_values() {
        assert_eq!(scale_to_wire(1.0e12), i32::MAX);
        assert_eq!(scale_to_wire(-1.0e12), i32::MIN);
    }

    #[test]
    fn test_scale_to_wire_maps_nan_to_zero() {
        assert_eq!(scale_to_wire(f64::NAN), 0);
    }

    #[test]
    fn test_decode_pose_fields_recovers_scaled_values() {
        // Arrange
        let pose = Pose {
            yaw: -45.67,
            pitch: 12.0,
            roll: 0.004,
            zoom: 1.5,
        };

        // Act
        let fields = decode_pose_fields(&encode_pose(&pose)).unwrap();

        // Assert
        assert_eq!(fields, [-4567, 1200, 0, 150]);
    }

    #[test]
    fn test_decode_pose_fields_rejects_short_packet() {
        let result = decode_pose_fields(&[0u8; 16]);
        assert_eq!(
            result,
            Err(PacketError::Length {
                expected: 32,
                actual: 16
            })
        );
    }

    #[test]
    fn test_default_pose_has_unit_zoom() {
        let pose = Pose::default();
        assert_eq!(pose.zoom, 1.0);
        assert_eq!(pose.yaw, 0.0);
    }
}

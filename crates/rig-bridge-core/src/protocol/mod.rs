//! Wire and on-disk formats.
//!
//! - **`gimbal`** – the fixed 32-byte pose datagram sent to the gimbal generator.
//! - **`capture`** – the text line format of the packet capture log and the
//!   session file naming scheme.

pub mod capture;
pub mod gimbal;

pub use capture::{format_capture_line, hex_dump, session_file_name};
pub use gimbal::{decode_pose_fields, encode_pose, PacketError, Pose, GIMBAL_PACKET_LEN};

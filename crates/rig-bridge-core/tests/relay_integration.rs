//! End-to-end relay tests over loopback, including the capture log.

use std::net::UdpSocket;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rig_bridge_core::{
    BridgeService, CaptureLogger, DatagramRelay, Endpoint, PacketSink, RelayConfig,
};
use uuid::Uuid;

fn wait_for_count(relay: &DatagramRelay, n: u64) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while relay.status().forwarded_packet_count < n {
        assert!(Instant::now() < deadline, "relay never counted {n} packets");
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// Relay on 10707 → raw 10708, proc 10709; one 4-byte datagram.
#[test]
fn test_relay_forwards_four_bytes_to_raw_and_proc() {
    // Arrange
    let raw_rx = UdpSocket::bind("127.0.0.1:10708").expect("bind raw destination");
    let proc_rx = UdpSocket::bind("127.0.0.1:10709").expect("bind proc destination");
    for rx in [&raw_rx, &proc_rx] {
        rx.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    }
    let relay = DatagramRelay::new(
        RelayConfig {
            bind: Endpoint::new("127.0.0.1", 10707),
            raw_target: Endpoint::new("127.0.0.1", 10708),
            proc_target: Endpoint::new("127.0.0.1", 10709),
            enable: true,
        },
        None,
    );
    relay.start().expect("relay start");

    // Act
    let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
    sender
        .send_to(&[0x01, 0x02, 0x03, 0x04], "127.0.0.1:10707")
        .unwrap();

    // Assert
    let mut buf = [0u8; 16];
    let (len, _) = raw_rx.recv_from(&mut buf).expect("raw copy");
    assert_eq!(&buf[..len], &[0x01, 0x02, 0x03, 0x04]);
    let (len, _) = proc_rx.recv_from(&mut buf).expect("proc copy");
    assert_eq!(&buf[..len], &[0x01, 0x02, 0x03, 0x04]);

    wait_for_count(&relay, 1);
    let status = relay.status();
    assert_eq!(status.forwarded_packet_count, 1);
    assert_eq!(status.forwarded_byte_count, 4);

    // Exactly one copy per destination.
    raw_rx
        .set_read_timeout(Some(Duration::from_millis(200)))
        .unwrap();
    assert!(raw_rx.recv_from(&mut buf).is_err(), "duplicate raw copy");

    relay.stop();
    assert!(!relay.status().running);
}

#[test]
fn test_relay_records_datagrams_in_capture_log() {
    // Arrange
    let dir = std::env::temp_dir().join(format!("rig_bridge_relay_{}", Uuid::new_v4()));
    let capture = Arc::new(CaptureLogger::new(dir.join("rover"), "rover"));
    capture.start().expect("capture start");

    let raw_rx = UdpSocket::bind("127.0.0.1:0").unwrap();
    let proc_rx = UdpSocket::bind("127.0.0.1:0").unwrap();
    let relay = DatagramRelay::new(
        RelayConfig {
            bind: Endpoint::new("127.0.0.1", 0),
            raw_target: Endpoint::new("127.0.0.1", raw_rx.local_addr().unwrap().port()),
            proc_target: Endpoint::new("127.0.0.1", proc_rx.local_addr().unwrap().port()),
            enable: true,
        },
        Some(Arc::clone(&capture) as Arc<dyn PacketSink>),
    );
    relay.start().unwrap();
    let ingress = relay.local_addr().unwrap();

    // Act
    let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
    sender.send_to(&[0xDE, 0xAD, 0xBE, 0xEF], ingress).unwrap();
    sender.send_to(&[0x00, 0x7F], ingress).unwrap();
    wait_for_count(&relay, 2);
    relay.stop();
    let path = capture.status().path.expect("open session");
    capture.stop();

    // Assert
    assert_eq!(capture.lines_written(), 2);
    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("\tlen=4\tde ad be ef"), "{:?}", lines[0]);
    assert!(lines[1].ends_with("\tlen=2\t00 7f"), "{:?}", lines[1]);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_relay_skips_stopped_capture_logger() {
    let dir = std::env::temp_dir().join(format!("rig_bridge_relay_{}", Uuid::new_v4()));
    let capture = Arc::new(CaptureLogger::new(&dir, "gazebo"));
    let relay = DatagramRelay::new(
        RelayConfig {
            bind: Endpoint::new("127.0.0.1", 0),
            raw_target: Endpoint::new("127.0.0.1", 9),
            proc_target: Endpoint::new("127.0.0.1", 9),
            enable: true,
        },
        Some(Arc::clone(&capture) as Arc<dyn PacketSink>),
    );
    relay.start().unwrap();

    UdpSocket::bind("127.0.0.1:0")
        .unwrap()
        .send_to(&[1, 2, 3], relay.local_addr().unwrap())
        .unwrap();
    wait_for_count(&relay, 1);
    relay.stop();

    assert_eq!(capture.lines_written(), 0);
    assert!(!dir.exists());
}

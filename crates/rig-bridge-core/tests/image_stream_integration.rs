//! Fan-out integrity: every subscriber sees whole frames only.

use std::io::Read;
use std::net::{TcpStream, UdpSocket};
use std::time::{Duration, Instant};

use rig_bridge_core::{BridgeService, ImageBridgeConfig, ImageStreamBridge};

fn start_bridge() -> ImageStreamBridge {
    let bridge = ImageStreamBridge::new(ImageBridgeConfig {
        bind_ip: "127.0.0.1".to_string(),
        udp_port: 0,
        tcp_port: 0,
    });
    bridge.start().expect("bridge start");
    bridge
}

fn wait_until(mut cond: impl FnMut() -> bool, what: &str) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_concurrent_subscribers_receive_whole_frames() {
    // Arrange: subscribers connect before any frame exists
    let bridge = start_bridge();
    let (udp, tcp) = bridge.local_addrs().unwrap();
    let mut clients: Vec<TcpStream> = (0..3)
        .map(|_| {
            let c = TcpStream::connect(tcp).unwrap();
            c.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
            c
        })
        .collect();
    wait_until(|| bridge.status().client_count == 3, "3 subscribers");

    let frame: Vec<u8> = (0..1500u32).map(|i| (i % 251) as u8).collect();

    // Act
    UdpSocket::bind("127.0.0.1:0")
        .unwrap()
        .send_to(&frame, udp)
        .unwrap();
    wait_until(|| bridge.status().last_frame_size == frame.len(), "frame ingest");

    // Assert: each subscriber's stream is a repetition of the exact frame
    let readers: Vec<_> = clients
        .drain(..)
        .map(|mut client| {
            let expected = frame.clone();
            std::thread::spawn(move || {
                let mut buf = vec![0u8; expected.len() * 3];
                client.read_exact(&mut buf).expect("three frames");
                for chunk in buf.chunks(expected.len()) {
                    assert_eq!(chunk, &expected[..], "torn or concatenated frame");
                }
            })
        })
        .collect();
    for reader in readers {
        reader.join().expect("subscriber assertions");
    }

    bridge.stop();
    assert_eq!(bridge.status().client_count, 0);
}

#[test]
fn test_status_reports_frame_size_after_one_datagram() {
    let bridge = start_bridge();
    let (udp, _) = bridge.local_addrs().unwrap();
    let before = bridge.status();
    assert_eq!(before.last_frame_size, 0);
    assert!(before.last_frame_time.is_none());

    UdpSocket::bind("127.0.0.1:0")
        .unwrap()
        .send_to(&[0xFFu8; 4321], udp)
        .unwrap();

    wait_until(|| bridge.status().last_frame_size == 4321, "frame ingest");
    assert!(bridge.status().last_frame_time.is_some());
    bridge.stop();
}

#[test]
fn test_one_failing_subscriber_does_not_affect_others() {
    // Arrange
    let bridge = start_bridge();
    let (udp, tcp) = bridge.local_addrs().unwrap();
    let doomed = TcpStream::connect(tcp).unwrap();
    let mut survivor = TcpStream::connect(tcp).unwrap();
    survivor
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    wait_until(|| bridge.status().client_count == 2, "2 subscribers");
    let frame = vec![0x42u8; 512];
    UdpSocket::bind("127.0.0.1:0")
        .unwrap()
        .send_to(&frame, udp)
        .unwrap();

    // Act: one subscriber goes away; its worker ends on the next failed write
    drop(doomed);
    wait_until(|| bridge.status().client_count == 1, "doomed subscriber reaped");

    // Assert: the other keeps receiving whole frames
    let mut buf = vec![0u8; frame.len() * 2];
    survivor.read_exact(&mut buf).unwrap();
    assert!(buf.iter().all(|&b| b == 0x42));
    assert!(bridge.status().tcp_running);
    bridge.stop();
}

#[test]
fn test_stalled_subscriber_resumes_with_whole_frames() {
    // Arrange: a frame too large to fit in the socket buffers many times over
    let bridge = start_bridge();
    let (udp, tcp) = bridge.local_addrs().unwrap();
    let mut client = TcpStream::connect(tcp).unwrap();
    wait_until(|| bridge.status().client_count == 1, "subscriber");

    let frame: Vec<u8> = (0..60_001u32).map(|i| (i % 251) as u8).collect();
    UdpSocket::bind("127.0.0.1:0")
        .unwrap()
        .send_to(&frame, udp)
        .unwrap();
    wait_until(|| bridge.status().last_frame_size == frame.len(), "frame ingest");

    // Act: stall well past several write polls, then start reading
    std::thread::sleep(Duration::from_millis(1500));
    client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let mut buf = vec![0u8; frame.len() * 20];
    client.read_exact(&mut buf).expect("twenty frames after the stall");

    // Assert: still connected, and the stream never tore a frame
    for chunk in buf.chunks(frame.len()) {
        assert_eq!(chunk, &frame[..], "torn frame after stall");
    }
    assert_eq!(bridge.status().client_count, 1);

    bridge.stop();
}

//! Integration test: ADTS bytes in, RTP + RTCP out over loopback UDP.
//!
//! Feeds frames through a byte queue into a running packetizer and
//! checks the packets a plain UDP receiver sees.

use std::net::{SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::thread;
use std::time::{Duration, Instant};

use aac_rtp::media::aac::AuHeader;
use aac_rtp::media::adts::AdtsHeader;
use aac_rtp::source::byte_queue;
use aac_rtp::transport::{UdpRtpSender, UdpTransport};
use aac_rtp::{AacAdtsPacketizer, WorkerExit};

fn adts_frame(payload: &[u8], protection_absent: bool) -> Vec<u8> {
    let header = AdtsHeader {
        mpeg_version: 0,
        protection_absent,
        profile: 1,
        sampling_frequency_index: 3,
        channel_configuration: 2,
        frame_length: payload.len() as u32,
        aac_frame_count: 1,
    };
    let mut frame = header.to_bytes();
    frame.extend_from_slice(payload);
    frame
}

fn receiver() -> (UdpSocket, SocketAddr) {
    let sock = UdpSocket::bind("127.0.0.1:0").expect("bind receiver");
    sock.set_read_timeout(Some(Duration::from_secs(3))).unwrap();
    let addr = sock.local_addr().unwrap();
    (sock, addr)
}

fn make_packetizer(rtp: SocketAddr, rtcp: SocketAddr) -> AacAdtsPacketizer {
    let udp = UdpTransport::bind("127.0.0.1:0").expect("bind sender");
    let sender = UdpRtpSender::with_ssrc(udp, rtp, 96, 0x1234_5678);
    let report = sender.sender_report(rtcp);
    let mut packetizer = AacAdtsPacketizer::new(sender, report);
    packetizer.set_sampling_rate(48000).unwrap();
    packetizer
}

struct RtpPacket {
    marker: bool,
    seq: u16,
    ts: u32,
    ssrc: u32,
    au: AuHeader,
    payload: Vec<u8>,
}

fn recv_rtp(sock: &UdpSocket) -> RtpPacket {
    let mut buf = [0u8; 2048];
    let n = sock.recv(&mut buf).expect("RTP packet");
    assert!(n >= 16, "packet too short: {n}");
    assert!(n <= 1400, "packet exceeds max size: {n}");
    assert_eq!(buf[0] >> 6, 2, "RTP version");
    assert_eq!(buf[1] & 0x7f, 96, "payload type");
    RtpPacket {
        marker: buf[1] & 0x80 != 0,
        seq: u16::from_be_bytes([buf[2], buf[3]]),
        ts: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        ssrc: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
        au: AuHeader::parse(&buf[12..n]).expect("AU header"),
        payload: buf[16..n].to_vec(),
    }
}

#[test]
fn stream_over_udp() {
    let (rtp_rx, rtp_addr) = receiver();
    let (rtcp_rx, rtcp_addr) = receiver();
    let mut packetizer = make_packetizer(rtp_addr, rtcp_addr);

    let frames: Vec<Vec<u8>> = vec![
        (0..100u32).map(|i| i as u8).collect(),
        (0..3000u32).map(|i| (i % 251) as u8).collect(),
        vec![0xEE; 10],
    ];

    let (writer, reader) = byte_queue();
    packetizer.set_source(reader).unwrap();
    packetizer.start().expect("start");

    // Garbage before the first sync word must be skipped.
    writer.push(&[0x00, 0xFF, 0x00, 0x42]).unwrap();
    writer.push(&adts_frame(&frames[0], true)).unwrap();
    writer.push(&adts_frame(&frames[1], false)).unwrap();
    writer.push(&adts_frame(&frames[2], true)).unwrap();
    drop(writer);

    // 100 B -> 1 packet, 3000 B -> 3 packets (1384 + 1384 + 232), 10 B -> 1 packet
    let expected_counts = [1usize, 3, 1];
    let mut last_seq: Option<u16> = None;

    for (i, frame) in frames.iter().enumerate() {
        let mut reassembled = Vec::new();
        for k in 0..expected_counts[i] {
            let pkt = recv_rtp(&rtp_rx);
            assert_eq!(pkt.ssrc, 0x1234_5678);
            assert_eq!(pkt.ts, 1024 * (i as u32 + 1), "timestamp of AU {i}");
            assert_eq!(pkt.marker, k == expected_counts[i] - 1, "marker on AU {i}");
            assert_eq!(pkt.au.headers_length_bits, 16);
            assert_eq!(pkt.au.au_size, frame.len() as u32);
            assert_eq!(pkt.au.au_index, 0);
            if let Some(prev) = last_seq {
                assert_eq!(pkt.seq, prev.wrapping_add(1));
            }
            last_seq = Some(pkt.seq);
            reassembled.extend_from_slice(&pkt.payload);
        }
        assert_eq!(&reassembled, frame, "payload of AU {i}");
    }

    let mut buf = [0u8; 64];
    let n = rtcp_rx.recv(&mut buf).expect("RTCP sender report");
    assert_eq!(n, 28);
    assert_eq!(buf[1], 200);
    assert_eq!(u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]), 0x1234_5678);
    assert_eq!(u32::from_be_bytes([buf[16], buf[17], buf[18], buf[19]]), 1024);

    let deadline = Instant::now() + Duration::from_secs(3);
    while packetizer.is_running() {
        assert!(Instant::now() < deadline, "worker did not exit at EOF");
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(packetizer.last_exit(), Some(WorkerExit::StreamClosed));
}

#[test]
fn stop_unblocks_tcp_source() {
    let (_rtp_rx, rtp_addr) = receiver();
    let (_rtcp_rx, rtcp_addr) = receiver();
    let mut packetizer = make_packetizer(rtp_addr, rtcp_addr);

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let source = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
    let (_encoder_side, _) = listener.accept().unwrap();

    packetizer.set_source(source).unwrap();
    packetizer.start().unwrap();
    thread::sleep(Duration::from_millis(100));
    assert!(packetizer.is_running(), "worker blocks on a silent source");

    let started = Instant::now();
    packetizer.stop();
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "stop took {:?}",
        started.elapsed()
    );
    assert!(!packetizer.is_running());
    assert_eq!(packetizer.last_exit(), Some(WorkerExit::Cancelled));
}

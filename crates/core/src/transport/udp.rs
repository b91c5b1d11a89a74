use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::SystemTime;

use super::{RtpTransport, SenderReporter};
use crate::error::{AacRtpError, Result};
use crate::media::rtcp::{SenderReport, ntp_timestamp};
use crate::media::rtp::{RTP_HEADER_LEN, RtpHeader};

/// Shared UDP socket for outbound RTP and RTCP.
///
/// This layer is address-only. [`UdpRtpSender`] and [`UdpSenderReport`]
/// resolve what to send and where; cloning shares the same socket.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

impl UdpTransport {
    /// Bind an ephemeral UDP socket (`0.0.0.0:0`).
    pub fn bind_ephemeral() -> Result<Self> {
        Self::bind("0.0.0.0:0")
    }

    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Send raw bytes to a specific socket address.
    pub fn send_to(&self, payload: &[u8], addr: SocketAddr) -> Result<usize> {
        Ok(self.socket.send_to(payload, addr)?)
    }
}

/// Running sender totals reported in RTCP Sender Reports.
///
/// Both counters wrap at 2^32 as RFC 3550 §6.4.1 expects.
#[derive(Debug, Default)]
pub struct SenderStats {
    packets: AtomicU32,
    octets: AtomicU32,
}

impl SenderStats {
    fn record(&self, payload_len: usize) {
        self.packets.fetch_add(1, Ordering::Relaxed);
        self.octets.fetch_add(payload_len as u32, Ordering::Relaxed);
    }

    pub fn packet_count(&self) -> u32 {
        self.packets.load(Ordering::Relaxed)
    }

    /// Payload octets sent, RTP headers excluded.
    pub fn octet_count(&self) -> u32 {
        self.octets.load(Ordering::Relaxed)
    }
}

/// [`RtpTransport`] that sends to one unicast destination.
#[derive(Debug)]
pub struct UdpRtpSender {
    udp: UdpTransport,
    dest: SocketAddr,
    header: RtpHeader,
    marker: bool,
    stats: Arc<SenderStats>,
}

impl UdpRtpSender {
    /// Create a sender with a random SSRC (RFC 3550 §8.1).
    pub fn new(udp: UdpTransport, dest: SocketAddr, pt: u8) -> Self {
        Self::with_header(udp, dest, RtpHeader::with_random_ssrc(pt))
    }

    pub fn with_ssrc(udp: UdpTransport, dest: SocketAddr, pt: u8, ssrc: u32) -> Self {
        Self::with_header(udp, dest, RtpHeader::new(pt, ssrc))
    }

    fn with_header(udp: UdpTransport, dest: SocketAddr, header: RtpHeader) -> Self {
        tracing::debug!(%dest, "RTP sender created");
        Self {
            udp,
            dest,
            header,
            marker: false,
            stats: Arc::new(SenderStats::default()),
        }
    }

    pub fn ssrc(&self) -> u32 {
        self.header.ssrc
    }

    pub fn stats(&self) -> Arc<SenderStats> {
        self.stats.clone()
    }

    /// Sender Report emitter for this stream, sharing its socket, SSRC and counters.
    ///
    /// `rtcp_dest` is conventionally the receiver's RTP port + 1.
    pub fn sender_report(&self, rtcp_dest: SocketAddr) -> UdpSenderReport {
        UdpSenderReport {
            udp: self.udp.clone(),
            dest: rtcp_dest,
            ssrc: self.header.ssrc,
            stats: self.stats.clone(),
            ntp: SystemTime::now(),
            rtp_timestamp: 0,
        }
    }
}

impl RtpTransport for UdpRtpSender {
    fn set_timestamp(&mut self, timestamp: u64) {
        self.header.set_timestamp(timestamp);
    }

    fn mark_next_packet(&mut self) {
        self.marker = true;
    }

    fn send(&mut self, packet: &mut [u8]) -> Result<()> {
        if packet.len() < RTP_HEADER_LEN {
            return Err(AacRtpError::InvalidPacketSize(packet.len()));
        }
        let marker = std::mem::take(&mut self.marker);
        packet[..RTP_HEADER_LEN].copy_from_slice(&self.header.write(marker));
        self.udp.send_to(packet, self.dest)?;
        self.stats.record(packet.len() - RTP_HEADER_LEN);
        Ok(())
    }
}

/// [`SenderReporter`] that sends RTCP Sender Reports over UDP.
#[derive(Debug)]
pub struct UdpSenderReport {
    udp: UdpTransport,
    dest: SocketAddr,
    ssrc: u32,
    stats: Arc<SenderStats>,
    ntp: SystemTime,
    rtp_timestamp: u64,
}

impl SenderReporter for UdpSenderReport {
    fn set_ntp_timestamp(&mut self, time: SystemTime) {
        self.ntp = time;
    }

    fn set_rtp_timestamp(&mut self, timestamp: u64) {
        self.rtp_timestamp = timestamp;
    }

    fn send(&mut self) -> Result<()> {
        let report = SenderReport {
            ssrc: self.ssrc,
            ntp_timestamp: ntp_timestamp(self.ntp),
            rtp_timestamp: self.rtp_timestamp as u32,
            packet_count: self.stats.packet_count(),
            octet_count: self.stats.octet_count(),
        };
        self.udp.send_to(&report.to_bytes(), self.dest)?;
        tracing::debug!(
            dest = %self.dest,
            rtp_ts = report.rtp_timestamp,
            packets = report.packet_count,
            octets = report.octet_count,
            "RTCP sender report sent"
        );
        Ok(())
    }
}

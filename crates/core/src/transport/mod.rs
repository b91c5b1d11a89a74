//! Outbound transport seams for RTP media and RTCP reports.
//!
//! The packetizer never touches sockets directly. It talks to two
//! collaborators, both driven from the single worker thread:
//!
//! - [`RtpTransport`]: owns the RTP fixed header (version, payload type,
//!   sequence number, SSRC) and puts packets on the wire.
//! - [`SenderReporter`]: builds and sends RTCP Sender Reports.
//!
//! [`udp`] provides implementations of both over one shared UDP socket.

pub mod udp;

use std::time::SystemTime;

use crate::error::Result;

pub use udp::{SenderStats, UdpRtpSender, UdpSenderReport, UdpTransport};

/// RTP packet sink.
pub trait RtpTransport: Send {
    /// Timestamp for every packet sent from now on.
    fn set_timestamp(&mut self, timestamp: u64);

    /// Set the marker bit on the next packet only.
    fn mark_next_packet(&mut self);

    /// Send one packet. The first
    /// [`RTP_HEADER_LEN`](crate::media::rtp::RTP_HEADER_LEN) bytes are
    /// reserved for the fixed header, which the transport fills in.
    fn send(&mut self, packet: &mut [u8]) -> Result<()>;
}

/// RTCP Sender Report emitter.
pub trait SenderReporter: Send {
    /// Wall-clock reference for the next report.
    fn set_ntp_timestamp(&mut self, time: SystemTime);

    /// Media timestamp that corresponds to the wall-clock reference.
    fn set_rtp_timestamp(&mut self, timestamp: u64);

    fn send(&mut self) -> Result<()>;
}

/// In-memory collaborators for unit tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::time::SystemTime;

    use parking_lot::Mutex;

    use super::{RtpTransport, SenderReporter};
    use crate::error::Result;

    #[derive(Debug, Clone)]
    pub struct SentPacket {
        pub timestamp: u64,
        pub marker: bool,
        pub bytes: Vec<u8>,
    }

    /// Records every packet; the header region is left untouched.
    #[derive(Debug, Default)]
    pub struct RecordingTransport {
        pub packets: Vec<SentPacket>,
        timestamp: u64,
        marker: bool,
    }

    impl RtpTransport for RecordingTransport {
        fn set_timestamp(&mut self, timestamp: u64) {
            self.timestamp = timestamp;
        }

        fn mark_next_packet(&mut self) {
            self.marker = true;
        }

        fn send(&mut self, packet: &mut [u8]) -> Result<()> {
            self.packets.push(SentPacket {
                timestamp: self.timestamp,
                marker: std::mem::take(&mut self.marker),
                bytes: packet.to_vec(),
            });
            Ok(())
        }
    }

    /// Shares its log so a test can inspect it while the worker owns the transport.
    #[derive(Debug, Default, Clone)]
    pub struct SharedTransport {
        pub inner: Arc<Mutex<RecordingTransport>>,
    }

    impl RtpTransport for SharedTransport {
        fn set_timestamp(&mut self, timestamp: u64) {
            self.inner.lock().set_timestamp(timestamp);
        }

        fn mark_next_packet(&mut self) {
            self.inner.lock().mark_next_packet();
        }

        fn send(&mut self, packet: &mut [u8]) -> Result<()> {
            self.inner.lock().send(packet)
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SentReport {
        pub rtp_timestamp: u64,
        pub has_ntp: bool,
    }

    #[derive(Debug, Default, Clone)]
    pub struct RecordingReporter {
        pub reports: Arc<Mutex<Vec<SentReport>>>,
        ntp: Option<SystemTime>,
        rtp: u64,
    }

    impl SenderReporter for RecordingReporter {
        fn set_ntp_timestamp(&mut self, time: SystemTime) {
            self.ntp = Some(time);
        }

        fn set_rtp_timestamp(&mut self, timestamp: u64) {
            self.rtp = timestamp;
        }

        fn send(&mut self) -> Result<()> {
            self.reports.lock().push(SentReport {
                rtp_timestamp: self.rtp,
                has_ntp: self.ntp.is_some(),
            });
            Ok(())
        }
    }
}

//! ADTS AAC to RTP packetizer (RFC 3640, aac-hbr mode).
//!
//! Feed an ADTS byte stream in, get paced RTP packets and periodic RTCP
//! Sender Reports out:
//!
//! ```no_run
//! use aac_rtp::source::byte_queue;
//! use aac_rtp::transport::{UdpRtpSender, UdpTransport};
//! use aac_rtp::AacAdtsPacketizer;
//!
//! # fn main() -> aac_rtp::Result<()> {
//! let udp = UdpTransport::bind_ephemeral()?;
//! let sender = UdpRtpSender::new(udp, "127.0.0.1:5004".parse().unwrap(), 96);
//! let report = sender.sender_report("127.0.0.1:5005".parse().unwrap());
//!
//! let (writer, reader) = byte_queue();
//! let mut packetizer = AacAdtsPacketizer::new(sender, report);
//! packetizer.set_sampling_rate(44100)?;
//! packetizer.set_source(reader)?;
//! packetizer.start()?;
//! // encoder pushes ADTS bytes into `writer` ...
//! # drop(writer);
//! packetizer.stop();
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod error;
pub mod media;
pub mod pacing;
pub mod packetizer;
pub mod sdp;
pub mod source;
pub mod transport;

pub use error::{AacRtpError, Result, WorkerExit};
pub use packetizer::{AacAdtsPacketizer, PacketizerConfig};

//! AAC RTP payload format, RFC 3640 `aac-hbr` mode.
//!
//! Each RTP packet carries one AU-header section followed by AAC bytes:
//!
//! ```text
//! +---------------------+------------------------+------------------------+
//! | RTP header (12)     | AU-headers-length (16) | AU-size(13)|AU-index(3)|  raw AAC ...
//! +---------------------+------------------------+------------------------+
//! ```
//!
//! Only one AU is carried per packet. An access unit larger than the
//! packet budget is split into fragments that share the same RTP
//! timestamp; every fragment repeats the AU-header with the size of the
//! *whole* access unit, and only the last fragment has the marker bit set
//! (RFC 3640 §3.2.3).

use std::io::Read;

use super::adts::AdtsReader;
use super::rtp::RTP_HEADER_LEN;
use crate::error::{AacRtpError, Result};
use crate::transport::RtpTransport;

/// Default upper bound on a whole RTP packet (header included).
pub const DEFAULT_MAX_PACKET_SIZE: usize = 1400;

/// Largest UDP payload over IPv4 (65535 - 8 - 20).
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// AU-headers-length field plus one 16-bit AU-header.
pub const AU_HEADER_SECTION_LEN: usize = 4;

/// AU-headers-length value: one 13-bit AU-size + 3-bit AU-index = 16 bits.
pub const AU_HEADERS_LENGTH_BITS: u16 = 16;

/// Samples carried by one AAC access unit.
pub const SAMPLES_PER_FRAME: u32 = 1024;

/// Bytes in front of the AAC payload in every packet.
pub const PACKET_OVERHEAD: usize = RTP_HEADER_LEN + AU_HEADER_SECTION_LEN;

/// Write the 4-byte AU-header section for an access unit of `au_size` bytes.
///
/// AU-index is always 0.
pub fn write_au_header(buf: &mut [u8], au_size: u32) {
    buf[0..2].copy_from_slice(&AU_HEADERS_LENGTH_BITS.to_be_bytes());
    let au_header = ((au_size & 0x1fff) << 3) as u16;
    buf[2..4].copy_from_slice(&au_header.to_be_bytes());
}

/// Decoded AU-header section of a single-AU payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuHeader {
    pub headers_length_bits: u16,
    pub au_size: u32,
    pub au_index: u8,
}

impl AuHeader {
    /// Parse the AU-header section at the start of an RTP payload.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() < AU_HEADER_SECTION_LEN {
            return None;
        }
        let headers_length_bits = u16::from_be_bytes([payload[0], payload[1]]);
        let au_header = u16::from_be_bytes([payload[2], payload[3]]);
        Some(Self {
            headers_length_bits,
            au_size: (au_header >> 3) as u32,
            au_index: (au_header & 0x07) as u8,
        })
    }
}

/// 2-byte MPEG-4 AudioSpecificConfig (ISO/IEC 14496-3 §1.6.2.1).
///
/// `profile` is the ADTS profile field, i.e. audio object type minus one.
pub fn audio_specific_config(profile: u8, sampling_frequency_index: u8, channels: u8) -> u16 {
    let object_type = (profile as u16 + 1) & 0x1f;
    (object_type << 11)
        | ((sampling_frequency_index as u16 & 0x0f) << 7)
        | ((channels as u16 & 0x0f) << 3)
}

/// Splits access units into RTP packets.
///
/// Owns one packet buffer for the lifetime of the worker:
/// `[0..12)` is left to the transport for the RTP header, `[12..16)` holds
/// the AU-header section, the rest receives AAC bytes straight from the
/// reader.
#[derive(Debug)]
pub struct AacPayloader {
    buffer: Vec<u8>,
}

impl AacPayloader {
    /// `max_packet_size` must leave room for at least one AAC byte and fit
    /// in a single UDP datagram.
    pub fn new(max_packet_size: usize) -> Result<Self> {
        if max_packet_size <= PACKET_OVERHEAD || max_packet_size > MAX_UDP_PAYLOAD {
            return Err(AacRtpError::InvalidPacketSize(max_packet_size));
        }
        Ok(Self {
            buffer: vec![0u8; max_packet_size],
        })
    }

    /// Largest AAC fragment one packet can carry.
    pub fn max_fragment_len(&self) -> usize {
        self.buffer.len() - PACKET_OVERHEAD
    }

    /// Number of packets needed for an access unit of `frame_length` bytes.
    pub fn fragment_count(&self, frame_length: u32) -> usize {
        (frame_length as usize).div_ceil(self.max_fragment_len())
    }

    /// Read one access unit from `reader` and hand it to `transport` as
    /// one or more packets. Returns the number of packets sent.
    ///
    /// The caller must already have pushed the AU's timestamp to the
    /// transport. The marker is requested right before the last fragment.
    pub fn send_access_unit<R, T>(
        &mut self,
        reader: &mut AdtsReader<R>,
        frame_length: u32,
        transport: &mut T,
    ) -> Result<usize>
    where
        R: Read,
        T: RtpTransport + ?Sized,
    {
        let max_fragment = self.max_fragment_len();
        let total = frame_length as usize;
        let packets = self.fragment_count(frame_length);

        for index in 0..packets {
            let offset = index * max_fragment;
            let length = std::cmp::min(total - offset, max_fragment);
            if index + 1 == packets {
                transport.mark_next_packet();
            }

            write_au_header(
                &mut self.buffer[RTP_HEADER_LEN..PACKET_OVERHEAD],
                frame_length,
            );
            reader.read_payload(&mut self.buffer[PACKET_OVERHEAD..PACKET_OVERHEAD + length])?;
            transport.send(&mut self.buffer[..PACKET_OVERHEAD + length])?;
        }

        Ok(packets)
    }
}

//! ADTS frame synchronization and header parsing (ISO/IEC 13818-7 §6.2).
//!
//! Every ADTS frame starts with a 7-byte fixed+variable header, followed by
//! a 2-byte CRC when `protection_absent == 0`:
//!
//! ```text
//! byte 0: 1111 1111                         syncword (high 8 bits)
//! byte 1: 1111 I LL P                       syncword (low 4), ID, layer, protection_absent
//! byte 2: PP FFFF p C                       profile, sf_index, private, channel (high bit)
//! byte 3: CC o h c s LL                     channel (low 2), orig, home, copyright bits, frame_length (high 2)
//! byte 4: LLLL LLLL                         frame_length (middle 8)
//! byte 5: LLL BBBBB                         frame_length (low 3), buffer fullness (high 5)
//! byte 6: BBBBBB NN                         buffer fullness (low 6), raw data blocks - 1
//! ```
//!
//! `frame_length` covers the whole ADTS frame including its header, so the
//! raw AAC payload is `frame_length - 7` (or `- 9` with CRC).

use std::io::Read;

use crate::error::{AacRtpError, Result};

/// Length of the ADTS header without CRC.
pub const ADTS_HEADER_LEN: u32 = 7;

/// Length of the optional CRC that follows the header when protection is present.
pub const ADTS_CRC_LEN: u32 = 2;

/// Sampling frequencies indexed by `sampling_frequency_index` (ISO/IEC 14496-3 §1.6.3.4).
pub const SAMPLING_FREQUENCIES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

/// Look up the `sampling_frequency_index` for a rate, if it is one of the standard ones.
pub fn sampling_frequency_index(rate: u32) -> Option<u8> {
    SAMPLING_FREQUENCIES
        .iter()
        .position(|&f| f == rate)
        .map(|i| i as u8)
}

/// Parsed ADTS header for one access unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdtsHeader {
    /// ID bit: 0 for MPEG-4, 1 for MPEG-2.
    pub mpeg_version: u8,
    /// True when no CRC trails the header.
    pub protection_absent: bool,
    /// Profile (audio object type minus one). 1 = AAC LC.
    pub profile: u8,
    pub sampling_frequency_index: u8,
    pub channel_configuration: u8,
    /// Raw AAC payload length: the ADTS `frame_length` minus header and CRC.
    pub frame_length: u32,
    /// Number of raw AAC frames in this ADTS frame (field value + 1).
    pub aac_frame_count: u8,
}

impl AdtsHeader {
    /// Bytes consumed by the header (and CRC, if present) in the stream.
    pub fn header_len(&self) -> u32 {
        header_len(self.protection_absent)
    }

    /// Sampling rate in Hz, if the index is a standard one.
    pub fn sampling_rate(&self) -> Option<u32> {
        SAMPLING_FREQUENCIES
            .get(self.sampling_frequency_index as usize)
            .copied()
    }

    /// Parse the 7 header bytes that start at the sync word.
    ///
    /// Fails with [`AacRtpError::CorruptFrame`] when the 13-bit
    /// `frame_length` does not leave at least one payload byte after the
    /// header, which would otherwise underflow the fragmentation math.
    pub fn parse(bytes: &[u8; 7]) -> Result<Self> {
        let protection_absent = bytes[1] & 0x01 != 0;
        let full_length = ((bytes[3] as u32 & 0x03) << 11)
            | ((bytes[4] as u32) << 3)
            | ((bytes[5] as u32) >> 5);

        let header_len = header_len(protection_absent);
        if full_length <= header_len {
            return Err(AacRtpError::CorruptFrame {
                frame_length: full_length,
                header_len,
            });
        }

        Ok(Self {
            mpeg_version: (bytes[1] >> 3) & 0x01,
            protection_absent,
            profile: bytes[2] >> 6,
            sampling_frequency_index: (bytes[2] >> 2) & 0x0f,
            channel_configuration: ((bytes[2] & 0x01) << 2) | (bytes[3] >> 6),
            frame_length: full_length - header_len,
            aac_frame_count: (bytes[6] & 0x03) + 1,
        })
    }

    /// Serialize this header back into ADTS form.
    ///
    /// Produces 7 bytes, or 9 with a zeroed CRC when protection is present.
    /// Buffer fullness is written as `0x7FF` (variable bit rate).
    pub fn to_bytes(&self) -> Vec<u8> {
        let full_length = self.frame_length + self.header_len();
        let fullness: u32 = 0x7ff;

        let mut out = vec![
            0xff,
            0xf0 | ((self.mpeg_version & 0x01) << 3) | (self.protection_absent as u8),
            ((self.profile & 0x03) << 6)
                | ((self.sampling_frequency_index & 0x0f) << 2)
                | ((self.channel_configuration >> 2) & 0x01),
            ((self.channel_configuration & 0x03) << 6) | ((full_length >> 11) as u8 & 0x03),
            (full_length >> 3) as u8,
            (((full_length & 0x07) as u8) << 5) | ((fullness >> 6) as u8 & 0x1f),
            (((fullness & 0x3f) as u8) << 2) | (self.aac_frame_count.saturating_sub(1) & 0x03),
        ];
        if !self.protection_absent {
            out.extend_from_slice(&[0, 0]);
        }
        out
    }
}

fn header_len(protection_absent: bool) -> u32 {
    if protection_absent {
        ADTS_HEADER_LEN
    } else {
        ADTS_HEADER_LEN + ADTS_CRC_LEN
    }
}

/// Pulls ADTS frames off a byte stream.
///
/// After [`next_header`](Self::next_header) returns, the cursor sits on
/// the first raw AAC byte; the caller must consume exactly
/// `header.frame_length` bytes with [`read_payload`](Self::read_payload)
/// before asking for the next header.
#[derive(Debug)]
pub struct AdtsReader<R> {
    inner: R,
}

impl<R: Read> AdtsReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    fn read_u8(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.inner
            .read_exact(&mut byte)
            .map_err(AacRtpError::from_read)?;
        Ok(byte[0])
    }

    /// Scan forward to the 12-bit sync word `0xFFF`.
    ///
    /// Returns the second sync byte (it carries ID, layer and
    /// protection_absent). A candidate `0xFF` whose successor fails the
    /// nibble check does not swallow anything past that successor.
    pub fn sync(&mut self) -> Result<u8> {
        let mut skipped = 0usize;
        loop {
            if self.read_u8()? != 0xff {
                skipped += 1;
                continue;
            }
            let second = self.read_u8()?;
            if second & 0xf0 == 0xf0 {
                if skipped > 0 {
                    tracing::trace!(skipped, "resynchronized on ADTS sync word");
                }
                return Ok(second);
            }
            skipped += 2;
        }
    }

    /// Synchronize, parse the header and discard the CRC if present.
    pub fn next_header(&mut self) -> Result<AdtsHeader> {
        let mut bytes = [0u8; 7];
        bytes[0] = 0xff;
        bytes[1] = self.sync()?;
        self.inner
            .read_exact(&mut bytes[2..])
            .map_err(AacRtpError::from_read)?;

        let header = AdtsHeader::parse(&bytes)?;

        if !header.protection_absent {
            let mut crc = [0u8; ADTS_CRC_LEN as usize];
            self.inner
                .read_exact(&mut crc)
                .map_err(AacRtpError::from_read)?;
        }

        Ok(header)
    }

    /// Read exactly `buf.len()` raw AAC bytes.
    pub fn read_payload(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf).map_err(AacRtpError::from_read)
    }
}

//! Bitstream parsing and RTP/RTCP wire formats.
//!
//! ## RTP overview (RFC 3550)
//!
//! Each AAC access unit (1024 samples) becomes one or more RTP packets.
//! Every RTP packet carries a 12-byte fixed header ([`rtp::RtpHeader`])
//! containing:
//!
//! - **Sequence number** (16-bit, wrapping): for reordering and loss detection.
//! - **Timestamp** (32-bit): media clock at the audio sampling rate.
//! - **SSRC** (32-bit): randomly chosen to identify the sender.
//! - **Marker bit**: set on the last fragment of an access unit.
//!
//! ## Modules
//!
//! | Module | Format | Reference |
//! |--------|--------|-----------|
//! | [`adts`] | ADTS framing | ISO/IEC 13818-7 §6.2 |
//! | [`aac`] | AAC payload, aac-hbr | [RFC 3640](https://tools.ietf.org/html/rfc3640) |
//! | [`rtp`] | RTP fixed header | [RFC 3550 §5.1](https://tools.ietf.org/html/rfc3550#section-5.1) |
//! | [`rtcp`] | Sender Report | [RFC 3550 §6.4.1](https://tools.ietf.org/html/rfc3550#section-6.4.1) |

pub mod aac;
pub mod adts;
pub mod rtcp;
pub mod rtp;

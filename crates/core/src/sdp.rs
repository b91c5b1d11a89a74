//! SDP (Session Description Protocol) generation (RFC 4566 / RFC 8866).
//!
//! Receivers need an SDP to decode the stream: RFC 3640 payloads are
//! meaningless without `mode`, `config` and the AU-header field sizes.
//!
//! ```text
//! v=0
//! o=- 0 0 IN IP4 <addr>
//! s=<session-name>
//! c=IN IP4 <addr>
//! t=0 0
//! a=tool:aac-rtp
//! a=sendonly
//! m=audio <port> RTP/AVP 96
//! a=rtpmap:96 mpeg4-generic/44100/2
//! a=fmtp:96 streamtype=5; profile-level-id=15; mode=AAC-hbr; config=1210; SizeLength=13; IndexLength=3; IndexDeltaLength=3;
//! ```

use crate::error::{AacRtpError, Result};
use crate::media::aac::audio_specific_config;
use crate::media::adts::sampling_frequency_index;

/// AAC profile (ADTS profile field) for AAC LC.
pub const PROFILE_AAC_LC: u8 = 1;

/// Parameters of the audio track advertised in SDP.
#[derive(Debug, Clone)]
pub struct AudioDescription {
    pub payload_type: u8,
    pub sampling_rate: u32,
    pub channels: u8,
    /// ADTS profile field (audio object type minus one).
    pub profile: u8,
}

impl Default for AudioDescription {
    fn default() -> Self {
        Self {
            payload_type: 96,
            sampling_rate: 44100,
            channels: 1,
            profile: PROFILE_AAC_LC,
        }
    }
}

impl AudioDescription {
    /// AudioSpecificConfig as uppercase hex, for the `config=` fmtp parameter.
    ///
    /// Fails for sampling rates outside the standard ADTS table.
    pub fn config_hex(&self) -> Result<String> {
        let index = sampling_frequency_index(self.sampling_rate)
            .ok_or(AacRtpError::InvalidSamplingRate(self.sampling_rate))?;
        Ok(format!(
            "{:04X}",
            audio_specific_config(self.profile, index, self.channels)
        ))
    }

    /// Media-level attributes. `a=rtpmap` must precede the `a=fmtp` that
    /// references its payload type.
    pub fn sdp_attributes(&self) -> Result<Vec<String>> {
        let pt = self.payload_type;
        let mut rtpmap = format!("a=rtpmap:{} mpeg4-generic/{}", pt, self.sampling_rate);
        if self.channels > 1 {
            rtpmap.push_str(&format!("/{}", self.channels));
        }
        let fmtp = format!(
            "a=fmtp:{} streamtype=5; profile-level-id=15; mode=AAC-hbr; config={}; \
             SizeLength=13; IndexLength=3; IndexDeltaLength=3;",
            pt,
            self.config_hex()?
        );
        Ok(vec![rtpmap, fmtp])
    }
}

/// Generate a complete SDP for one AAC stream sent to `ip:port`.
pub fn generate_sdp(
    audio: &AudioDescription,
    ip: &str,
    port: u16,
    session_name: &str,
) -> Result<String> {
    let mut sdp: Vec<String> = vec![
        "v=0".to_string(),
        format!("o=- 0 0 IN IP4 {}", ip),
        format!("s={}", session_name),
        format!("c=IN IP4 {}", ip),
        "t=0 0".to_string(),
        "a=tool:aac-rtp".to_string(),
        "a=sendonly".to_string(),
        format!("m=audio {} RTP/AVP {}", port, audio.payload_type),
    ];
    sdp.extend(audio.sdp_attributes()?);

    tracing::debug!("SDP: {}", sdp.join("\r\n"));

    Ok(format!("{}\r\n", sdp.join("\r\n")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_description() -> AudioDescription {
        AudioDescription {
            payload_type: 96,
            sampling_rate: 44100,
            channels: 2,
            profile: PROFILE_AAC_LC,
        }
    }

    #[test]
    fn config_for_lc_stereo_44100() {
        assert_eq!(make_description().config_hex().unwrap(), "1210");
    }

    #[test]
    fn nonstandard_rate_rejected() {
        let desc = AudioDescription {
            sampling_rate: 12345,
            ..make_description()
        };
        assert!(matches!(
            desc.config_hex(),
            Err(AacRtpError::InvalidSamplingRate(12345))
        ));
    }

    #[test]
    fn mono_rtpmap_has_no_channel_suffix() {
        let desc = AudioDescription {
            sampling_rate: 8000,
            channels: 1,
            ..make_description()
        };
        let attrs = desc.sdp_attributes().unwrap();
        assert_eq!(attrs[0], "a=rtpmap:96 mpeg4-generic/8000");
        assert!(attrs[1].contains("config=1588;"));
    }

    #[test]
    fn generates_aac_sdp() {
        let sdp = generate_sdp(&make_description(), "192.168.1.100", 5004, "Audio").unwrap();
        assert!(sdp.contains("v=0\r\n"));
        assert!(sdp.contains("c=IN IP4 192.168.1.100\r\n"));
        assert!(sdp.contains("s=Audio\r\n"));
        assert!(sdp.contains("m=audio 5004 RTP/AVP 96\r\n"));
        assert!(sdp.contains("a=rtpmap:96 mpeg4-generic/44100/2\r\n"));
        assert!(sdp.contains("mode=AAC-hbr;"));
        assert!(sdp.contains("SizeLength=13; IndexLength=3; IndexDeltaLength=3;"));

        let rtpmap_idx = sdp.find("a=rtpmap").unwrap();
        let fmtp_idx = sdp.find("a=fmtp").unwrap();
        let m_idx = sdp.find("m=audio").unwrap();
        assert!(m_idx < rtpmap_idx && rtpmap_idx < fmtp_idx);
        assert!(sdp.ends_with("\r\n"));
    }
}

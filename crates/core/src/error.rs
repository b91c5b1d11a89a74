//! Error types for the ADTS-to-RTP packetizer.

use std::fmt;

/// Errors that can occur in the packetizer library.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Input**: [`Io`](Self::Io), [`StreamClosed`](Self::StreamClosed):
///   the byte source failed, ended, or was interrupted by `stop()`.
/// - **Framing**: [`CorruptFrame`](Self::CorruptFrame): an ADTS header
///   whose length field cannot be trusted.
/// - **Lifecycle**: [`AlreadyRunning`](Self::AlreadyRunning),
///   [`NoSource`](Self::NoSource).
/// - **Configuration**: [`InvalidSamplingRate`](Self::InvalidSamplingRate),
///   [`InvalidPacketSize`](Self::InvalidPacketSize).
#[derive(Debug, thiserror::Error)]
pub enum AacRtpError {
    /// Underlying I/O or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte source reached end-of-stream or was interrupted.
    #[error("input stream closed")]
    StreamClosed,

    /// ADTS `frame_length` is smaller than (or equal to) its own header.
    #[error("corrupt ADTS frame: frame_length={frame_length}, header is {header_len} bytes")]
    CorruptFrame { frame_length: u32, header_len: u32 },

    /// Configuration change or restart attempted while the worker is running.
    #[error("packetizer already running")]
    AlreadyRunning,

    /// [`AacAdtsPacketizer::start`](crate::AacAdtsPacketizer::start) was
    /// called without a byte source installed.
    #[error("no input source installed")]
    NoSource,

    /// Sampling rate is zero.
    #[error("invalid sampling rate: {0} Hz")]
    InvalidSamplingRate(u32),

    /// Maximum packet size leaves no room for AAC payload bytes, or does
    /// not fit in one UDP datagram.
    #[error("max packet size {0} must be between 17 and 65507 bytes")]
    InvalidPacketSize(usize),
}

impl AacRtpError {
    /// Classify a read failure: EOF and interrupted reads mean the stream
    /// is gone, anything else is kept as a plain I/O error.
    pub(crate) fn from_read(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionReset
            | ErrorKind::BrokenPipe
            | ErrorKind::NotConnected => Self::StreamClosed,
            _ => Self::Io(err),
        }
    }
}

/// How a worker run ended.
///
/// Tests and supervisors use this to tell a requested shutdown apart from
/// an input that dried up or turned into garbage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    /// `stop()` was requested; any read/sleep failure after that is expected.
    Cancelled,
    /// The source ended or failed without a stop request.
    StreamClosed,
    /// A corrupt ADTS header was detected; nothing was sent for that frame.
    Corrupt { frame_length: u32, header_len: u32 },
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled"),
            Self::StreamClosed => write!(f, "stream closed"),
            Self::Corrupt {
                frame_length,
                header_len,
            } => write!(
                f,
                "corrupt frame (frame_length={frame_length}, header={header_len})"
            ),
        }
    }
}

/// Convenience alias for `Result<T, AacRtpError>`.
pub type Result<T> = std::result::Result<T, AacRtpError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn eof_maps_to_stream_closed() {
        let err = AacRtpError::from_read(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(matches!(err, AacRtpError::StreamClosed));
    }

    #[test]
    fn aborted_maps_to_stream_closed() {
        let err = AacRtpError::from_read(io::Error::from(io::ErrorKind::ConnectionAborted));
        assert!(matches!(err, AacRtpError::StreamClosed));
    }

    #[test]
    fn other_errors_stay_io() {
        let err = AacRtpError::from_read(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, AacRtpError::Io(_)));
    }

    #[test]
    fn corrupt_display() {
        let exit = WorkerExit::Corrupt {
            frame_length: 3,
            header_len: 7,
        };
        assert_eq!(exit.to_string(), "corrupt frame (frame_length=3, header=7)");
    }
}

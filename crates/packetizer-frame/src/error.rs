/// Why a single candidate chunk failed to decode.
///
/// These are per-frame, expected conditions on a noisy link. The streaming
/// layers log and count them; they never abort a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The byte stuffing is inconsistent (bad length marker or embedded delimiter).
    #[error("malformed byte stuffing")]
    Framing,

    /// The un-stuffed record cannot hold an index and a checksum.
    #[error("frame too short ({len} bytes, min {min})")]
    TooShort { len: usize, min: usize },

    /// The payload does not match its CRC-8.
    #[error("checksum mismatch (received {received:#04x}, computed {computed:#04x})")]
    Integrity { received: u8, computed: u8 },
}

/// Errors that can occur while moving frames over a byte stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A chunk could not be decoded into a message.
    #[error("frame decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;

use packetizer_frame::DecodeError;

/// Errors raised while packing or unpacking a payload.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// The value could not be written as MessagePack.
    #[error("msgpack encode failed: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// The payload is not valid MessagePack for the requested type.
    #[error("msgpack decode failed: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// The payload is not valid JSON for the requested type, or the value
    /// could not be written as JSON.
    #[error("json codec failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to turn one wire chunk into a typed value.
///
/// Frame-level and payload-level failures stay distinct: a frame that passes
/// its checksum but carries a payload of the wrong shape is a `Payload` error.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error(transparent)]
    Frame(#[from] DecodeError),

    #[error("payload on index {index}: {source}")]
    Payload {
        index: u8,
        #[source]
        source: PayloadError,
    },
}

pub type Result<T> = std::result::Result<T, PayloadError>;

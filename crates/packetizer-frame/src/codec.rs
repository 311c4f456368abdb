use bytes::{BufMut, Bytes, BytesMut};

use crate::crc::crc8;
use crate::error::DecodeError;

/// Frame terminator. Never appears inside a stuffed frame.
pub const DELIMITER: u8 = 0x00;

/// Smallest valid un-stuffed record: index (1) + checksum (1).
pub const MIN_RECORD_SIZE: usize = 2;

/// Largest payload that keeps a frame within a single stuffing block.
pub const RECOMMENDED_MAX_PAYLOAD: usize = 253;

/// A decoded message on one logical channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// The channel this message belongs to.
    pub index: u8,
    /// The message payload.
    pub payload: Bytes,
}

impl Message {
    /// Create a new message.
    pub fn new(index: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            index,
            payload: payload.into(),
        }
    }

    /// Encode this message into a wire frame.
    pub fn encode(&self) -> Bytes {
        encode(self.index, &self.payload)
    }
}

/// Upper bound on the encoded size of a frame carrying `payload_len` bytes.
pub fn max_frame_size(payload_len: usize) -> usize {
    cobs::max_encoding_length(payload_len + MIN_RECORD_SIZE) + 1
}

/// Encode a frame into the wire format, appending it to `dst`.
///
/// Wire format:
/// ```text
/// ┌───────────────────────────────────────────────────┬──────┐
/// │ COBS( index (1B) │ payload (N B) │ crc8 (1B) )    │ 0x00 │
/// └───────────────────────────────────────────────────┴──────┘
/// ```
///
/// The checksum covers the payload only, not the index.
pub fn encode_frame(index: u8, payload: &[u8], dst: &mut BytesMut) {
    let mut record = Vec::with_capacity(payload.len() + MIN_RECORD_SIZE);
    record.push(index);
    record.extend_from_slice(payload);
    record.push(crc8(payload));

    let stuffed = cobs::encode_vec(&record);
    dst.reserve(stuffed.len() + 1);
    dst.put_slice(&stuffed);
    dst.put_u8(DELIMITER);
}

/// Encode a frame into a fresh buffer.
pub fn encode(index: u8, payload: &[u8]) -> Bytes {
    let mut dst = BytesMut::with_capacity(max_frame_size(payload.len()));
    encode_frame(index, payload, &mut dst);
    dst.freeze()
}

/// Decode one frame.
///
/// `chunk` may or may not include the trailing delimiter. The returned
/// message owns its payload.
pub fn decode(chunk: &[u8]) -> Result<Message, DecodeError> {
    let end = chunk
        .iter()
        .rposition(|&b| b != DELIMITER)
        .map_or(0, |pos| pos + 1);
    let stuffed = &chunk[..end];

    if stuffed.is_empty() {
        return Err(DecodeError::TooShort {
            len: 0,
            min: MIN_RECORD_SIZE,
        });
    }
    // A delimiter inside the chunk means two frames were glued together.
    if stuffed.contains(&DELIMITER) {
        return Err(DecodeError::Framing);
    }

    let record = cobs::decode_vec(stuffed).map_err(|_| DecodeError::Framing)?;
    if record.len() < MIN_RECORD_SIZE {
        return Err(DecodeError::TooShort {
            len: record.len(),
            min: MIN_RECORD_SIZE,
        });
    }

    let index = record[0];
    let received = record[record.len() - 1];
    let payload = &record[1..record.len() - 1];
    let computed = crc8(payload);
    if computed != received {
        return Err(DecodeError::Integrity { received, computed });
    }

    Ok(Message {
        index,
        payload: Bytes::copy_from_slice(payload),
    })
}

/// Default maximum payload size accepted by writers: 64 KiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024;

/// Configuration for framed readers, writers and subscribers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes when sending. Default: 64 KiB.
    pub max_payload_size: usize,
    /// Cap on buffered bytes of a not-yet-terminated frame. `None` is unbounded.
    pub max_buffer_size: Option<usize>,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            max_buffer_size: None,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Frame produced by a peer implementation: index 0x01 carrying
    /// msgpack `[123456789, 123456.789, "123.456789[sec]"]`.
    const PEER_FRAME: [u8; 35] = [
        0x22, 0x01, 0x93, 0xce, 0x07, 0x5b, 0xcd, 0x15, 0xcb, 0x40, 0xfe, 0x24, 0x0c, 0x9f, 0xbe,
        0x76, 0xc9, 0xaf, 0x31, 0x32, 0x33, 0x2e, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x5b, 0x73,
        0x65, 0x63, 0x5d, 0x43, 0x00,
    ];

    #[test]
    fn test_encode_decode_roundtrip() {
        let payload = b"hello, packetizer!";
        let wire = encode(1, payload);

        let msg = decode(&wire).unwrap();
        assert_eq!(msg.index, 1);
        assert_eq!(msg.payload.as_ref(), payload);
    }

    #[test]
    fn test_empty_payload() {
        let wire = encode(0x01, b"");
        assert_eq!(wire.as_ref(), &[0x02, 0x01, 0x01, 0x00]);

        let msg = decode(&wire).unwrap();
        assert_eq!(msg, Message::new(0x01, Bytes::new()));
    }

    #[test]
    fn test_payload_with_zero_bytes() {
        let payload = [0x00, 0x11, 0x00, 0x00, 0x22, 0x00];
        let wire = encode(0, &payload);

        assert_eq!(wire.iter().filter(|&&b| b == DELIMITER).count(), 1);
        assert_eq!(*wire.last().unwrap(), DELIMITER);

        let msg = decode(&wire).unwrap();
        assert_eq!(msg.index, 0);
        assert_eq!(msg.payload.as_ref(), &payload);
    }

    #[test]
    fn test_roundtrip_across_stuffing_block_boundaries() {
        for len in [0usize, 1, 251, 252, 253, 254, 255, 507, 508, 1024] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8 + 1).collect();
            let wire = encode(0xAB, &payload);
            assert_eq!(wire.iter().filter(|&&b| b == DELIMITER).count(), 1);
            assert!(wire.len() <= max_frame_size(len));

            let msg = decode(&wire).unwrap();
            assert_eq!(msg.index, 0xAB, "len {len}");
            assert_eq!(msg.payload.as_ref(), payload.as_slice(), "len {len}");
        }
    }

    #[test]
    fn test_every_index_roundtrips() {
        for index in 0..=u8::MAX {
            let msg = decode(&encode(index, &[index, 0, index])).unwrap();
            assert_eq!(msg.index, index);
            assert_eq!(msg.payload.as_ref(), &[index, 0, index]);
        }
    }

    #[test]
    fn test_decode_peer_frame() {
        let msg = decode(&PEER_FRAME).unwrap();
        assert_eq!(msg.index, 0x01);
        assert_eq!(msg.payload.as_ref(), &PEER_FRAME[2..33]);
    }

    #[test]
    fn test_encode_matches_peer_frame() {
        let wire = encode(0x01, &PEER_FRAME[2..33]);
        assert_eq!(wire.as_ref(), &PEER_FRAME);
    }

    #[test]
    fn test_decode_without_terminator() {
        let msg = decode(&PEER_FRAME[..PEER_FRAME.len() - 1]).unwrap();
        assert_eq!(msg.index, 0x01);
    }

    #[test]
    fn test_decode_with_repeated_terminators() {
        let mut wire = PEER_FRAME.to_vec();
        wire.extend_from_slice(&[0x00, 0x00]);
        assert!(decode(&wire).is_ok());
    }

    #[test]
    fn test_checksum_bit_flips_rejected() {
        let payload = b"integrity";
        let mut record = vec![0x07];
        record.extend_from_slice(payload);
        record.push(crc8(payload));
        let crc_pos = record.len() - 1;

        for bit in 0..8 {
            let mut corrupted = record.clone();
            corrupted[crc_pos] ^= 1 << bit;
            let wire = cobs::encode_vec(&corrupted);
            let err = decode(&wire).unwrap_err();
            assert!(
                matches!(err, DecodeError::Integrity { .. }),
                "bit {bit}: {err:?}"
            );
        }
    }

    #[test]
    fn test_truncated_record_too_short() {
        let payload = [0x42];
        let mut record = vec![0x03];
        record.extend_from_slice(&payload);
        record.push(crc8(&payload));
        record.truncate(record.len() - 2);

        let wire = cobs::encode_vec(&record);
        let err = decode(&wire).unwrap_err();
        assert_eq!(err, DecodeError::TooShort { len: 1, min: 2 });
    }

    #[test]
    fn test_truncated_stuffed_frame_rejected() {
        let wire = encode(0x03, b"truncate me");
        let err = decode(&wire[..wire.len() - 3]).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Framing | DecodeError::TooShort { .. } | DecodeError::Integrity { .. }
        ));
    }

    #[test]
    fn test_malformed_length_marker_does_not_panic() {
        // Marker claims 9 bytes follow, only 2 do.
        assert!(decode(&[0x0A, 0x01, 0x02, 0x00]).is_err());
        assert!(decode(&[0xFF]).is_err());
    }

    #[test]
    fn test_embedded_delimiter_is_framing_error() {
        let mut glued = encode(1, b"a").to_vec();
        glued.extend_from_slice(&encode(2, b"b"));
        assert_eq!(decode(&glued).unwrap_err(), DecodeError::Framing);
    }

    #[test]
    fn test_empty_chunk_too_short() {
        assert!(matches!(
            decode(&[]),
            Err(DecodeError::TooShort { len: 0, .. })
        ));
        assert!(matches!(
            decode(&[0x00]),
            Err(DecodeError::TooShort { len: 0, .. })
        ));
    }

    #[test]
    fn test_encode_frame_appends() {
        let mut buf = BytesMut::new();
        encode_frame(1, b"first", &mut buf);
        let first_len = buf.len();
        encode_frame(2, b"second", &mut buf);

        assert_eq!(decode(&buf[..first_len]).unwrap().payload.as_ref(), b"first");
        assert_eq!(decode(&buf[first_len..]).unwrap().payload.as_ref(), b"second");
    }

    #[test]
    fn test_message_encode() {
        let msg = Message::new(9, "abc");
        assert_eq!(decode(&msg.encode()).unwrap(), msg);
    }
}

//! `tokio_util::codec` adapter for use with `Framed`, `FramedRead` and `FramedWrite`.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

use crate::codec::{decode, encode_frame, max_frame_size, FrameConfig, Message};
use crate::error::FrameError;
use crate::reassembler::Reassembler;
use crate::stats::FeedStats;

/// Frame codec for async byte streams.
///
/// Undecodable chunks are skipped and counted, never surfaced as errors,
/// so a single corrupt frame does not terminate a `Framed` stream.
/// Incoming bytes move into an internal [`Reassembler`], which owns the
/// buffer cap and delimiter handling.
#[derive(Debug, Clone)]
pub struct PacketCodec {
    max_payload_size: usize,
    reassembler: Reassembler,
    stats: FeedStats,
}

impl PacketCodec {
    /// Create a codec with default configuration.
    pub fn new() -> Self {
        Self::with_config(&FrameConfig::default())
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            max_payload_size: config.max_payload_size,
            reassembler: Reassembler::with_max_buffer(config.max_buffer_size),
            stats: FeedStats::default(),
        }
    }

    /// Counters for everything decoded so far.
    pub fn stats(&self) -> FeedStats {
        self.stats
    }

    fn check_payload(&self, len: usize) -> Result<(), FrameError> {
        if len > self.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: len,
                max: self.max_payload_size,
            });
        }
        Ok(())
    }
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for PacketCodec {
    type Item = Message;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, FrameError> {
        if !src.is_empty() {
            let discarded = self.reassembler.extend(&src[..]);
            src.clear();
            if discarded > 0 {
                warn!(discarded, "reassembly buffer overflow, resynchronising");
                self.stats.discarded_bytes += discarded as u64;
            }
        }

        while let Some(chunk) = self.reassembler.next_chunk() {
            match decode(&chunk) {
                Ok(message) => {
                    self.stats.frames += 1;
                    return Ok(Some(message));
                }
                Err(err) => {
                    warn!(error = %err, size = chunk.len(), "skipping undecodable frame");
                    self.stats.record(&err);
                }
            }
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Message>, FrameError> {
        if let Some(message) = self.decode(src)? {
            return Ok(Some(message));
        }
        if self.reassembler.pending() > 0 {
            let tail = self.reassembler.take_pending();
            debug!(size = tail.len(), "dropping unterminated frame at end of stream");
        }
        Ok(None)
    }
}

impl Encoder<Message> for PacketCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), FrameError> {
        <Self as Encoder<(u8, Bytes)>>::encode(self, (item.index, item.payload), dst)
    }
}

impl Encoder<(u8, Bytes)> for PacketCodec {
    type Error = FrameError;

    fn encode(&mut self, item: (u8, Bytes), dst: &mut BytesMut) -> Result<(), FrameError> {
        let (index, payload) = item;
        self.check_payload(payload.len())?;
        dst.reserve(max_frame_size(payload.len()));
        encode_frame(index, &payload, dst);
        Ok(())
    }
}

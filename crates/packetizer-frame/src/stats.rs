use std::ops::AddAssign;

use crate::error::DecodeError;

/// Counters describing what happened to fed bytes.
///
/// Returned per [`feed`](crate::Subscriber::feed) call and accumulated by the
/// subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    /// Chunks that decoded into a message.
    pub frames: u64,
    /// Messages handed to a per-index handler.
    pub delivered: u64,
    /// Messages with no handler for their index.
    pub unrouted: u64,
    /// Chunks with inconsistent stuffing.
    pub framing_errors: u64,
    /// Chunks too short to hold index and checksum.
    pub too_short: u64,
    /// Chunks whose checksum did not match.
    pub integrity_errors: u64,
    /// Bytes dropped by the reassembly buffer cap.
    pub discarded_bytes: u64,
}

impl FeedStats {
    /// Count a decode failure.
    pub fn record(&mut self, err: &DecodeError) {
        match err {
            DecodeError::Framing => self.framing_errors += 1,
            DecodeError::TooShort { .. } => self.too_short += 1,
            DecodeError::Integrity { .. } => self.integrity_errors += 1,
        }
    }

    /// Total number of chunks rejected by the decoder.
    pub fn errors(&self) -> u64 {
        self.framing_errors + self.too_short + self.integrity_errors
    }
}

impl AddAssign for FeedStats {
    fn add_assign(&mut self, rhs: Self) {
        self.frames += rhs.frames;
        self.delivered += rhs.delivered;
        self.unrouted += rhs.unrouted;
        self.framing_errors += rhs.framing_errors;
        self.too_short += rhs.too_short;
        self.integrity_errors += rhs.integrity_errors;
        self.discarded_bytes += rhs.discarded_bytes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_sorts_errors() {
        let mut stats = FeedStats::default();
        stats.record(&DecodeError::Framing);
        stats.record(&DecodeError::TooShort { len: 1, min: 2 });
        stats.record(&DecodeError::Integrity {
            received: 1,
            computed: 2,
        });
        stats.record(&DecodeError::Integrity {
            received: 3,
            computed: 4,
        });

        assert_eq!(stats.framing_errors, 1);
        assert_eq!(stats.too_short, 1);
        assert_eq!(stats.integrity_errors, 2);
        assert_eq!(stats.errors(), 4);
    }

    #[test]
    fn add_assign_accumulates() {
        let mut total = FeedStats {
            frames: 1,
            delivered: 1,
            ..FeedStats::default()
        };
        total += FeedStats {
            frames: 2,
            unrouted: 2,
            discarded_bytes: 10,
            ..FeedStats::default()
        };
        assert_eq!(total.frames, 3);
        assert_eq!(total.delivered, 1);
        assert_eq!(total.unrouted, 2);
        assert_eq!(total.discarded_bytes, 10);
    }
}

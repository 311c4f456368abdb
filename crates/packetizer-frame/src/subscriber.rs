//! Stream feed facade: bytes in, handler calls out.
//!
//! [`Subscriber::feed`] splits the input on delimiters, decodes each chunk
//! and dispatches the resulting messages in wire order. Corrupt chunks are
//! logged, counted and skipped; nothing in a feed can fail.
//!
//! Handlers run synchronously inside `feed`. A slow handler delays the rest
//! of that batch and, when fed from a transport reader thread, further
//! reads. Wrap expensive handlers in a [`QueuedHandler`](crate::QueuedHandler).
//!
//! A `Subscriber` is not internally synchronised. To feed from one thread
//! and subscribe from another, share it as `Arc<Mutex<Subscriber>>`.

use tracing::{debug, warn};

use crate::codec::{decode, FrameConfig};
use crate::reassembler::Reassembler;
use crate::registry::{Delivery, Handler, Registry};
use crate::stats::FeedStats;

/// Reassembles, decodes and dispatches frames from a byte stream.
#[derive(Debug)]
pub struct Subscriber {
    reassembler: Reassembler,
    registry: Registry,
    stats: FeedStats,
}

impl Subscriber {
    /// Create a subscriber with default configuration.
    pub fn new() -> Self {
        Self::with_config(&FrameConfig::default())
    }

    /// Create a subscriber with explicit configuration.
    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            reassembler: Reassembler::with_max_buffer(config.max_buffer_size),
            registry: Registry::new(),
            stats: FeedStats::default(),
        }
    }

    /// Feed received bytes, dispatching every complete frame.
    ///
    /// Returns the counters for this call; they are also added to [`stats`](Self::stats).
    pub fn feed(&mut self, input: &[u8]) -> FeedStats {
        let mut batch = FeedStats::default();

        let discarded = self.reassembler.extend(input);
        if discarded > 0 {
            warn!(discarded, "reassembly buffer overflow, resynchronising");
            batch.discarded_bytes += discarded as u64;
        }

        while let Some(chunk) = self.reassembler.next_chunk() {
            match decode(&chunk) {
                Ok(message) => {
                    batch.frames += 1;
                    debug!(
                        index = message.index,
                        size = message.payload.len(),
                        "decoded frame"
                    );
                    match self.registry.dispatch(message) {
                        Delivery::Delivered => batch.delivered += 1,
                        Delivery::Unrouted => batch.unrouted += 1,
                    }
                }
                Err(err) => {
                    warn!(error = %err, size = chunk.len(), "dropping undecodable frame");
                    batch.record(&err);
                }
            }
        }

        self.stats += batch;
        batch
    }

    /// Register `handler` for `index`, replacing any previous handler.
    pub fn subscribe(&mut self, index: u8, handler: impl Handler + 'static) -> &mut Self {
        self.registry.subscribe(index, handler);
        self
    }

    /// Remove the handler for `index`. Returns whether one was registered.
    pub fn unsubscribe(&mut self, index: u8) -> bool {
        self.registry.unsubscribe(index)
    }

    /// Register a handler that observes every decoded message.
    pub fn subscribe_all(&mut self, handler: impl Handler + 'static) -> &mut Self {
        self.registry.subscribe_all(handler);
        self
    }

    /// Remove the monitor handler. Returns whether one was registered.
    pub fn unsubscribe_all(&mut self) -> bool {
        self.registry.unsubscribe_all()
    }

    /// Borrow the handler registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutably borrow the handler registry.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Counters accumulated over every feed since creation.
    pub fn stats(&self) -> FeedStats {
        self.stats
    }

    /// Bytes of a partial frame waiting for their delimiter.
    pub fn pending(&self) -> usize {
        self.reassembler.pending()
    }

    /// Drop any partial frame. Handlers and counters are kept.
    pub fn reset(&mut self) {
        self.reassembler.clear();
    }
}

impl Default for Subscriber {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};

    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode, encode_frame, Message};

    fn recording(sub: &mut Subscriber, index: u8) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::channel();
        sub.subscribe(index, move |msg: Message| tx.send(msg).unwrap());
        rx
    }

    #[test]
    fn routed_and_unrouted_in_one_feed() {
        let mut sub = Subscriber::new();
        let rx = recording(&mut sub, 0x02);

        let mut wire = BytesMut::new();
        encode_frame(0x02, b"two", &mut wire);
        encode_frame(0x05, b"five", &mut wire);

        let stats = sub.feed(&wire);

        assert_eq!(stats.frames, 2);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.unrouted, 1);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![Message::new(2, "two")]);
    }

    #[test]
    fn registry_edits_apply_to_later_feeds() {
        let mut sub = Subscriber::new();
        let (tx, rx) = mpsc::channel();
        sub.registry_mut()
            .subscribe(0x09, move |msg: Message| tx.send(msg).unwrap());
        assert!(sub.registry().is_subscribed(0x09));

        assert_eq!(sub.feed(&encode(0x09, b"on")).delivered, 1);
        assert!(sub.registry_mut().unsubscribe(0x09));
        assert_eq!(sub.feed(&encode(0x09, b"off")).unrouted, 1);

        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![Message::new(9, "on")]);
    }

    #[test]
    fn unrouted_frame_invokes_nothing() {
        let mut sub = Subscriber::new();
        let stats = sub.feed(&encode(0x33, b"nobody"));
        assert_eq!(stats.unrouted, 1);
        assert_eq!(stats.delivered, 0);
    }

    #[test]
    fn every_split_point_preserves_order() {
        let frames = [
            Message::new(1, vec![0x00u8, 0x01]),
            Message::new(2, Vec::<u8>::new()),
            Message::new(3, b"three".to_vec()),
        ];
        let mut wire = BytesMut::new();
        for msg in &frames {
            encode_frame(msg.index, &msg.payload, &mut wire);
        }

        for a in 1..wire.len() {
            for b in a..wire.len() {
                let mut sub = Subscriber::new();
                let (tx, rx) = mpsc::channel();
                sub.subscribe_all(move |msg: Message| tx.send(msg).unwrap());

                sub.feed(&wire[..a]);
                sub.feed(&wire[a..b]);
                sub.feed(&wire[b..]);

                assert_eq!(rx.try_iter().collect::<Vec<_>>(), frames.to_vec());
                assert_eq!(sub.pending(), 0);
            }
        }
    }

    #[test]
    fn byte_at_a_time() {
        let mut sub = Subscriber::new();
        let rx = recording(&mut sub, 7);
        for byte in encode(7, b"slow").iter() {
            sub.feed(std::slice::from_ref(byte));
        }
        assert_eq!(rx.try_recv().unwrap().payload.as_ref(), b"slow");
    }

    #[test]
    fn corrupt_frame_does_not_block_following_frames() {
        let mut sub = Subscriber::new();
        let rx = recording(&mut sub, 1);

        let mut corrupted = encode(1, b"bad").to_vec();
        let last = corrupted.len() - 2;
        corrupted[last] ^= 0x01;
        if corrupted[last] == 0 {
            corrupted[last] = 0xEE;
        }

        let mut wire = BytesMut::new();
        wire.extend_from_slice(&corrupted);
        wire.extend_from_slice(&[0x01, 0x00]);
        encode_frame(1, b"good", &mut wire);

        let stats = sub.feed(&wire);

        assert_eq!(stats.errors(), 2);
        assert_eq!(stats.delivered, 1);
        assert_eq!(rx.try_recv().unwrap().payload.as_ref(), b"good");
    }

    #[test]
    fn garbage_never_panics() {
        let mut sub = Subscriber::new();
        sub.subscribe_all(|_: Message| {});
        let mut state = 0x1234_5678u32;
        let mut noise = Vec::with_capacity(4096);
        for _ in 0..4096 {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            noise.push(state as u8);
        }
        for piece in noise.chunks(37) {
            sub.feed(piece);
        }
        sub.feed(&[0x00]);

        let stats = sub.stats();
        assert_eq!(stats.frames, stats.unrouted);
        assert_eq!(sub.pending(), 0);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut sub = Subscriber::new();
        let rx = recording(&mut sub, 4);

        sub.feed(&encode(4, b"a"));
        assert!(sub.unsubscribe(4));
        let stats = sub.feed(&encode(4, b"b"));

        assert_eq!(stats.unrouted, 1);
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn stats_accumulate_across_feeds() {
        let mut sub = Subscriber::new();
        sub.subscribe(1, |_: Message| {});
        sub.feed(&encode(1, b"a"));
        sub.feed(&encode(2, b"b"));
        sub.feed(&[0x05, 0x00]);

        let stats = sub.stats();
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.unrouted, 1);
        assert_eq!(stats.errors(), 1);
    }

    #[test]
    fn buffer_cap_resyncs_on_next_frame() {
        let config = FrameConfig {
            max_buffer_size: Some(8),
            ..FrameConfig::default()
        };
        let mut sub = Subscriber::with_config(&config);
        let rx = recording(&mut sub, 1);

        let oversized = encode(1, &[0x55; 32]);
        sub.feed(&oversized[..20]);
        let stats = sub.feed(&oversized[20..]);
        assert!(stats.discarded_bytes > 0);
        assert_eq!(stats.frames, 0);

        sub.feed(&encode(1, b"fits"));
        assert_eq!(rx.try_recv().unwrap().payload.as_ref(), b"fits");
        assert!(sub.stats().discarded_bytes >= 32);
    }

    #[test]
    fn reset_drops_partial_frame() {
        let mut sub = Subscriber::new();
        let rx = recording(&mut sub, 1);
        let wire = encode(1, b"partial");

        sub.feed(&wire[..3]);
        sub.reset();
        assert_eq!(sub.pending(), 0);
        sub.feed(&wire[3..]);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn shared_across_threads() {
        let sub = Arc::new(Mutex::new(Subscriber::new()));
        let (tx, rx) = mpsc::channel();
        sub.lock()
            .unwrap()
            .subscribe(3, move |msg: Message| tx.send(msg).unwrap());

        let feeder = {
            let sub = Arc::clone(&sub);
            std::thread::spawn(move || {
                for i in 0..32u8 {
                    sub.lock().unwrap().feed(&encode(3, &[i]));
                }
            })
        };
        feeder.join().unwrap();

        let payloads: Vec<u8> = rx.try_iter().map(|msg| msg.payload[0]).collect();
        assert_eq!(payloads, (0..32u8).collect::<Vec<_>>());
    }
}

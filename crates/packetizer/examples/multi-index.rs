//! Several indices multiplexed on one byte stream, fed in arbitrary chunks.
//!
//! Shows per-index handlers, the monitor, a queued slow handler, and the
//! counters returned by `feed`.
//!
//! Run with:
//!   cargo run --example multi-index

use std::thread;
use std::time::Duration;

use packetizer::frame::{encode, Message, QueuedHandler, Subscriber};

const COMMAND: u8 = 0x01;
const LOG: u8 = 0x02;
const BULK: u8 = 0x03;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let frames: [(u8, &[u8]); 5] = [
        (COMMAND, b"start"),
        (LOG, b"sensor online"),
        (BULK, &[0x00; 64]),
        (0x7f, b"nobody listens here"),
        (COMMAND, b"stop"),
    ];
    let wire: Vec<u8> = frames
        .iter()
        .flat_map(|(index, payload)| encode(*index, payload))
        .collect();

    let slow = QueuedHandler::spawn(16, |msg: Message| {
        thread::sleep(Duration::from_millis(20));
        eprintln!("[bulk] {} bytes processed", msg.payload.len());
    })?;
    let dropped = slow.dropped_counter();

    let mut subscriber = Subscriber::new();
    subscriber
        .subscribe(COMMAND, |msg: Message| {
            eprintln!("[command] {}", String::from_utf8_lossy(&msg.payload));
        })
        .subscribe(LOG, |msg: Message| {
            eprintln!("[log] {}", String::from_utf8_lossy(&msg.payload));
        })
        .subscribe(BULK, slow)
        .subscribe_all(|msg: Message| {
            eprintln!("[monitor] index={:#04x} size={}", msg.index, msg.payload.len());
        });

    // Arbitrary chunking, as a serial port or socket would deliver it.
    for chunk in wire.chunks(7) {
        subscriber.feed(chunk);
    }

    let stats = subscriber.stats();
    eprintln!(
        "frames={} delivered={} unrouted={} errors={}",
        stats.frames,
        stats.delivered,
        stats.unrouted,
        stats.errors()
    );

    // Dropping the subscriber drains and joins the queued handler.
    drop(subscriber);
    eprintln!(
        "bulk messages dropped: {}",
        dropped.load(std::sync::atomic::Ordering::Relaxed)
    );
    Ok(())
}

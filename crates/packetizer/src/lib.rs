//! Self-delimiting, integrity-checked packets over any byte stream.
//!
//! Each message is an 8-bit index plus a payload, framed with COBS byte
//! stuffing, a CRC-8 of the payload, and a `0x00` terminator. Receivers
//! feed raw bytes in and get checksum-verified messages routed by index.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP and UDP links implementing `Read + Write`
//! - [`frame`]: frame codec, reassembly, dispatch and blocking/async I/O adapters
//! - [`payload`]: MessagePack and JSON payload codecs (behind `payload` feature)
//!
//! ```
//! use std::sync::mpsc;
//!
//! use packetizer::frame::{encode, Message, Subscriber};
//!
//! let (tx, rx) = mpsc::channel();
//! let mut subscriber = Subscriber::new();
//! subscriber.subscribe(0x02, move |msg: Message| tx.send(msg).unwrap());
//!
//! let stats = subscriber.feed(&encode(0x02, b"hello"));
//! assert_eq!(stats.delivered, 1);
//! assert_eq!(rx.recv().unwrap().payload.as_ref(), b"hello");
//! ```

/// Re-export transport types.
pub mod transport {
    pub use packetizer_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use packetizer_frame::*;
}

/// Re-export payload codec types (requires `payload` feature).
#[cfg(feature = "payload")]
pub mod payload {
    pub use packetizer_payload::*;
}

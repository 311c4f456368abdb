//! Delimited packet framing with integrity checks and index multiplexing.
//!
//! Every message travels as one frame:
//! - a 1-byte index selecting the logical channel
//! - the payload bytes
//! - a CRC-8 of the payload
//!
//! The record is COBS-stuffed so it contains no `0x00`, then terminated by a
//! single `0x00` delimiter. Receivers split on delimiters, verify, and route
//! each message to the handler registered for its index.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod crc;
pub mod error;
pub mod queue;
pub mod reader;
pub mod reassembler;
pub mod registry;
pub mod stats;
pub mod subscriber;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::PacketCodec;
pub use codec::{
    decode, encode, encode_frame, max_frame_size, FrameConfig, Message, DEFAULT_MAX_PAYLOAD,
    DELIMITER, MIN_RECORD_SIZE, RECOMMENDED_MAX_PAYLOAD,
};
pub use crc::crc8;
pub use error::{DecodeError, FrameError, Result};
pub use queue::QueuedHandler;
pub use reader::FrameReader;
pub use reassembler::Reassembler;
pub use registry::{Delivery, Handler, Registry};
pub use stats::FeedStats;
pub use subscriber::Subscriber;
pub use writer::FrameWriter;

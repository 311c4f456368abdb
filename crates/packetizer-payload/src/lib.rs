//! Typed payloads for packetizer frames.
//!
//! The frame layer carries opaque bytes. This crate packs values into those
//! bytes with MessagePack or JSON and unpacks them on the receiving side,
//! keeping payload failures separate from frame decode failures.

pub mod codec;
pub mod error;
pub mod typed;

pub use codec::{Json, MsgPack, PayloadCodec};
pub use error::{MessageError, PayloadError, Result};
pub use typed::{decode_value, encode_value, unpack_message, TypedHandler, Value};

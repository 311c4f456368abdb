use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Serialization format for frame payloads.
///
/// The frame layer treats payloads as opaque bytes; both peers must agree
/// on the codec used per index.
pub trait PayloadCodec {
    /// Short format name, used in logs and CLI output.
    fn name(&self) -> &'static str;

    /// Serialize `value` into payload bytes.
    fn pack<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    /// Deserialize payload bytes into a `T`.
    fn unpack<T: DeserializeOwned>(&self, payload: &[u8]) -> Result<T>;
}

/// MessagePack payloads via `rmp-serde`.
///
/// Compact mode writes structs as arrays (field order matters, names are not
/// sent). Named mode writes structs as maps keyed by field name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MsgPack {
    named: bool,
}

impl MsgPack {
    /// Structs as positional arrays.
    pub const fn compact() -> Self {
        Self { named: false }
    }

    /// Structs as maps keyed by field name.
    pub const fn named() -> Self {
        Self { named: true }
    }

    pub fn is_named(&self) -> bool {
        self.named
    }
}

impl PayloadCodec for MsgPack {
    fn name(&self) -> &'static str {
        if self.named {
            "msgpack-named"
        } else {
            "msgpack"
        }
    }

    fn pack<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let bytes = if self.named {
            rmp_serde::to_vec_named(value)?
        } else {
            rmp_serde::to_vec(value)?
        };
        Ok(bytes)
    }

    fn unpack<T: DeserializeOwned>(&self, payload: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(payload)?)
    }
}

/// JSON payloads via `serde_json`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Json;

impl PayloadCodec for Json {
    fn name(&self) -> &'static str {
        "json"
    }

    fn pack<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn unpack<T: DeserializeOwned>(&self, payload: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(payload)?)
    }
}

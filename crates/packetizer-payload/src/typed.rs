use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;
use packetizer_frame::{decode, encode, Handler, Message};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::codec::PayloadCodec;
use crate::error::{MessageError, PayloadError, Result};

/// A typed value received on an index.
#[derive(Debug, Clone, PartialEq)]
pub struct Value<T> {
    pub index: u8,
    pub value: T,
}

/// Pack `value` with `codec` and frame it on `index`.
pub fn encode_value<C, T>(codec: &C, index: u8, value: &T) -> Result<Bytes>
where
    C: PayloadCodec,
    T: Serialize + ?Sized,
{
    let payload = codec.pack(value)?;
    Ok(encode(index, &payload))
}

/// Decode one wire chunk and unpack its payload.
pub fn decode_value<C, T>(codec: &C, chunk: &[u8]) -> std::result::Result<Value<T>, MessageError>
where
    C: PayloadCodec,
    T: DeserializeOwned,
{
    let message = decode(chunk)?;
    unpack_message(codec, &message)
}

/// Unpack the payload of an already decoded message.
pub fn unpack_message<C, T>(
    codec: &C,
    message: &Message,
) -> std::result::Result<Value<T>, MessageError>
where
    C: PayloadCodec,
    T: DeserializeOwned,
{
    let value = codec
        .unpack(&message.payload)
        .map_err(|source| MessageError::Payload {
            index: message.index,
            source,
        })?;
    Ok(Value {
        index: message.index,
        value,
    })
}

type ErrorCallback = Box<dyn FnMut(u8, PayloadError) + Send>;

/// Handler that unpacks payloads into `T` before calling back.
///
/// Payloads that fail to unpack never reach the callback; they go to the
/// error callback, which logs a warning unless replaced with
/// [`on_error`](Self::on_error).
pub struct TypedHandler<C, T, F> {
    codec: C,
    callback: F,
    on_error: ErrorCallback,
    _value: PhantomData<fn() -> T>,
}

impl<C, T, F> TypedHandler<C, T, F>
where
    C: PayloadCodec + Send,
    T: DeserializeOwned,
    F: FnMut(u8, T) + Send,
{
    pub fn new(codec: C, callback: F) -> Self {
        Self {
            codec,
            callback,
            on_error: Box::new(|index, err| {
                warn!(index, error = %err, "dropping message with undecodable payload");
            }),
            _value: PhantomData,
        }
    }

    /// Replace the unpack failure callback.
    pub fn on_error(mut self, on_error: impl FnMut(u8, PayloadError) + Send + 'static) -> Self {
        self.on_error = Box::new(on_error);
        self
    }
}

impl<C, T, F> Handler for TypedHandler<C, T, F>
where
    C: PayloadCodec + Send,
    T: DeserializeOwned,
    F: FnMut(u8, T) + Send,
{
    fn handle(&mut self, message: Message) {
        match self.codec.unpack::<T>(&message.payload) {
            Ok(value) => (self.callback)(message.index, value),
            Err(err) => (self.on_error)(message.index, err),
        }
    }
}

impl<C: PayloadCodec, T, F> fmt::Debug for TypedHandler<C, T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedHandler")
            .field("codec", &self.codec.name())
            .field("value", &std::any::type_name::<T>())
            .finish()
    }
}

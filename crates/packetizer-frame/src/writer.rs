use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use packetizer_transport::Link;
use tracing::trace;

use crate::codec::{encode_frame, max_frame_size, FrameConfig, Message};
use crate::error::{FrameError, Result};
use crate::reader::transport_to_frame_error;

/// Encodes packets onto a blocking byte sink.
///
/// A frame is handed to the sink in a single `write_all`, so a datagram
/// link carries exactly one frame per datagram. Write timeouts surface as
/// `FrameError::Io` with kind `WouldBlock` or `TimedOut`.
pub struct FrameWriter<T> {
    inner: T,
    frame: BytesMut,
    max_payload_size: usize,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            frame: BytesMut::new(),
            max_payload_size: config.max_payload_size,
        }
    }

    /// Send `message` on its own index.
    pub fn write_message(&mut self, message: &Message) -> Result<usize> {
        self.send(message.index, message.payload.as_ref())
    }

    /// Encode `payload` on `index`, write the whole frame and flush.
    ///
    /// Returns the number of wire bytes written, delimiter included.
    pub fn send(&mut self, index: u8, payload: &[u8]) -> Result<usize> {
        if payload.len() > self.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.max_payload_size,
            });
        }

        self.frame.clear();
        self.frame.reserve(max_frame_size(payload.len()));
        encode_frame(index, payload, &mut self.frame);
        trace!(index, size = payload.len(), wire = self.frame.len(), "sending frame");

        self.inner.write_all(&self.frame).map_err(sink_error)?;
        self.inner.flush().map_err(sink_error)?;
        Ok(self.frame.len())
    }

    /// Wire bytes of the most recent frame, empty before the first send.
    pub fn last_frame(&self) -> &[u8] {
        &self.frame
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl FrameWriter<Link> {
    /// Wrap a `Link`, applying `config.write_timeout` to it.
    pub fn with_config_link(inner: Link, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

fn sink_error(err: std::io::Error) -> FrameError {
    match err.kind() {
        ErrorKind::WriteZero => FrameError::ConnectionClosed,
        _ => FrameError::Io(err),
    }
}

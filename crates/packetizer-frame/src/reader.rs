use std::io::{ErrorKind, Read};

use bytes::Bytes;
use packetizer_transport::Link;
use tracing::warn;

use crate::codec::{decode, FrameConfig, Message};
use crate::error::{FrameError, Result};
use crate::reassembler::Reassembler;
use crate::stats::FeedStats;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete messages from any `Read` stream.
///
/// Handles partial reads internally. Callers always get complete,
/// checksum-verified messages. Corrupt frames are skipped and counted.
pub struct FrameReader<T> {
    inner: T,
    reassembler: Reassembler,
    config: FrameConfig,
    stats: FeedStats,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            reassembler: Reassembler::with_max_buffer(config.max_buffer_size),
            config,
            stats: FeedStats::default(),
        }
    }

    /// Read the next valid message (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_message(&mut self) -> Result<Message> {
        loop {
            if let Some(message) = self.next_buffered() {
                return Ok(message);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            let discarded = self.reassembler.extend(&chunk[..read]);
            if discarded > 0 {
                warn!(discarded, "reassembly buffer overflow, resynchronising");
                self.stats.discarded_bytes += discarded as u64;
            }
        }
    }

    fn next_buffered(&mut self) -> Option<Message> {
        while let Some(chunk) = self.reassembler.next_chunk() {
            match decode(&chunk) {
                Ok(message) => {
                    self.stats.frames += 1;
                    return Some(message);
                }
                Err(err) => {
                    warn!(error = %err, size = chunk.len(), "skipping undecodable frame");
                    self.stats.record(&err);
                }
            }
        }
        None
    }

    /// Counters for frames read so far.
    pub fn stats(&self) -> FeedStats {
        self.stats
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    ///
    /// Bytes still buffered (not yet read as messages) are returned alongside it.
    pub fn into_inner(mut self) -> (T, Bytes) {
        let rest = self.reassembler.take_pending();
        (self.inner, rest)
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<Message>;

    /// Yields messages until the stream closes; `ConnectionClosed` ends iteration.
    fn next(&mut self) -> Option<Self::Item> {
        match self.read_message() {
            Ok(message) => Some(Ok(message)),
            Err(FrameError::ConnectionClosed) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

impl FrameReader<Link> {
    /// Create a frame reader for a `Link` and apply read timeout from config.
    pub fn with_config_link(inner: Link, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: packetizer_transport::TransportError) -> FrameError {
    match err {
        packetizer_transport::TransportError::Io(io)
        | packetizer_transport::TransportError::Accept(io) => FrameError::Io(io),
        packetizer_transport::TransportError::Bind { source, .. }
        | packetizer_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode, encode_frame};

    #[test]
    fn read_single_message() {
        let wire = encode(1, b"hello");

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let msg = reader.read_message().unwrap();

        assert_eq!(msg.index, 1);
        assert_eq!(msg.payload.as_ref(), b"hello");
    }

    #[test]
    fn read_multiple_messages() {
        let mut wire = BytesMut::new();
        encode_frame(1, b"one", &mut wire);
        encode_frame(2, b"two", &mut wire);
        encode_frame(3, b"three", &mut wire);

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));

        let m1 = reader.read_message().unwrap();
        let m2 = reader.read_message().unwrap();
        let m3 = reader.read_message().unwrap();

        assert_eq!((m1.index, m1.payload.as_ref()), (1, b"one".as_ref()));
        assert_eq!((m2.index, m2.payload.as_ref()), (2, b"two".as_ref()));
        assert_eq!((m3.index, m3.payload.as_ref()), (3, b"three".as_ref()));
    }

    #[test]
    fn read_message_with_large_payload() {
        let payload: Vec<u8> = (0..64 * 1024).map(|i| (i % 256) as u8).collect();
        let wire = encode(9, &payload);

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let msg = reader.read_message().unwrap();

        assert_eq!(msg.index, 9);
        assert_eq!(msg.payload.as_ref(), payload.as_slice());
    }

    #[test]
    fn partial_read_handling() {
        let wire = encode(4, b"slow");

        let byte_reader = ByteByByteReader {
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        let msg = reader.read_message().unwrap();
        assert_eq!(msg.index, 4);
        assert_eq!(msg.payload.as_ref(), b"slow");
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame_keeps_partial_bytes() {
        let wire = encode(2, b"only-part");
        let partial = wire[..5].to_vec();

        let mut reader = FrameReader::new(Cursor::new(partial.clone()));
        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));

        let (_inner, rest) = reader.into_inner();
        assert_eq!(rest.as_ref(), partial.as_slice());
    }

    #[test]
    fn corrupt_frame_skipped() {
        let mut wire = BytesMut::new();
        wire.extend_from_slice(&[0x09, 0x01, 0x02, 0x00]);
        encode_frame(6, b"after", &mut wire);

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let msg = reader.read_message().unwrap();

        assert_eq!(msg.index, 6);
        assert_eq!(reader.stats().errors(), 1);
        assert_eq!(reader.stats().frames, 1);
    }

    #[test]
    fn iterator_stops_at_eof() {
        let mut wire = BytesMut::new();
        for i in 0..4u8 {
            encode_frame(i, &[i; 3], &mut wire);
        }

        let reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let indices: Vec<u8> = reader.map(|msg| msg.unwrap().index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            if buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_pipe() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.send(1, b"ping").unwrap();
        let msg = reader.read_message().unwrap();

        assert_eq!(msg.index, 1);
        assert_eq!(msg.payload.as_ref(), b"ping");
    }

    #[test]
    fn read_would_block_propagates_io_error() {
        let wire = encode(7, b"ok");

        let reader = WouldBlockThenData {
            state: 0,
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let err = framed.read_message().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    struct WouldBlockThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for WouldBlockThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn interrupted_read_retries() {
        let wire = encode(8, b"ok");

        let reader = InterruptedThenData {
            state: 0,
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let msg = framed.read_message().unwrap();

        assert_eq!(msg.index, 8);
        assert_eq!(msg.payload.as_ref(), b"ok");
    }

    struct InterruptedThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn roundtrip_over_tcp_link() {
        let acceptor = packetizer_transport::TcpAcceptor::bind("127.0.0.1:0".parse().unwrap())
            .unwrap();
        let addr = acceptor.local_addr();

        let server = std::thread::spawn(move || {
            let link = acceptor.accept().unwrap();
            let cfg = FrameConfig {
                read_timeout: Some(std::time::Duration::from_secs(5)),
                ..FrameConfig::default()
            };
            let mut reader = FrameReader::with_config_link(link, cfg).unwrap();
            let msg = reader.read_message().unwrap();
            assert_eq!(msg.index, 11);
            assert_eq!(msg.payload.as_ref(), b"tcp");
        });

        let link = Link::tcp(addr).unwrap();
        let mut writer = crate::writer::FrameWriter::new(link);
        writer.send(11, b"tcp").unwrap();

        server.join().unwrap();
    }
}

use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, UdpSocket};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Largest payload a single UDP datagram can carry.
const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Which kind of transport backs a [`Link`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Tcp,
    Udp,
}

impl LinkKind {
    /// Transport name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            LinkKind::Tcp => "tcp",
            LinkKind::Udp => "udp",
        }
    }
}

/// A byte transport implementing `Read + Write`.
///
/// TCP links behave like any stream. UDP links map one `write` to one
/// datagram and one `read` to one received datagram. A UDP link created with
/// [`Link::udp_bind`] is not connected: it reads from any sender and writes
/// back to the most recent one.
pub struct Link {
    inner: LinkInner,
}

enum LinkInner {
    Tcp(TcpStream),
    Udp {
        socket: UdpSocket,
        connected: bool,
        last_peer: Option<SocketAddr>,
    },
}

impl Link {
    /// Connect a TCP stream to `addr` (blocking).
    pub fn tcp(addr: SocketAddr) -> Result<Self> {
        let stream =
            TcpStream::connect(addr).map_err(|source| TransportError::Connect { addr, source })?;
        stream.set_nodelay(true)?;
        info!(%addr, "connected tcp link");
        Ok(Self::from_tcp(stream))
    }

    /// Create a UDP link bound to `local` that only talks to `peer`.
    pub fn udp(local: SocketAddr, peer: SocketAddr) -> Result<Self> {
        let socket =
            UdpSocket::bind(local).map_err(|source| TransportError::Bind { addr: local, source })?;
        socket
            .connect(peer)
            .map_err(|source| TransportError::Connect { addr: peer, source })?;
        info!(%local, %peer, "opened udp link");
        Ok(Self {
            inner: LinkInner::Udp {
                socket,
                connected: true,
                last_peer: Some(peer),
            },
        })
    }

    /// Create an unconnected UDP link bound to `local`.
    pub fn udp_bind(local: SocketAddr) -> Result<Self> {
        let socket =
            UdpSocket::bind(local).map_err(|source| TransportError::Bind { addr: local, source })?;
        info!(%local, "listening on udp");
        Ok(Self {
            inner: LinkInner::Udp {
                socket,
                connected: false,
                last_peer: None,
            },
        })
    }

    pub(crate) fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: LinkInner::Tcp(stream),
        }
    }

    /// The transport backing this link.
    pub fn kind(&self) -> LinkKind {
        match &self.inner {
            LinkInner::Tcp(_) => LinkKind::Tcp,
            LinkInner::Udp { .. } => LinkKind::Udp,
        }
    }

    /// Local address of the underlying socket.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        match &self.inner {
            LinkInner::Tcp(stream) => stream.local_addr().map_err(Into::into),
            LinkInner::Udp { socket, .. } => socket.local_addr().map_err(Into::into),
        }
    }

    /// Remote address, if known. For an unconnected UDP link this is the last sender.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        match &self.inner {
            LinkInner::Tcp(stream) => stream.peer_addr().ok(),
            LinkInner::Udp { last_peer, .. } => *last_peer,
        }
    }

    /// Set read timeout on the underlying socket.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            LinkInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            LinkInner::Udp { socket, .. } => socket.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying socket.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            LinkInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            LinkInner::Udp { socket, .. } => socket.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this link (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            LinkInner::Tcp(stream) => Ok(Self::from_tcp(stream.try_clone()?)),
            LinkInner::Udp {
                socket,
                connected,
                last_peer,
            } => Ok(Self {
                inner: LinkInner::Udp {
                    socket: socket.try_clone()?,
                    connected: *connected,
                    last_peer: *last_peer,
                },
            }),
        }
    }
}

impl Read for Link {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            LinkInner::Tcp(stream) => stream.read(buf),
            LinkInner::Udp {
                socket,
                connected: true,
                ..
            } => socket.recv(buf),
            LinkInner::Udp {
                socket, last_peer, ..
            } => {
                let (n, from) = socket.recv_from(buf)?;
                if *last_peer != Some(from) {
                    debug!(%from, "udp sender changed");
                }
                *last_peer = Some(from);
                Ok(n)
            }
        }
    }
}

impl Write for Link {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            LinkInner::Tcp(stream) => stream.write(buf),
            LinkInner::Udp { .. } if buf.len() > MAX_DATAGRAM_SIZE => Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!(
                    "datagram too large ({} bytes, max {MAX_DATAGRAM_SIZE})",
                    buf.len()
                ),
            )),
            LinkInner::Udp {
                socket,
                connected: true,
                ..
            } => socket.send(buf),
            LinkInner::Udp {
                socket, last_peer, ..
            } => match last_peer {
                Some(peer) => socket.send_to(buf, *peer),
                None => Err(std::io::Error::new(
                    ErrorKind::NotConnected,
                    "no udp peer to reply to yet",
                )),
            },
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            LinkInner::Tcp(stream) => stream.flush(),
            LinkInner::Udp { .. } => Ok(()),
        }
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("type", &self.kind().name())
            .field("peer", &self.peer_addr())
            .finish()
    }
}

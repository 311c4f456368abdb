use std::net::{SocketAddr, TcpListener};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::link::Link;

/// TCP listener producing [`Link`]s.
pub struct TcpAcceptor {
    listener: TcpListener,
    addr: SocketAddr,
}

impl TcpAcceptor {
    /// Bind and listen on `addr`. Port 0 picks an ephemeral port.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let listener =
            TcpListener::bind(addr).map_err(|source| TransportError::Bind { addr, source })?;
        let addr = listener.local_addr()?;
        info!(%addr, "listening on tcp");
        Ok(Self { listener, addr })
    }

    /// Accept an incoming connection.
    ///
    /// Blocks unless [`set_nonblocking`](Self::set_nonblocking) is on, in which
    /// case no pending connection is `TransportError::Accept` with
    /// `ErrorKind::WouldBlock`. Accepted links are always blocking.
    pub fn accept(&self) -> Result<Link> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        debug!(%peer, "accepted connection");
        Ok(Link::from_tcp(stream))
    }

    /// Toggle non-blocking accept, for loops that poll a shutdown flag.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.listener.set_nonblocking(nonblocking)?;
        Ok(())
    }

    /// The address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "tcp"
    }
}

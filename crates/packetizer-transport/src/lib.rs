//! Byte transports for packetizer framing.
//!
//! The framing layer only needs "read available bytes" and "write bytes".
//! This crate provides those primitives over:
//! - TCP streams (reliable, ordered byte stream)
//! - UDP sockets (one frame per datagram; lost datagrams drop whole frames)
//!
//! Everything else builds on the [`Link`] type provided here.

pub mod error;
pub mod link;
pub mod tcp;

pub use error::{Result, TransportError};
pub use link::{Link, LinkKind};
pub use tcp::TcpAcceptor;

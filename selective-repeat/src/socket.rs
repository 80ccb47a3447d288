//! UDP transport for [`Packet`]s.
//!
//! One datagram carries exactly one encoded packet.  The checksum is left
//! alone here: a datagram that decodes is handed up even if damaged, since
//! the entities treat corruption the same way they treat loss.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::UdpSocket;

use crate::packet::{Packet, PacketError, WIRE_LEN};

/// One byte of headroom so an oversized datagram shows up as
/// `LengthMismatch` rather than being cut down to a valid-looking packet.
const RECV_BUF: usize = WIRE_LEN + 1;

#[derive(Error, Debug)]
pub enum SocketError {
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A datagram arrived that is not a well-formed packet.
    #[error("malformed datagram: {0}")]
    Packet(#[from] PacketError),
}

/// A UDP socket that sends and receives whole packets.
#[derive(Debug)]
pub struct Socket {
    /// Resolved local address (the real port when bound to port 0).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    pub async fn bind(addr: SocketAddr) -> Result<Self, SocketError> {
        let inner = UdpSocket::bind(addr).await?;
        Ok(Self {
            local_addr: inner.local_addr()?,
            inner,
        })
    }

    pub async fn send_to(&self, packet: &Packet, dest: SocketAddr) -> Result<(), SocketError> {
        let wire = packet.encode();
        let n = self.inner.send_to(&wire, dest).await?;
        debug_assert_eq!(n, WIRE_LEN);
        Ok(())
    }

    /// Wait for the next datagram and decode it.
    ///
    /// A malformed datagram is consumed and reported as
    /// [`SocketError::Packet`]; the socket stays usable.
    pub async fn recv_from(&self) -> Result<(Packet, SocketAddr), SocketError> {
        let mut buf = [0u8; RECV_BUF];
        let (n, src) = self.inner.recv_from(&mut buf).await?;
        Ok((Packet::decode(&buf[..n])?, src))
    }
}

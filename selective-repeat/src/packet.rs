//! Packet model and wire format.
//!
//! Every datagram exchanged between the two entities is a [`Packet`]
//! carrying exactly one fixed-size [`Message`].  Data packets travel A → B,
//! acknowledgements B → A.
//!
//! # Wire format
//!
//! All integers are **big-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Sequence Number                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |              Acknowledgment Number (-1 = none)                |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           Checksum                            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     Payload (20 bytes) ...                    |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Decoding never verifies the checksum.  A corrupted packet must reach the
//! protocol entity, which treats it exactly like a lost one.

use std::fmt;

use thiserror::Error;

use crate::checksum::checksum;
use crate::seq::{SeqNum, NOT_IN_USE, SEQ_SPACE};

/// Bytes of application data carried by every packet.
pub const PAYLOAD_LEN: usize = 20;

/// Byte length of an encoded packet.
pub const WIRE_LEN: usize = 12 + PAYLOAD_LEN;

const OFF_SEQ: usize = 0;
const OFF_ACK: usize = 4;
const OFF_CHECKSUM: usize = 8;
const OFF_PAYLOAD: usize = 12;

/// Payload byte used to fill acknowledgement packets.
const ACK_FILL: u8 = b'0';

/// One fixed-size application message, opaque to the protocol.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Message(pub [u8; PAYLOAD_LEN]);

impl Message {
    /// A message made of `PAYLOAD_LEN` copies of `byte`.
    pub fn filled(byte: u8) -> Self {
        Self([byte; PAYLOAD_LEN])
    }

    /// Build a message from up to `PAYLOAD_LEN` bytes, zero-padding the rest.
    pub fn from_slice(data: &[u8]) -> Self {
        let mut buf = [0u8; PAYLOAD_LEN];
        let n = data.len().min(PAYLOAD_LEN);
        buf[..n].copy_from_slice(&data[..n]);
        Self(buf)
    }

    pub fn as_bytes(&self) -> &[u8; PAYLOAD_LEN] {
        &self.0
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message({:?})", String::from_utf8_lossy(&self.0))
    }
}

/// A complete protocol packet.
///
/// Built through [`Packet::data`] or [`Packet::ack`], which compute the
/// checksum last.  Fields stay public so a channel can damage them in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    pub seqnum: SeqNum,
    /// `None` on data packets.
    pub acknum: Option<SeqNum>,
    pub checksum: i32,
    pub payload: Message,
}

impl Packet {
    /// A data packet carrying `message` under sequence number `seqnum`.
    pub fn data(seqnum: SeqNum, message: Message) -> Self {
        Self::sealed(seqnum, None, message)
    }

    /// A per-packet acknowledgement for `acknum`.
    ///
    /// The receiver originates no data, so the sequence number is always 0
    /// and the payload is filler.
    pub fn ack(acknum: SeqNum) -> Self {
        Self::sealed(0, Some(acknum), Message::filled(ACK_FILL))
    }

    fn sealed(seqnum: SeqNum, acknum: Option<SeqNum>, payload: Message) -> Self {
        let mut pkt = Self {
            seqnum,
            acknum,
            checksum: 0,
            payload,
        };
        pkt.checksum = checksum(&pkt);
        pkt
    }

    /// Serialise into a newly allocated [`WIRE_LEN`]-byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; WIRE_LEN];
        let acknum = self.acknum.map_or(NOT_IN_USE, |a| a as i32);

        buf[OFF_SEQ..OFF_SEQ + 4].copy_from_slice(&self.seqnum.to_be_bytes());
        buf[OFF_ACK..OFF_ACK + 4].copy_from_slice(&acknum.to_be_bytes());
        buf[OFF_CHECKSUM..OFF_CHECKSUM + 4].copy_from_slice(&self.checksum.to_be_bytes());
        buf[OFF_PAYLOAD..].copy_from_slice(self.payload.as_bytes());
        buf
    }

    /// Parse a [`Packet`] from a raw datagram.
    ///
    /// Returns [`Err`] if `buf` is not exactly [`WIRE_LEN`] bytes, or if
    /// either sequence field lies outside `0..SEQ_SPACE` (−1 excepted for
    /// the acknowledgement).  Rejecting here keeps a real number from ever
    /// aliasing the −1 marker.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < WIRE_LEN {
            return Err(PacketError::BufferTooShort(buf.len()));
        }
        if buf.len() != WIRE_LEN {
            return Err(PacketError::LengthMismatch(buf.len()));
        }

        let seqnum = u32::from_be_bytes(word(buf, OFF_SEQ));
        let raw_ack = i32::from_be_bytes(word(buf, OFF_ACK));
        let checksum = i32::from_be_bytes(word(buf, OFF_CHECKSUM));

        if seqnum >= SEQ_SPACE {
            return Err(PacketError::SeqOutOfRange(seqnum));
        }
        let acknum = match raw_ack {
            NOT_IN_USE => None,
            a if (0..SEQ_SPACE as i32).contains(&a) => Some(a as SeqNum),
            a => return Err(PacketError::BadAckNum(a)),
        };

        let mut payload = [0u8; PAYLOAD_LEN];
        payload.copy_from_slice(&buf[OFF_PAYLOAD..]);

        Ok(Self {
            seqnum,
            acknum,
            checksum,
            payload: Message(payload),
        })
    }
}

fn word(buf: &[u8], off: usize) -> [u8; 4] {
    [buf[off], buf[off + 1], buf[off + 2], buf[off + 3]]
}

/// Errors that can arise when parsing a raw datagram.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PacketError {
    #[error("buffer too short to contain a packet ({0} bytes)")]
    BufferTooShort(usize),
    #[error("datagram length {0} does not match the fixed packet size")]
    LengthMismatch(usize),
    #[error("acknowledgment number {0} outside the sequence space")]
    BadAckNum(i32),
    #[error("sequence number {0} outside the sequence space")]
    SeqOutOfRange(u32),
}

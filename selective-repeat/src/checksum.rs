//! Corruption detection.
//!
//! The checksum is the plain integer sum of the header fields and every
//! payload byte.  It is weak on purpose: the emulator corrupts packets by
//! overwriting a single field or byte, which always changes the sum.

use crate::packet::Packet;
use crate::seq::NOT_IN_USE;

/// Compute the checksum over `packet`'s current `seqnum`, `acknum` and
/// payload.  The stored `checksum` field is ignored.
pub fn checksum(packet: &Packet) -> i32 {
    let acknum = packet.acknum.map_or(NOT_IN_USE, |a| a as i32);
    packet
        .payload
        .as_bytes()
        .iter()
        .fold((packet.seqnum as i32).wrapping_add(acknum), |sum, &b| {
            sum.wrapping_add(i32::from(b))
        })
}

/// `true` when the stored checksum disagrees with the packet's contents.
pub fn is_corrupted(packet: &Packet) -> bool {
    packet.checksum != checksum(packet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Message;

    #[test]
    fn data_packet_sum() {
        let pkt = Packet::data(3, Message::filled(b'a'));
        // 3 + (-1) + 20 * 97
        assert_eq!(checksum(&pkt), 3 - 1 + 20 * 97);
        assert!(!is_corrupted(&pkt));
    }

    #[test]
    fn ack_packet_sum() {
        let pkt = Packet::ack(7);
        // seq 0, ack 7, twenty ASCII '0'
        assert_eq!(checksum(&pkt), 7 + 20 * 48);
        assert!(!is_corrupted(&pkt));
    }

    #[test]
    fn payload_overwrite_is_detected() {
        let mut pkt = Packet::data(0, Message::filled(b'q'));
        pkt.payload.0[0] = b'Z';
        assert!(is_corrupted(&pkt));
    }

    #[test]
    fn header_overwrite_is_detected() {
        let mut pkt = Packet::data(5, Message::filled(b'c'));
        pkt.seqnum = 999_999;
        assert!(is_corrupted(&pkt));

        let mut ack = Packet::ack(4);
        ack.acknum = Some(999_999);
        assert!(is_corrupted(&ack));
    }

    #[test]
    fn stored_checksum_tamper_is_detected() {
        let mut pkt = Packet::ack(1);
        pkt.checksum += 1;
        assert!(is_corrupted(&pkt));
    }
}

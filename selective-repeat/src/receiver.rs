//! Selective-Repeat receive-side state machine (entity B).
//!
//! [`SrReceiver`] accepts any uncorrupted packet that falls inside its
//! window, buffers it, and hands the application the longest contiguous run
//! starting at `expected_base`.  Every uncorrupted packet, in window or not,
//! is acknowledged individually so that a sender whose earlier ACK was lost
//! can still retire the packet.
//!
//! Corrupted packets are dropped without an ACK; the sender's timeout is the
//! only recovery path.

use crate::channel::{Channel, Entity};
use crate::checksum::is_corrupted;
use crate::packet::{Message, Packet};
use crate::protocol::{Protocol, SendError};
use crate::seq::{SeqNum, SEQ_SPACE, WINDOW_SIZE};
use crate::stats::ReceiverStats;
use crate::window::SeqWindow;

/// What an inbound data packet did to the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvOutcome {
    /// Checksum mismatch; dropped without an ACK.
    Corrupted,
    /// Newly buffered; `delivered` payloads were then handed up in order.
    Accepted { delivered: usize },
    /// Already buffered and awaiting a gap to fill; re-acknowledged only.
    Duplicate,
    /// Behind the window (already delivered); re-acknowledged only.
    Stale,
    /// Sequence number outside the sequence space; dropped without an ACK.
    OutOfRange,
}

/// Selective-Repeat receive-side state.
#[derive(Debug)]
pub struct SrReceiver {
    window: SeqWindow<Message>,
    stats: ReceiverStats,
}

impl Default for SrReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl SrReceiver {
    pub fn new() -> Self {
        Self {
            window: SeqWindow::new(WINDOW_SIZE),
            stats: ReceiverStats::default(),
        }
    }

    /// Lowest sequence number not yet delivered.
    pub fn expected_base(&self) -> SeqNum {
        self.window.base()
    }

    /// Out-of-order packets waiting for the gap at `expected_base`.
    pub fn buffered(&self) -> usize {
        self.window.iter().count()
    }

    pub fn is_buffered(&self, seq: SeqNum) -> bool {
        self.window.get(seq).is_some()
    }

    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    /// Process a data packet from the link.
    pub fn on_data(&mut self, ch: &mut dyn Channel, packet: &Packet) -> RecvOutcome {
        if is_corrupted(packet) {
            log::debug!("[B] ← corrupted packet dropped");
            return RecvOutcome::Corrupted;
        }
        let seq = packet.seqnum;
        if seq >= SEQ_SPACE {
            log::debug!("[B] ← seq={} outside the sequence space dropped", seq);
            return RecvOutcome::OutOfRange;
        }
        self.stats.packets_received += 1;

        let outcome = match self.window.offset_of(seq) {
            Some(off) if self.window.insert(off, packet.payload) => {
                let ready = self.window.pop_front_while(|_| true);
                for message in &ready {
                    ch.deliver_to_application(Entity::B, *message);
                }
                self.stats.delivered += ready.len() as u64;
                RecvOutcome::Accepted {
                    delivered: ready.len(),
                }
            }
            Some(_) => {
                self.stats.duplicates += 1;
                RecvOutcome::Duplicate
            }
            None => {
                self.stats.duplicates += 1;
                RecvOutcome::Stale
            }
        };

        ch.send_to_channel(Entity::B, Packet::ack(seq));
        log::debug!(
            "[B] ← DATA seq={} {:?}; → ACK {} expected_base={}",
            seq,
            outcome,
            seq,
            self.expected_base()
        );
        outcome
    }

    /// Return to the initial state: `expected_base = 0`, empty buffer,
    /// counters cleared.
    pub fn reset(&mut self) {
        self.window.reset();
        self.stats = ReceiverStats::default();
    }
}

impl Protocol for SrReceiver {
    fn init(&mut self, _ch: &mut dyn Channel) {
        self.reset();
    }

    /// B never originates data in a one-directional transfer.
    fn submit(&mut self, _ch: &mut dyn Channel, _message: Message) -> Result<(), SendError> {
        Ok(())
    }

    fn on_packet(&mut self, ch: &mut dyn Channel, packet: Packet) {
        self.on_data(ch, &packet);
    }

    /// B never starts a timer.
    fn on_timeout(&mut self, _ch: &mut dyn Channel) {}
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Action, Outbox};
    use crate::seq::SEQ_SPACE;

    fn data(seq: SeqNum) -> Packet {
        Packet::data(seq, Message::filled(b'a' + seq as u8))
    }

    #[test]
    fn initial_state() {
        let r = SrReceiver::new();
        assert_eq!(r.expected_base(), 0);
        assert_eq!(r.buffered(), 0);
    }

    #[test]
    fn in_order_packet_delivered_and_acked() {
        let mut r = SrReceiver::new();
        let mut out = Outbox::new();
        assert_eq!(r.on_data(&mut out, &data(0)), RecvOutcome::Accepted { delivered: 1 });
        assert_eq!(
            out.drain(),
            vec![
                Action::Deliver(data(0).payload),
                Action::Send(Packet::ack(0))
            ]
        );
        assert_eq!(r.expected_base(), 1);
    }

    #[test]
    fn out_of_order_packet_buffered_until_gap_fills() {
        let mut r = SrReceiver::new();
        let mut out = Outbox::new();

        assert_eq!(r.on_data(&mut out, &data(2)), RecvOutcome::Accepted { delivered: 0 });
        assert_eq!(r.on_data(&mut out, &data(1)), RecvOutcome::Accepted { delivered: 0 });
        assert!(out.delivered().is_empty());
        assert_eq!(r.buffered(), 2);
        assert!(r.is_buffered(2));

        assert_eq!(r.on_data(&mut out, &data(0)), RecvOutcome::Accepted { delivered: 3 });
        assert_eq!(
            out.delivered(),
            vec![data(0).payload, data(1).payload, data(2).payload]
        );
        assert_eq!(r.expected_base(), 3);
        assert_eq!(r.buffered(), 0);
    }

    #[test]
    fn every_uncorrupted_packet_is_acked() {
        let mut r = SrReceiver::new();
        let mut out = Outbox::new();
        r.on_data(&mut out, &data(3));
        r.on_data(&mut out, &data(3));
        assert_eq!(out.sent(), vec![Packet::ack(3), Packet::ack(3)]);
    }

    #[test]
    fn buffered_duplicate_not_rebuffered() {
        let mut r = SrReceiver::new();
        let mut out = Outbox::new();
        r.on_data(&mut out, &data(4));
        assert_eq!(r.on_data(&mut out, &data(4)), RecvOutcome::Duplicate);
        assert_eq!(r.buffered(), 1);
        assert_eq!(r.stats().duplicates, 1);
    }

    #[test]
    fn delivered_duplicate_reacked_not_redelivered() {
        let mut r = SrReceiver::new();
        let mut out = Outbox::new();
        r.on_data(&mut out, &data(0));
        out.drain();

        assert_eq!(r.on_data(&mut out, &data(0)), RecvOutcome::Stale);
        assert_eq!(out.drain(), vec![Action::Send(Packet::ack(0))]);
        assert_eq!(r.expected_base(), 1);
        assert_eq!(r.stats().delivered, 1);
    }

    #[test]
    fn corrupted_packet_dropped_silently() {
        let mut r = SrReceiver::new();
        let mut out = Outbox::new();
        let mut pkt = data(0);
        pkt.payload.0[0] = b'Z';
        assert_eq!(r.on_data(&mut out, &pkt), RecvOutcome::Corrupted);
        assert!(out.actions().is_empty());
        assert_eq!(r.expected_base(), 0);
        assert_eq!(r.stats().packets_received, 0);
    }

    #[test]
    fn out_of_range_seqnum_dropped_without_ack() {
        let mut r = SrReceiver::new();
        let mut out = Outbox::new();
        for seq in [SEQ_SPACE, 999_999, u32::MAX] {
            let pkt = Packet::data(seq, Message::filled(b'q'));
            assert_eq!(r.on_data(&mut out, &pkt), RecvOutcome::OutOfRange);
        }
        assert!(out.actions().is_empty());
        assert_eq!(r.expected_base(), 0);
        assert_eq!(r.stats().packets_received, 0);
    }

    #[test]
    fn packet_beyond_window_is_stale() {
        let mut r = SrReceiver::new();
        let mut out = Outbox::new();
        // Offset 6 from expected_base 0 lies in the "already delivered" half.
        assert_eq!(r.on_data(&mut out, &data(WINDOW_SIZE as SeqNum)), RecvOutcome::Stale);
        assert_eq!(r.buffered(), 0);
        assert_eq!(out.sent(), vec![Packet::ack(WINDOW_SIZE as SeqNum)]);
    }

    #[test]
    fn wrapped_packet_is_new_not_stale() {
        let mut r = SrReceiver::new();
        let mut out = Outbox::new();
        for seq in 0..SEQ_SPACE - 1 {
            r.on_data(&mut out, &data(seq));
        }
        assert_eq!(r.expected_base(), SEQ_SPACE - 1);

        // seq 0 now sits at offset 1: buffered, not mistaken for the old 0.
        assert_eq!(r.on_data(&mut out, &data(0)), RecvOutcome::Accepted { delivered: 0 });
        assert_eq!(
            r.on_data(&mut out, &data(SEQ_SPACE - 1)),
            RecvOutcome::Accepted { delivered: 2 }
        );
        assert_eq!(r.expected_base(), 1);
        assert_eq!(r.stats().delivered, SEQ_SPACE as u64 + 1);
    }

    #[test]
    fn receiver_submit_and_timeout_are_noops() {
        let mut r = SrReceiver::new();
        let mut out = Outbox::new();
        assert_eq!(Protocol::submit(&mut r, &mut out, Message::filled(1)), Ok(()));
        Protocol::on_timeout(&mut r, &mut out);
        assert!(out.actions().is_empty());
        assert_eq!(r.expected_base(), 0);
    }

    #[test]
    fn init_clears_buffer() {
        let mut r = SrReceiver::new();
        let mut out = Outbox::new();
        r.on_data(&mut out, &data(0));
        r.on_data(&mut out, &data(2));
        Protocol::init(&mut r, &mut out);
        assert_eq!(r.expected_base(), 0);
        assert_eq!(r.buffered(), 0);
    }
}

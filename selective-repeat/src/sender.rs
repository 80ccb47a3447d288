//! Selective-Repeat send-side state machine (entity A).
//!
//! [`SrSender`] keeps up to [`WINDOW_SIZE`] data packets outstanding.  Each
//! one is acknowledged individually, and only the packet the timer guards is
//! ever retransmitted.
//!
//! # Protocol contract
//!
//! - `submit` succeeds only while fewer than `WINDOW_SIZE` packets are
//!   outstanding; otherwise the caller gets [`SendError::WindowFull`].
//! - ACKs are **per packet**: `acknum = K` acknowledges sequence number `K`
//!   only.  The window slides past every acknowledged packet at its head.
//! - One timer approximates per-packet timers.  It is always bound to the
//!   oldest unacknowledged packet and restarted whenever that changes.
//!
//! ```text
//!   base                        next_seq
//!    │                              │
//!  ──┼────┬────┬────┬────┬──────────┼───────▶ seq space (mod SEQ_SPACE)
//!    │ 0? │ 1✓ │ 2? │ 3✓ │          │
//!    └ timer bound here             └ next submit uses this
//! ```
//!
//! All I/O goes through the [`Channel`] passed to each handler.

use crate::channel::{Channel, Entity};
use crate::checksum::is_corrupted;
use crate::packet::{Message, Packet};
use crate::protocol::{Protocol, SendError};
use crate::seq::{SeqNum, RTT, WINDOW_SIZE};
use crate::stats::SenderStats;
use crate::timer::RetransmitTimer;
use crate::window::SeqWindow;

// ---------------------------------------------------------------------------
// SrEntry
// ---------------------------------------------------------------------------

/// A sent data packet occupying one slot of the send window.
#[derive(Debug, Clone)]
pub struct SrEntry {
    pub packet: Packet,
    /// Set once an uncorrupted ACK for this sequence number arrives.
    pub acked: bool,
    /// Total number of times this packet has been transmitted.
    pub tx_count: u32,
}

/// What an inbound packet did to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Checksum mismatch; ignored.
    Corrupted,
    /// No outstanding packet carries that sequence number.
    Unknown,
    /// The packet was already acknowledged; nothing changed.
    Duplicate,
    /// A packet became acknowledged and the window slid by `slid` slots.
    New { slid: usize },
}

// ---------------------------------------------------------------------------
// SrSender
// ---------------------------------------------------------------------------

/// Selective-Repeat send-side state.
#[derive(Debug)]
pub struct SrSender {
    window: SeqWindow<SrEntry>,
    timer: RetransmitTimer,
    stats: SenderStats,
}

impl Default for SrSender {
    fn default() -> Self {
        Self::new()
    }
}

impl SrSender {
    /// A sender in its initial state, using the protocol's standard timeout.
    pub fn new() -> Self {
        Self::with_timeout(RTT)
    }

    /// A sender whose timer runs for `rto` time units.
    pub fn with_timeout(rto: f64) -> Self {
        Self {
            window: SeqWindow::new(WINDOW_SIZE),
            timer: RetransmitTimer::new(Entity::A, rto),
            stats: SenderStats::default(),
        }
    }

    /// Oldest sequence number not yet retired (left window edge).
    pub fn base(&self) -> SeqNum {
        self.window.base()
    }

    /// Sequence number the next accepted message will use.
    pub fn next_seq(&self) -> SeqNum {
        self.window.end()
    }

    /// Packets currently held in the window.
    pub fn in_flight(&self) -> usize {
        self.window.len()
    }

    /// Packets in the window still awaiting their ACK.
    pub fn unacked(&self) -> usize {
        self.window.iter().filter(|(_, e)| !e.acked).count()
    }

    pub fn can_send(&self) -> bool {
        !self.window.is_full()
    }

    pub fn has_outstanding(&self) -> bool {
        !self.window.is_empty()
    }

    /// Sequence number the timer is guarding, if it is running.
    pub fn timer_bound(&self) -> Option<SeqNum> {
        self.timer.bound()
    }

    pub fn entry(&self, seq: SeqNum) -> Option<&SrEntry> {
        self.window.get(seq)
    }

    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }

    /// Oldest unacknowledged packet, scanning from `base`.
    fn next_unacked(&self) -> Option<SeqNum> {
        self.window
            .iter()
            .find(|(_, e)| !e.acked)
            .map(|(seq, _)| seq)
    }

    /// Send `message` as a new data packet.
    ///
    /// Returns the sequence number assigned, or [`SendError::WindowFull`]
    /// when `WINDOW_SIZE` packets are already outstanding.
    pub fn send(&mut self, ch: &mut dyn Channel, message: Message) -> Result<SeqNum, SendError> {
        if self.window.is_full() {
            self.stats.window_full += 1;
            log::debug!("[A] window full; message rejected");
            return Err(SendError::WindowFull);
        }

        let was_empty = self.window.is_empty();
        let packet = Packet::data(self.window.end(), message);
        let seq = self
            .window
            .push_back(SrEntry {
                packet,
                acked: false,
                tx_count: 1,
            })
            .map_err(|_| SendError::WindowFull)?;

        ch.send_to_channel(Entity::A, packet);
        self.stats.packets_sent += 1;
        log::debug!("[A] → DATA seq={} in_flight={}", seq, self.window.len());

        if was_empty {
            self.timer.start(ch, seq);
        }
        Ok(seq)
    }

    /// Process a packet from the link (always an ACK in this deployment).
    pub fn on_ack(&mut self, ch: &mut dyn Channel, packet: &Packet) -> AckOutcome {
        if is_corrupted(packet) {
            log::debug!("[A] ← corrupted ACK ignored");
            return AckOutcome::Corrupted;
        }
        self.stats.total_acks_received += 1;

        let Some(ack) = packet.acknum else {
            log::debug!("[A] ← packet without acknum ignored");
            return AckOutcome::Unknown;
        };
        let (base, next_seq) = (self.base(), self.next_seq());
        let Some(entry) = self.window.get_mut(ack) else {
            log::debug!("[A] ← ACK {} outside window [{}, {})", ack, base, next_seq);
            return AckOutcome::Unknown;
        };
        if entry.acked {
            log::debug!("[A] ← duplicate ACK {}", ack);
            return AckOutcome::Duplicate;
        }

        entry.acked = true;
        self.stats.new_acks += 1;

        if self.timer.bound() == Some(ack) {
            self.timer.stop(ch);
            if let Some(seq) = self.next_unacked() {
                self.timer.start(ch, seq);
            }
        }

        let slid = self.window.pop_front_while(|e| e.acked).len();
        if self.window.is_empty() {
            self.timer.stop(ch);
        }

        log::debug!(
            "[A] ← ACK {} (slid {}) base={} in_flight={}",
            ack,
            slid,
            self.base(),
            self.window.len()
        );
        AckOutcome::New { slid }
    }

    /// Handle expiry of the retransmission timer.
    ///
    /// Resends the packet the timer was guarding and returns its sequence
    /// number.  If that packet was acknowledged in the meantime, the timer is
    /// rebound to the oldest unacknowledged packet without resending anything.
    pub fn on_timer_expired(&mut self, ch: &mut dyn Channel) -> Option<SeqNum> {
        let timed = self.timer.expire();

        if let Some(seq) = timed {
            if let Some(entry) = self.window.get_mut(seq).filter(|e| !e.acked) {
                entry.tx_count += 1;
                let packet = entry.packet;
                let tx_count = entry.tx_count;

                ch.send_to_channel(Entity::A, packet);
                self.stats.packets_resent += 1;
                self.timer.start(ch, seq);
                log::debug!("[A] timeout: resend seq={} (tx #{})", seq, tx_count);
                return Some(seq);
            }
        }

        match self.next_unacked() {
            Some(seq) => {
                log::debug!("[A] timeout for {:?} already acked; timer now on seq={}", timed, seq);
                self.timer.start(ch, seq);
            }
            None => log::debug!("[A] timeout with nothing outstanding"),
        }
        None
    }

    /// Return to the initial state: `base = next_seq = 0`, empty window,
    /// timer stopped, counters cleared.
    pub fn reset(&mut self, ch: &mut dyn Channel) {
        self.timer.stop(ch);
        self.window.reset();
        self.stats = SenderStats::default();
    }
}

impl Protocol for SrSender {
    fn init(&mut self, ch: &mut dyn Channel) {
        self.reset(ch);
    }

    fn submit(&mut self, ch: &mut dyn Channel, message: Message) -> Result<(), SendError> {
        self.send(ch, message).map(|_| ())
    }

    fn on_packet(&mut self, ch: &mut dyn Channel, packet: Packet) {
        self.on_ack(ch, &packet);
    }

    fn on_timeout(&mut self, ch: &mut dyn Channel) {
        self.on_timer_expired(ch);
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

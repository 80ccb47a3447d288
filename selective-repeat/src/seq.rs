//! Sequence-space constants and modular arithmetic.
//!
//! Sequence numbers live in `0..SEQ_SPACE` and wrap.  The space is exactly
//! twice the window so that, seen from either window edge, an "old" packet
//! (offset ≥ `WINDOW_SIZE`) can never be confused with a "new" one
//! (offset < `WINDOW_SIZE`).

/// Sequence number as carried in [`crate::packet::Packet::seqnum`].
pub type SeqNum = u32;

/// Maximum number of packets outstanding at the sender (and buffered at the
/// receiver).
pub const WINDOW_SIZE: usize = 6;

/// Modulus of the sequence-number space.
pub const SEQ_SPACE: u32 = 2 * WINDOW_SIZE as u32;

/// Retransmission timeout in protocol time units.
pub const RTT: f64 = 16.0;

/// Wire value of an `acknum` that carries no acknowledgement.
pub const NOT_IN_USE: i32 = -1;

/// `seq + 1` in sequence space.
#[inline]
pub fn next(seq: SeqNum) -> SeqNum {
    (seq + 1) % SEQ_SPACE
}

/// `base + n` in sequence space.
#[inline]
pub fn add(base: SeqNum, n: usize) -> SeqNum {
    ((base as usize + n) % SEQ_SPACE as usize) as SeqNum
}

/// Distance from `from` forward to `to`, i.e. `(to - from) mod SEQ_SPACE`.
///
/// Both arguments must already be reduced into `0..SEQ_SPACE`.
#[inline]
pub fn offset(from: SeqNum, to: SeqNum) -> usize {
    ((to + SEQ_SPACE - from) % SEQ_SPACE) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_space_is_twice_the_window() {
        assert_eq!(SEQ_SPACE as usize, 2 * WINDOW_SIZE);
    }

    #[test]
    fn next_wraps() {
        assert_eq!(next(0), 1);
        assert_eq!(next(SEQ_SPACE - 1), 0);
    }

    #[test]
    fn offset_across_wrap() {
        assert_eq!(offset(10, 1), 3);
        assert_eq!(offset(3, 3), 0);
        assert_eq!(offset(4, 3), SEQ_SPACE as usize - 1);
    }
}

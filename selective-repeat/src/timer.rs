//! Retransmission timer bookkeeping.
//!
//! The environment owns the actual clock (see [`Channel::start_timer`]); the
//! sender only needs to remember *which* packet the single timer currently
//! guards.  [`RetransmitTimer`] pairs that binding with the start/stop calls
//! so the two can never drift apart.

use std::time::Duration;

use crate::channel::{Channel, Entity};
use crate::seq::{SeqNum, RTT};

/// Adjustable timeout parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerConfig {
    /// Retransmission timeout in protocol time units.
    pub rto: f64,
    /// Wall-clock length of one protocol time unit (UDP transport only).
    pub time_unit: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            rto: RTT,
            time_unit: Duration::from_millis(10),
        }
    }
}

impl TimerConfig {
    /// Convert `units` protocol time units into wall-clock time.
    pub fn to_wall_clock(&self, units: f64) -> Duration {
        self.time_unit.mul_f64(units.max(0.0))
    }
}

/// The sender's single timer, bound to at most one sequence number.
#[derive(Debug, Clone)]
pub struct RetransmitTimer {
    entity: Entity,
    rto: f64,
    bound: Option<SeqNum>,
}

impl RetransmitTimer {
    pub fn new(entity: Entity, rto: f64) -> Self {
        Self {
            entity,
            rto,
            bound: None,
        }
    }

    /// Sequence number the running timer guards, or `None` when stopped.
    pub fn bound(&self) -> Option<SeqNum> {
        self.bound
    }

    /// Start (or restart) the timer for `seq`.
    ///
    /// A running timer is stopped first so the environment never sees two
    /// overlapping starts.
    pub fn start(&mut self, ch: &mut dyn Channel, seq: SeqNum) {
        if self.bound.is_some() {
            ch.stop_timer(self.entity);
        }
        ch.start_timer(self.entity, self.rto);
        self.bound = Some(seq);
    }

    /// Stop the timer if it is running.
    pub fn stop(&mut self, ch: &mut dyn Channel) {
        if self.bound.take().is_some() {
            ch.stop_timer(self.entity);
        }
    }

    /// Forget the binding without notifying the environment.
    ///
    /// Used when the environment reports expiry: the timer is already gone.
    pub fn expire(&mut self) -> Option<SeqNum> {
        self.bound.take()
    }
}

//! The boundary between the protocol entities and whatever carries their
//! packets.
//!
//! Entities never perform I/O.  Every handler receives a `&mut dyn Channel`
//! and asks it to transmit a packet, hand a payload to the application, or
//! arm/cancel the entity's single timer.  The [`crate::simulator`] emulator
//! implements the trait directly; the async UDP driver in
//! [`crate::endpoint`] and the tests use the recording [`Outbox`].

use std::fmt;

use crate::packet::{Message, Packet};

/// Which side of the link an entity sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    /// The sender.
    A,
    /// The receiver.
    B,
}

impl Entity {
    /// The entity at the other end of the link.
    pub fn peer(self) -> Self {
        match self {
            Entity::A => Entity::B,
            Entity::B => Entity::A,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::A => f.write_str("A"),
            Entity::B => f.write_str("B"),
        }
    }
}

/// Services an entity consumes from its environment.
pub trait Channel {
    /// Hand `packet` to the unreliable link towards the peer of `entity`.
    fn send_to_channel(&mut self, entity: Entity, packet: Packet);

    /// Deliver an in-order payload to the application above `entity`.
    fn deliver_to_application(&mut self, entity: Entity, message: Message);

    /// Arm `entity`'s timer to fire after `duration` time units, superseding
    /// any pending expiry.
    fn start_timer(&mut self, entity: Entity, duration: f64);

    /// Cancel `entity`'s timer.
    fn stop_timer(&mut self, entity: Entity);
}

/// One request recorded by an [`Outbox`].
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Send(Packet),
    Deliver(Message),
    StartTimer(f64),
    StopTimer,
}

/// A [`Channel`] that records every request for a driver to carry out later.
///
/// Also tracks whether the timer is logically running, so callers can check
/// the "timer active iff window non-empty" property without replaying the
/// action log.
#[derive(Debug, Default)]
pub struct Outbox {
    actions: Vec<Action>,
    timer_running: bool,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return every action recorded so far.
    pub fn drain(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.actions)
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn timer_running(&self) -> bool {
        self.timer_running
    }

    /// Packets sent since the last drain, in order.
    pub fn sent(&self) -> Vec<Packet> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                Action::Send(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    /// Payloads delivered since the last drain, in order.
    pub fn delivered(&self) -> Vec<Message> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                Action::Deliver(m) => Some(*m),
                _ => None,
            })
            .collect()
    }
}

impl Channel for Outbox {
    fn send_to_channel(&mut self, _entity: Entity, packet: Packet) {
        self.actions.push(Action::Send(packet));
    }

    fn deliver_to_application(&mut self, _entity: Entity, message: Message) {
        self.actions.push(Action::Deliver(message));
    }

    fn start_timer(&mut self, _entity: Entity, duration: f64) {
        self.timer_running = true;
        self.actions.push(Action::StartTimer(duration));
    }

    fn stop_timer(&mut self, _entity: Entity) {
        self.timer_running = false;
        self.actions.push(Action::StopTimer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbox_records_in_order() {
        let mut out = Outbox::new();
        out.send_to_channel(Entity::A, Packet::ack(1));
        out.start_timer(Entity::A, 16.0);
        out.deliver_to_application(Entity::B, Message::filled(b'x'));
        assert!(out.timer_running());
        assert_eq!(out.sent(), vec![Packet::ack(1)]);
        assert_eq!(out.delivered(), vec![Message::filled(b'x')]);

        out.stop_timer(Entity::A);
        assert!(!out.timer_running());
        assert_eq!(out.drain().len(), 4);
        assert!(out.actions().is_empty());
    }

    #[test]
    fn peer_swaps_sides() {
        assert_eq!(Entity::A.peer(), Entity::B);
        assert_eq!(Entity::B.peer(), Entity::A);
    }
}

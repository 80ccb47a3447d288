//! The callback surface every protocol entity exposes to its environment.
//!
//! The environment (emulator, UDP driver, or a test) delivers exactly one
//! event at a time and waits for the handler to return before delivering the
//! next, so implementations need no interior synchronisation.

use thiserror::Error;

use crate::channel::Channel;
use crate::packet::{Message, Packet};

/// Reasons a `submit` can be refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// Every window slot is occupied; the caller must retry later.
    #[error("send window is full")]
    WindowFull,
}

/// Event handlers for one end of the link.
pub trait Protocol {
    /// Reset to the initial state, cancelling any running timer.
    fn init(&mut self, ch: &mut dyn Channel);

    /// The application above this entity has a message to send.
    fn submit(&mut self, ch: &mut dyn Channel, message: Message) -> Result<(), SendError>;

    /// A packet arrived from the link.
    fn on_packet(&mut self, ch: &mut dyn Channel, packet: Packet);

    /// This entity's timer expired.
    fn on_timeout(&mut self, ch: &mut dyn Channel);
}

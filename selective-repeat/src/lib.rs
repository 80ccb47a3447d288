//! `selective-repeat`: Selective-Repeat reliable delivery over a channel
//! that may lose or corrupt packets.
//!
//! # Architecture
//!
//! ```text
//!  ┌───────────┐   DATA (seq)    ┌────────────┐
//!  │ SrSender  │────────────────▶│ SrReceiver │──▶ in-order payloads
//!  │ (entity A)│                 │ (entity B) │
//!  └─────▲─────┘                 └─────┬──────┘
//!        │        ACK (acknum)         │
//!        └─────────────────────────────┘
//!        │                             │
//!  ┌─────▼─────────────────────────────▼──────┐
//!  │ Channel: Emulator link │ Outbox + UDP    │
//!  └──────────────────────────────────────────┘
//! ```
//!
//! The entities are pure state machines: every handler runs to completion and
//! talks to the outside world only through a [`channel::Channel`].
//!
//! Each module has a single responsibility:
//! - [`seq`]        window/sequence-space constants and modular arithmetic
//! - [`checksum`]   corruption detection
//! - [`packet`]     packet model and wire format
//! - [`window`]     fixed-capacity circular window shared by both entities
//! - [`channel`]    the environment interface and a recording implementation
//! - [`protocol`]   the entity callback trait
//! - [`timer`]      retransmission timer binding and timeout settings
//! - [`sender`]     Selective-Repeat send-side state machine (A)
//! - [`receiver`]   Selective-Repeat receive-side state machine (B)
//! - [`stats`]      run counters
//! - [`simulator`]  seeded discrete-event emulator of a lossy link
//! - [`socket`]     async UDP socket abstraction
//! - [`endpoint`]   async drivers running the entities over UDP

pub mod channel;
pub mod checksum;
pub mod endpoint;
pub mod packet;
pub mod protocol;
pub mod receiver;
pub mod sender;
pub mod seq;
pub mod simulator;
pub mod socket;
pub mod stats;
pub mod timer;
pub mod window;

pub use channel::{Action, Channel, Entity, Outbox};
pub use packet::{Message, Packet, PAYLOAD_LEN};
pub use protocol::{Protocol, SendError};
pub use receiver::SrReceiver;
pub use sender::SrSender;
pub use seq::{SeqNum, RTT, SEQ_SPACE, WINDOW_SIZE};

//! Discrete-event network emulator.
//!
//! Drives one [`SrSender`] (entity A) and one [`SrReceiver`] (entity B) over
//! an emulated link with a configurable fault model:
//!
//! | Fault       | Description                                             |
//! |-------------|---------------------------------------------------------|
//! | Loss        | Drop a packet with probability `loss_prob`.             |
//! | Corruption  | With probability `corrupt_prob`, overwrite payload byte |
//! |             | 0 (75 %), the seqnum (12.5 %) or the acknum (12.5 %).   |
//! | Delay       | Each packet takes 1–10 time units, never overtaking an  |
//! |             | earlier packet heading the same way.                    |
//!
//! Application messages arrive at A with inter-arrival times uniformly
//! distributed in `[0, 2 × mean_interval)`.  Message *n* is twenty copies of
//! the letter `'a' + n mod 26`.  A message refused because the window is full
//! is dropped: the emulator does not retry.
//!
//! Every random draw comes from a [`StdRng`] seeded from the config, so a
//! run is fully reproducible.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::channel::{Channel, Entity};
use crate::packet::{Message, Packet};
use crate::protocol::Protocol;
use crate::receiver::SrReceiver;
use crate::sender::SrSender;
use crate::seq::RTT;
use crate::stats::{ChannelStats, Summary};

/// Value written into a header field the link decides to corrupt.
const CORRUPT_FIELD: u32 = 999_999;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Parameters of one emulation run.
///
/// Probabilities are in the range `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// Number of application messages to generate at A.
    pub messages: u64,
    /// Probability that any given packet is silently dropped.
    pub loss_prob: f64,
    /// Probability that a packet is corrupted in flight.
    pub corrupt_prob: f64,
    /// Average time between application messages.
    pub mean_interval: f64,
    /// Sender retransmission timeout in time units.
    pub rto: f64,
    /// RNG seed.
    pub seed: u64,
    /// Stop the run once the clock passes this point.
    pub time_limit: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        // No faults by default: the link is a pure delay line.
        Self {
            messages: 10,
            loss_prob: 0.0,
            corrupt_prob: 0.0,
            mean_interval: 10.0,
            rto: RTT,
            seed: 1,
            time_limit: 1.0e7,
        }
    }
}

/// Rejected emulator parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1], got {value}")]
    Probability { name: &'static str, value: f64 },
    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("loss_prob", self.loss_prob), ("corrupt_prob", self.corrupt_prob)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Probability { name, value });
            }
        }
        for (name, value) in [
            ("mean_interval", self.mean_interval),
            ("rto", self.rto),
            ("time_limit", self.time_limit),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        Ok(())
    }
}

/// Payload the emulator generates for the `n`th application message.
pub fn message_for(n: u64) -> Message {
    Message::filled(b'a' + (n % 26) as u8)
}

// ---------------------------------------------------------------------------
// Event queue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum EventKind {
    /// The application at A has a message.
    FromLayer5,
    /// A packet reaches the entity.
    FromLayer3(Packet),
    /// The entity's timer fires.  Carries the generation that armed it.
    TimerInterrupt(u64),
}

#[derive(Debug, Clone)]
struct Event {
    time: f64,
    /// Insertion order; breaks ties between equal times.
    id: u64,
    entity: Entity,
    kind: EventKind,
}

// BinaryHeap is a max-heap; reverse so the earliest event pops first.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Event {}

#[derive(Debug, Default, Clone, Copy)]
struct TimerState {
    running: bool,
    generation: u64,
}

fn slot(entity: Entity) -> usize {
    match entity {
        Entity::A => 0,
        Entity::B => 1,
    }
}

// ---------------------------------------------------------------------------
// Link: the Channel the entities talk to
// ---------------------------------------------------------------------------

struct Link {
    now: f64,
    queue: BinaryHeap<Event>,
    next_id: u64,
    rng: StdRng,
    loss_prob: f64,
    corrupt_prob: f64,
    timers: [TimerState; 2],
    /// Latest arrival already scheduled towards each entity.
    last_arrival: [f64; 2],
    delivered: Vec<Message>,
    stats: ChannelStats,
}

impl Link {
    fn schedule(&mut self, time: f64, entity: Entity, kind: EventKind) {
        let id = self.next_id;
        self.next_id += 1;
        self.queue.push(Event {
            time,
            id,
            entity,
            kind,
        });
    }

    /// Schedule the next application message at A.
    fn schedule_message(&mut self, mean_interval: f64) {
        let gap = mean_interval * self.rng.random::<f64>() * 2.0;
        self.schedule(self.now + gap, Entity::A, EventKind::FromLayer5);
    }

    fn corrupt(&mut self, packet: &mut Packet) {
        let x: f64 = self.rng.random();
        if x < 0.75 {
            packet.payload.0[0] = b'Z';
        } else if x < 0.875 {
            packet.seqnum = CORRUPT_FIELD;
        } else {
            packet.acknum = Some(CORRUPT_FIELD);
        }
    }
}

impl Channel for Link {
    fn send_to_channel(&mut self, entity: Entity, mut packet: Packet) {
        self.stats.to_layer3 += 1;

        if self.rng.random::<f64>() < self.loss_prob {
            self.stats.lost += 1;
            log::trace!("link: packet from {} lost", entity);
            return;
        }

        let dest = entity.peer();
        let depart = self.now.max(self.last_arrival[slot(dest)]);
        let arrival = depart + 1.0 + 9.0 * self.rng.random::<f64>();
        self.last_arrival[slot(dest)] = arrival;

        if self.rng.random::<f64>() < self.corrupt_prob {
            self.stats.corrupted += 1;
            self.corrupt(&mut packet);
            log::trace!("link: packet from {} corrupted", entity);
        }

        self.schedule(arrival, dest, EventKind::FromLayer3(packet));
    }

    fn deliver_to_application(&mut self, entity: Entity, message: Message) {
        if entity != Entity::B {
            log::warn!("{} delivered data although only B receives", entity);
            return;
        }
        self.stats.to_layer5 += 1;
        self.delivered.push(message);
        log::trace!("link: layer 5 at B got {:?}", message);
    }

    fn start_timer(&mut self, entity: Entity, duration: f64) {
        let timer = &mut self.timers[slot(entity)];
        if timer.running {
            log::warn!("{}: attempt to start a timer that is already started", entity);
            return;
        }
        timer.running = true;
        timer.generation += 1;
        let generation = timer.generation;
        self.schedule(self.now + duration, entity, EventKind::TimerInterrupt(generation));
    }

    fn stop_timer(&mut self, entity: Entity) {
        let timer = &mut self.timers[slot(entity)];
        if !timer.running {
            log::warn!("{}: unable to cancel timer, it wasn't running", entity);
            return;
        }
        timer.running = false;
    }
}

// ---------------------------------------------------------------------------
// Emulator
// ---------------------------------------------------------------------------

/// Outcome of one emulation run.
#[derive(Debug, Clone)]
pub struct EmulationReport {
    /// Messages the sender accepted, in submission order.
    pub accepted: Vec<Message>,
    /// Payloads handed to the application at B, in delivery order.
    pub delivered: Vec<Message>,
    pub summary: Summary,
    /// `true` if the run hit `time_limit` with events still pending.
    pub timed_out: bool,
}

impl EmulationReport {
    /// Every accepted message was delivered exactly once, in order.
    pub fn is_complete(&self) -> bool {
        self.accepted == self.delivered
    }
}

/// A sender/receiver pair wired to an emulated link.
pub struct Emulator {
    config: SimulatorConfig,
    sender: SrSender,
    receiver: SrReceiver,
    link: Link,
    generated: u64,
    accepted: Vec<Message>,
}

impl Emulator {
    pub fn new(config: SimulatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut link = Link {
            now: 0.0,
            queue: BinaryHeap::new(),
            next_id: 0,
            rng: StdRng::seed_from_u64(config.seed),
            loss_prob: config.loss_prob,
            corrupt_prob: config.corrupt_prob,
            timers: [TimerState::default(); 2],
            last_arrival: [0.0; 2],
            delivered: Vec::new(),
            stats: ChannelStats::default(),
        };

        let mut sender = SrSender::with_timeout(config.rto);
        let mut receiver = SrReceiver::new();
        sender.init(&mut link);
        receiver.init(&mut link);

        let mut emu = Self {
            config,
            sender,
            receiver,
            link,
            generated: 0,
            accepted: Vec::new(),
        };
        if emu.config.messages > 0 {
            emu.link.schedule_message(emu.config.mean_interval);
        }
        Ok(emu)
    }

    pub fn sender(&self) -> &SrSender {
        &self.sender
    }

    pub fn receiver(&self) -> &SrReceiver {
        &self.receiver
    }

    /// Whether A's timer is running as far as the link is concerned.
    pub fn sender_timer_running(&self) -> bool {
        self.link.timers[slot(Entity::A)].running
    }

    /// Process the next event.  Returns `false` once the queue is empty or
    /// the time limit is reached.
    pub fn step(&mut self) -> bool {
        let Some(event) = self.link.queue.pop() else {
            return false;
        };
        if event.time > self.config.time_limit {
            self.link.queue.push(event);
            return false;
        }
        self.link.now = event.time;
        log::trace!(
            "EVENT time: {:.3}, entity: {}, kind: {:?}",
            event.time,
            event.entity,
            event.kind
        );

        let entity: &mut dyn Protocol = match event.entity {
            Entity::A => &mut self.sender,
            Entity::B => &mut self.receiver,
        };

        match event.kind {
            EventKind::FromLayer5 => {
                if self.generated >= self.config.messages {
                    return true;
                }
                let message = message_for(self.generated);
                self.generated += 1;
                self.link.stats.messages_generated += 1;
                if entity.submit(&mut self.link, message).is_ok() {
                    self.accepted.push(message);
                }
                if self.generated < self.config.messages {
                    self.link.schedule_message(self.config.mean_interval);
                }
            }
            EventKind::FromLayer3(packet) => entity.on_packet(&mut self.link, packet),
            EventKind::TimerInterrupt(generation) => {
                let timer = &mut self.link.timers[slot(event.entity)];
                if timer.running && timer.generation == generation {
                    timer.running = false;
                    entity.on_timeout(&mut self.link);
                }
            }
        }
        true
    }

    /// Run until no events remain (or the time limit is hit).
    pub fn run(mut self) -> EmulationReport {
        while self.step() {}
        let timed_out = !self.link.queue.is_empty();
        if timed_out {
            log::warn!("time limit {} reached with events pending", self.config.time_limit);
        }

        self.link.stats.simulated_time = self.link.now;
        let summary = Summary {
            sender: self.sender.stats().clone(),
            receiver: self.receiver.stats().clone(),
            channel: self.link.stats.clone(),
        };
        log::info!(
            "emulation finished at t={:.3}: {} accepted, {} delivered",
            self.link.now,
            self.accepted.len(),
            self.link.delivered.len()
        );
        EmulationReport {
            accepted: self.accepted,
            delivered: self.link.delivered,
            summary,
            timed_out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SimulatorConfig::default().validate(), Ok(()));
    }

    #[test]
    fn bad_probability_rejected() {
        let cfg = SimulatorConfig {
            loss_prob: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Probability { name: "loss_prob", .. })
        ));
        assert!(Emulator::new(cfg).is_err());
    }

    #[test]
    fn bad_interval_rejected() {
        let cfg = SimulatorConfig {
            mean_interval: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NotPositive { name: "mean_interval", .. })
        ));
    }

    #[test]
    fn message_pattern_cycles_alphabet() {
        assert_eq!(message_for(0), Message::filled(b'a'));
        assert_eq!(message_for(25), Message::filled(b'z'));
        assert_eq!(message_for(26), Message::filled(b'a'));
    }

    #[test]
    fn events_pop_in_time_then_insertion_order() {
        let mut heap = BinaryHeap::new();
        for (id, time) in [(0, 5.0), (1, 1.0), (2, 5.0), (3, 0.5)] {
            heap.push(Event {
                time,
                id,
                entity: Entity::A,
                kind: EventKind::FromLayer5,
            });
        }
        let order: Vec<u64> = std::iter::from_fn(|| heap.pop().map(|e| e.id)).collect();
        assert_eq!(order, vec![3, 1, 0, 2]);
    }

    #[test]
    fn clean_link_delivers_everything() {
        let report = Emulator::new(SimulatorConfig {
            messages: 20,
            mean_interval: 50.0,
            ..Default::default()
        })
        .unwrap()
        .run();
        assert!(report.is_complete());
        assert_eq!(report.summary.channel.lost, 0);
        assert!(!report.timed_out);
    }

    #[test]
    fn zero_messages_is_an_empty_run() {
        let report = Emulator::new(SimulatorConfig {
            messages: 0,
            ..Default::default()
        })
        .unwrap()
        .run();
        assert!(report.accepted.is_empty());
        assert!(report.delivered.is_empty());
        assert_eq!(report.summary.channel.simulated_time, 0.0);
    }

    #[test]
    fn total_loss_stops_at_time_limit() {
        let report = Emulator::new(SimulatorConfig {
            messages: 1,
            loss_prob: 1.0,
            time_limit: 1_000.0,
            ..Default::default()
        })
        .unwrap()
        .run();
        assert!(report.timed_out);
        assert!(report.delivered.is_empty());
        assert!(report.summary.sender.packets_resent > 0);
    }
}

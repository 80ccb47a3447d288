//! Async drivers that run the protocol entities over a real UDP socket.
//!
//! # Architecture
//!
//! ```text
//!  application                                  application
//!      │ mpsc<Message>                               ▲ mpsc<Message>
//!      ▼                                             │
//!  run_sender ──┐                          ┌── run_receiver
//!    SrSender   │ select! { msg, datagram, │     SrReceiver
//!    Outbox     │           deadline }     │     Outbox
//!      │        └──────────────────────────┘        │
//!      └──────── Socket (DATA) ─────▶ Socket ───────┘
//!               ◀──────── (ACK) ───────────
//! ```
//!
//! Each driver owns its entity and feeds it one event at a time, so the
//! single-threaded handler contract holds.  Entities record their requests in
//! an [`Outbox`]; the driver then performs them: datagrams go to the socket,
//! timer starts become a `tokio::time` deadline, deliveries go to the
//! application channel.

use std::future;
use std::net::SocketAddr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use crate::channel::{Action, Outbox};
use crate::packet::{Message, Packet};
use crate::receiver::SrReceiver;
use crate::sender::SrSender;
use crate::simulator::ConfigError;
use crate::socket::{Socket, SocketError};
use crate::stats::{ReceiverStats, SenderStats};
use crate::timer::TimerConfig;

/// Errors that end an endpoint task.
#[derive(Error, Debug)]
pub enum EndpointError {
    #[error(transparent)]
    Socket(#[from] SocketError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Settings shared by both drivers.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub timer: TimerConfig,
    /// Probability of dropping an outbound datagram before it reaches the
    /// socket.  Lets loopback runs exercise retransmission.
    pub loss_prob: f64,
    /// Seed for the loss RNG.
    pub seed: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            timer: TimerConfig::default(),
            loss_prob: 0.0,
            seed: 1,
        }
    }
}

impl EndpointConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.loss_prob) {
            return Err(ConfigError::Probability {
                name: "loss_prob",
                value: self.loss_prob,
            });
        }
        if self.timer.rto.is_nan() || self.timer.rto <= 0.0 {
            return Err(ConfigError::NotPositive {
                name: "rto",
                value: self.timer.rto,
            });
        }
        Ok(())
    }
}

/// Outbound half of the driver shared by sender and receiver.
struct Uplink<'a> {
    socket: &'a Socket,
    rng: StdRng,
    loss_prob: f64,
}

impl Uplink<'_> {
    async fn send(&mut self, packet: &Packet, dest: SocketAddr) -> Result<(), SocketError> {
        if self.rng.random::<f64>() < self.loss_prob {
            log::trace!("dropping outbound seq={} acknum={:?}", packet.seqnum, packet.acknum);
            return Ok(());
        }
        self.socket.send_to(packet, dest).await
    }
}

/// Sleep until `deadline`, or forever when there is none.
async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(d) => sleep_until(d).await,
        None => future::pending().await,
    }
}

/// Run entity A: send every message from `messages` to `peer` reliably.
///
/// A message that meets a full window is held back until an ACK frees a
/// slot.  Returns once `messages` is closed and every packet is acknowledged.
pub async fn run_sender(
    socket: Socket,
    peer: SocketAddr,
    mut messages: mpsc::Receiver<Message>,
    config: EndpointConfig,
) -> Result<SenderStats, EndpointError> {
    config.validate()?;
    let mut sender = SrSender::with_timeout(config.timer.rto);
    let mut out = Outbox::new();
    let mut uplink = Uplink {
        socket: &socket,
        rng: StdRng::seed_from_u64(config.seed),
        loss_prob: config.loss_prob,
    };
    let mut deadline: Option<Instant> = None;
    let mut waiting: Option<Message> = None;
    let mut input_open = true;

    loop {
        if sender.can_send() {
            if let Some(message) = waiting.take() {
                sender.send(&mut out, message).ok();
            }
        }

        for action in out.drain() {
            match action {
                Action::Send(packet) => uplink.send(&packet, peer).await?,
                Action::StartTimer(units) => {
                    deadline = Some(Instant::now() + config.timer.to_wall_clock(units));
                }
                Action::StopTimer => deadline = None,
                Action::Deliver(_) => {}
            }
        }

        if !input_open && waiting.is_none() && !sender.has_outstanding() {
            break;
        }

        tokio::select! {
            msg = messages.recv(), if input_open && waiting.is_none() => match msg {
                Some(message) => waiting = Some(message),
                None => input_open = false,
            },
            res = socket.recv_from() => match res {
                Ok((packet, addr)) if addr == peer => {
                    sender.on_ack(&mut out, &packet);
                }
                Ok((_, addr)) => log::debug!("[A] ignoring datagram from {addr}"),
                Err(SocketError::Packet(e)) => log::debug!("[A] dropping datagram: {e}"),
                Err(e) => return Err(e.into()),
            },
            _ = wait_for(deadline) => {
                deadline = None;
                sender.on_timer_expired(&mut out);
            }
        }
    }

    log::info!(
        "[A] done: {} sent, {} resent",
        sender.stats().packets_sent,
        sender.stats().packets_resent
    );
    Ok(sender.stats().clone())
}

/// Run entity B: forward in-order payloads to `deliveries` and acknowledge
/// every uncorrupted packet to whoever sent it.
///
/// Returns once the consumer drops the receiving half of `deliveries`.
pub async fn run_receiver(
    socket: Socket,
    deliveries: mpsc::Sender<Message>,
    config: EndpointConfig,
) -> Result<ReceiverStats, EndpointError> {
    config.validate()?;
    let mut receiver = SrReceiver::new();
    let mut out = Outbox::new();
    let mut uplink = Uplink {
        socket: &socket,
        rng: StdRng::seed_from_u64(config.seed),
        loss_prob: config.loss_prob,
    };

    'outer: loop {
        let (packet, src) = tokio::select! {
            res = socket.recv_from() => match res {
                Ok(v) => v,
                Err(SocketError::Packet(e)) => {
                    log::debug!("[B] dropping datagram: {e}");
                    continue;
                }
                Err(e) => return Err(e.into()),
            },
            _ = deliveries.closed() => break,
        };

        receiver.on_data(&mut out, &packet);

        for action in out.drain() {
            match action {
                Action::Send(ack) => uplink.send(&ack, src).await?,
                Action::Deliver(message) => {
                    if deliveries.send(message).await.is_err() {
                        break 'outer;
                    }
                }
                Action::StartTimer(_) | Action::StopTimer => {}
            }
        }
    }

    log::info!("[B] done: {} delivered", receiver.stats().delivered);
    Ok(receiver.stats().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EndpointConfig::default().validate().is_ok());
    }

    #[test]
    fn loss_probability_checked() {
        let cfg = EndpointConfig {
            loss_prob: -0.1,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Probability { name: "loss_prob", .. })
        ));
    }

    #[tokio::test]
    async fn wait_for_none_never_fires() {
        let res = tokio::time::timeout(std::time::Duration::from_millis(20), wait_for(None)).await;
        assert!(res.is_err());
    }
}

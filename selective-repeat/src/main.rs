//! Entry point for `sr`.
//!
//! Parses CLI arguments and dispatches into one of three modes:
//! **simulate** runs the discrete-event emulator, **send** and **recv** run
//! the two entities over UDP.  All protocol work is delegated to the library;
//! `main.rs` owns only process setup (logging, argument parsing).

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use selective_repeat::endpoint::{run_receiver, run_sender, EndpointConfig};
use selective_repeat::simulator::{Emulator, SimulatorConfig};
use selective_repeat::socket::Socket;
use selective_repeat::timer::TimerConfig;
use selective_repeat::{Message, PAYLOAD_LEN, RTT};

/// Selective-Repeat reliable delivery over a lossy channel.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Default log level when RUST_LOG is unset (0 = warn, 1 = info,
    /// 2 = debug, 3+ = trace).
    #[arg(short, long, default_value_t = 0, global = true)]
    trace: u8,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Run the protocol over the discrete-event emulator and print statistics.
    Simulate(SimulateArgs),
    /// Send stdin, one 20-byte message per line, to a receiver over UDP.
    Send {
        /// Remote receiver address (e.g. 127.0.0.1:9000).
        #[arg(short, long)]
        peer: SocketAddr,
        /// Local address to bind.
        #[arg(short, long, default_value = "0.0.0.0:0")]
        bind: SocketAddr,
        #[command(flatten)]
        link: LinkArgs,
    },
    /// Receive messages over UDP and print them in order.
    Recv {
        /// Local address to bind (e.g. 0.0.0.0:9000).
        #[arg(short, long, default_value = "0.0.0.0:9000")]
        bind: SocketAddr,
        #[command(flatten)]
        link: LinkArgs,
    },
}

#[derive(Args)]
struct SimulateArgs {
    /// Number of messages to simulate.
    #[arg(short = 'n', long, default_value_t = 1000)]
    messages: u64,
    /// Packet loss probability.
    #[arg(short, long, default_value_t = 0.0)]
    loss: f64,
    /// Packet corruption probability.
    #[arg(short, long, default_value_t = 0.0)]
    corrupt: f64,
    /// Average time between messages from the sender's application layer.
    #[arg(short, long, default_value_t = 10.0)]
    interval: f64,
    /// RNG seed.
    #[arg(short, long, default_value_t = 1)]
    seed: u64,
}

#[derive(Args)]
struct LinkArgs {
    /// Probability of deliberately dropping an outbound datagram.
    #[arg(long, default_value_t = 0.0)]
    loss: f64,
    /// Wall-clock milliseconds per protocol time unit.
    #[arg(long, default_value_t = 10)]
    unit_ms: u64,
    /// RNG seed for deliberate loss.
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

impl LinkArgs {
    fn config(&self) -> EndpointConfig {
        EndpointConfig {
            timer: TimerConfig {
                rto: RTT,
                time_unit: Duration::from_millis(self.unit_ms),
            },
            loss_prob: self.loss,
            seed: self.seed,
        }
    }
}

/// Split one input line into payload-sized messages.  An empty line still
/// becomes one (all-zero) message.
fn line_to_messages(line: &str) -> Vec<Message> {
    if line.is_empty() {
        return vec![Message::from_slice(b"")];
    }
    line.as_bytes()
        .chunks(PAYLOAD_LEN)
        .map(Message::from_slice)
        .collect()
}

fn init_logging(trace: u8) {
    let level = match trace {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // RUST_LOG, when set, takes precedence over --trace.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.trace);

    match cli.mode {
        Mode::Simulate(args) => {
            let config = SimulatorConfig {
                messages: args.messages,
                loss_prob: args.loss,
                corrupt_prob: args.corrupt,
                mean_interval: args.interval,
                seed: args.seed,
                ..Default::default()
            };
            let report = Emulator::new(config).context("invalid simulation parameters")?.run();
            println!("{}", report.summary);
            if !report.is_complete() {
                anyhow::bail!(
                    "delivered {} of {} accepted messages",
                    report.delivered.len(),
                    report.accepted.len()
                );
            }
        }
        Mode::Send { peer, bind, link } => {
            let socket = Socket::bind(bind).await.context("bind sender socket")?;
            log::info!("Sending from {} to {peer}", socket.local_addr);

            let (tx, rx) = mpsc::channel(64);
            let task = tokio::spawn(run_sender(socket, peer, rx, link.config()));

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            'input: while let Some(line) = lines.next_line().await? {
                for message in line_to_messages(&line) {
                    if tx.send(message).await.is_err() {
                        log::warn!("sender task stopped; no longer reading stdin");
                        break 'input;
                    }
                }
            }
            drop(tx);

            let stats = task.await.context("sender task panicked")??;
            eprintln!("sent {} packets, resent {}", stats.packets_sent, stats.packets_resent);
        }
        Mode::Recv { bind, link } => {
            let socket = Socket::bind(bind).await.context("bind receiver socket")?;
            log::info!("Receiving on {}", socket.local_addr);

            let (tx, mut rx) = mpsc::channel(64);
            let task = tokio::spawn(run_receiver(socket, tx, link.config()));

            while let Some(message) = rx.recv().await {
                let text = String::from_utf8_lossy(message.as_bytes());
                println!("{}", text.trim_end_matches('\0'));
            }
            task.await.context("receiver task panicked")??;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_line_becomes_one_message() {
        assert_eq!(line_to_messages(""), vec![Message::from_slice(b"")]);
    }

    #[test]
    fn long_line_is_chunked() {
        let line = "x".repeat(PAYLOAD_LEN + 3);
        let msgs = line_to_messages(&line);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0], Message::filled(b'x'));
        assert_eq!(msgs[1], Message::from_slice(b"xxx"));
    }

    #[test]
    fn cli_parses_simulate_flags() {
        let cli = Cli::try_parse_from(["sr", "simulate", "-n", "5", "--loss", "0.2"]).unwrap();
        match cli.mode {
            Mode::Simulate(args) => {
                assert_eq!(args.messages, 5);
                assert_eq!(args.loss, 0.2);
            }
            _ => panic!("expected simulate"),
        }
    }
}

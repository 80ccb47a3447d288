//! Integration tests for the UDP endpoints.
//!
//! Each test binds two real `tokio::net::UdpSocket`s on loopback, runs
//! `run_receiver` and `run_sender` as background tasks and checks that the
//! application at B sees exactly the messages fed to A, in order.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use selective_repeat::endpoint::{run_receiver, run_sender, EndpointConfig};
use selective_repeat::socket::Socket;
use selective_repeat::timer::TimerConfig;
use selective_repeat::{Message, Packet, RTT};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn bind_loopback() -> Socket {
    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    Socket::bind(addr).await.expect("bind loopback socket")
}

fn config(loss_prob: f64, seed: u64) -> EndpointConfig {
    EndpointConfig {
        timer: TimerConfig {
            rto: RTT,
            time_unit: Duration::from_millis(1),
        },
        loss_prob,
        seed,
    }
}

fn msg(n: usize) -> Message {
    Message::from_slice(format!("udp-{n:05}").as_bytes())
}

/// Push `count` messages from A to B and return what B delivered.
async fn transfer(count: usize, a: EndpointConfig, b: EndpointConfig) -> Vec<Message> {
    let recv_socket = bind_loopback().await;
    let recv_addr = recv_socket.local_addr;
    let send_socket = bind_loopback().await;

    // Large enough that the receiver never blocks on delivery.
    let (deliver_tx, mut deliver_rx) = mpsc::channel(count + 1);
    let receiver = tokio::spawn(run_receiver(recv_socket, deliver_tx, b));

    let (submit_tx, submit_rx) = mpsc::channel(8);
    let sender = tokio::spawn(run_sender(send_socket, recv_addr, submit_rx, a));

    for n in 0..count {
        submit_tx.send(msg(n)).await.expect("sender task alive");
    }
    drop(submit_tx);

    // B must keep acknowledging until A has seen every ACK.
    let stats = tokio::time::timeout(Duration::from_secs(20), sender)
        .await
        .expect("sender timed out")
        .expect("sender task panicked")
        .expect("sender failed");
    assert_eq!(stats.packets_sent, count as u64);

    let mut delivered = Vec::with_capacity(count);
    while delivered.len() < count {
        let m = tokio::time::timeout(Duration::from_secs(5), deliver_rx.recv())
            .await
            .expect("delivery timed out")
            .expect("receiver closed early");
        delivered.push(m);
    }

    drop(deliver_rx);
    let rstats = tokio::time::timeout(Duration::from_secs(5), receiver)
        .await
        .expect("receiver did not stop")
        .expect("receiver task panicked")
        .expect("receiver failed");
    assert_eq!(rstats.delivered, count as u64);

    delivered
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn clean_loopback_transfer() {
    let count = 30;
    let delivered = transfer(count, config(0.0, 1), config(0.0, 2)).await;
    assert_eq!(delivered, (0..count).map(msg).collect::<Vec<_>>());
}

/// Outbound drops on both sides force retransmissions and re-ACKs.
#[tokio::test]
async fn lossy_loopback_transfer() {
    let count = 40;
    let delivered = transfer(count, config(0.2, 11), config(0.2, 12)).await;
    assert_eq!(delivered, (0..count).map(msg).collect::<Vec<_>>());
}

#[tokio::test]
async fn receiver_ignores_garbage_datagrams() {
    let recv_socket = bind_loopback().await;
    let recv_addr = recv_socket.local_addr;
    let (deliver_tx, mut deliver_rx) = mpsc::channel(4);
    let receiver = tokio::spawn(run_receiver(recv_socket, deliver_tx, config(0.0, 1)));

    let raw = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    raw.send_to(b"not a packet", recv_addr).await.unwrap();

    // A well-formed packet still gets through afterwards.
    let sender = bind_loopback().await;
    let packet = Packet::data(0, msg(7));
    sender.send_to(&packet, recv_addr).await.unwrap();

    let got = tokio::time::timeout(Duration::from_secs(5), deliver_rx.recv())
        .await
        .expect("delivery timed out");
    assert_eq!(got, Some(msg(7)));

    let (ack, from) = tokio::time::timeout(Duration::from_secs(5), sender.recv_from())
        .await
        .expect("ack timed out")
        .expect("ack decodes");
    assert_eq!(from, recv_addr);
    assert_eq!(ack, Packet::ack(0));

    drop(deliver_rx);
    let stats = receiver.await.unwrap().unwrap();
    assert_eq!(stats.packets_received, 1);
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let socket = bind_loopback().await;
    let (tx, _rx) = mpsc::channel(1);
    let res = run_receiver(socket, tx, config(2.0, 1)).await;
    assert!(res.is_err());
}

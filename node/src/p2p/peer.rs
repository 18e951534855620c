use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use ledger_common::message::Message;

use crate::logic::LogicHandle;
use crate::p2p::connection::{self, ConnectionReader, ConnectionWriter};
use crate::p2p::Direction;

pub type PeerId = u64;

static NEXT_PEER_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_peer_id() -> PeerId {
    NEXT_PEER_ID.fetch_add(1, Ordering::Relaxed)
}

// A cheaply-cloneable address for a connected peer: a peer id plus the
// sending half of its outbound mailbox. Cloned into Logic's `peers` map and
// handed out for broadcast.
#[derive(Clone)]
pub struct PeerHandle {
    pub id: PeerId,
    pub direction: Direction,
    outbound: mpsc::Sender<Message>,
}

impl PeerHandle {
    // Queues `message` on this peer's write loop. Never blocks the caller
    // indefinitely past the channel's capacity; if the peer has already
    // exited, the message is silently dropped (the `on_client_closed`
    // notification is already on its way).
    pub async fn send(&self, message: Message) {
        if self.outbound.send(message).await.is_err() {
            trace!("peer {}: outbound channel closed, dropping message", self.id);
        }
    }
}

// Spawns the reader/writer tasks for an already-accepted/dialed socket.
// Returns a handle to address the peer and the `JoinHandle` of its read
// loop — the task whose exit marks the peer's end of life — for the caller
// to register under a `ChildSupervisor`.
pub fn spawn(
    id: PeerId,
    addr: SocketAddr,
    stream: TcpStream,
    direction: Direction,
    logic: LogicHandle,
    channel_size: usize,
    ping_interval_secs: u64,
) -> (PeerHandle, JoinHandle<()>) {
    let (reader, writer) = connection::split(stream);
    let (tx, rx) = mpsc::channel(channel_size);

    tokio::spawn(write_loop(id, writer, rx));
    if direction == Direction::Outbound {
        tokio::spawn(ping_loop(id, tx.clone(), ping_interval_secs));
    }
    let read_join = tokio::spawn(read_loop(id, addr, reader, logic, tx.clone()));

    (
        PeerHandle {
            id,
            direction,
            outbound: tx,
        },
        read_join,
    )
}

// Re-pings an outbound peer every `ping_interval_secs` for liveness, beyond
// the single handshake ping `on_client_ready` already sent (spec §4.9). Exits
// quietly once the peer's outbound channel is gone (peer closed or dropped).
async fn ping_loop(id: PeerId, outbound: mpsc::Sender<Message>, ping_interval_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(ping_interval_secs));
    ticker.tick().await; // first tick fires immediately, handshake already pinged once
    let mut n: u64 = 2;
    loop {
        ticker.tick().await;
        if outbound.send(Message::Ping(n)).await.is_err() {
            trace!("peer {}: ping loop exiting, outbound channel closed", id);
            break;
        }
        n += 1;
    }
}

async fn write_loop(id: PeerId, mut writer: ConnectionWriter, mut rx: mpsc::Receiver<Message>) {
    while let Some(message) = rx.recv().await {
        if let Err(e) = writer.write_message(&message).await {
            warn!("peer {}: write failed, closing: {}", id, e);
            break;
        }
    }
    trace!("peer {}: writer exiting", id);
}

async fn read_loop(
    id: PeerId,
    addr: SocketAddr,
    mut reader: ConnectionReader,
    logic: LogicHandle,
    outbound: mpsc::Sender<Message>,
) {
    let reason = loop {
        match reader.read_message().await {
            Ok(message) => {
                if log_enabled!(log::Level::Trace) {
                    trace!("peer {} ({}): <- {:?}", id, addr, message);
                }
                logic.on_client_data(id, message).await;
            }
            Err(e) => break e.to_string(),
        }
    };
    debug!("peer {} ({}): closed: {}", id, addr, reason);
    drop(outbound);
    logic.on_client_closed(id, reason).await;
}

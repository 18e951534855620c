use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout, Duration};

use ledger_common::crypto::Case;
use ledger_common::message::{BlockQuery, BlockQueryResult, Message, MessageError};
use ledger_common::time::get_current_time_in_seconds;
use ledger_common::{Block, BlockStore, GenesisConfig};

use crate::config::{NodeConfig, CLIENT_SOCKET_HANDOFF_TIMEOUT_MILLIS};
use crate::error::NodeError;
use crate::p2p::peer::{self, PeerHandle, PeerId};
use crate::p2p::supervisor::ChildSupervisor;
use crate::p2p::Direction;

// Messages Logic's mailbox accepts (spec §4.9). `ClientSocket` is the
// socket-ownership handoff from Listener/Connector; everything else is
// either a reply-less notification or routes peer frames through dispatch.
enum LogicCommand {
    Pid(oneshot::Sender<LogicHandle>),
    ClientSocket {
        stream: TcpStream,
        addr: SocketAddr,
        direction: Direction,
        reply: oneshot::Sender<PeerId>,
    },
    ClientData {
        peer: PeerId,
        message: Message,
    },
    ClientClosed {
        peer: PeerId,
        reason: String,
    },
    ListenerTerminating {
        reason: String,
    },
    // A locally-mined block entering the chain, as opposed to one arriving
    // on a peer's socket. There is no peer to reply to or exclude from
    // broadcast; otherwise this takes the identical path as an inbound
    // `{:announce, block}`.
    Announce(Block),
}

// A cheaply-cloneable address for the per-node coordinator. Every
// Peer/Listener/Connector holds one of these to talk to Logic; Logic never
// holds a synchronous reference back into a Peer (deadlock avoidance, §5).
#[derive(Clone)]
pub struct LogicHandle {
    tx: mpsc::Sender<LogicCommand>,
}

impl LogicHandle {
    pub async fn pid(&self) -> Option<LogicHandle> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(LogicCommand::Pid(reply_tx)).await.ok()?;
        reply_rx.await.ok()
    }

    // Hands an owned socket to Logic, which spawns the Peer actor that owns
    // it from here on. Bounded by `CLIENT_SOCKET_HANDOFF_TIMEOUT_MILLIS`; on
    // timeout the caller (Listener/Connector) is responsible for dropping
    // the socket itself.
    pub async fn on_client_socket(
        &self,
        stream: TcpStream,
        addr: SocketAddr,
        direction: Direction,
    ) -> Result<PeerId, NodeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(LogicCommand::ClientSocket {
                stream,
                addr,
                direction,
                reply: reply_tx,
            })
            .await
            .map_err(|_| NodeError::LogicUnavailable)?;

        timeout(
            Duration::from_millis(CLIENT_SOCKET_HANDOFF_TIMEOUT_MILLIS),
            reply_rx,
        )
        .await
        .map_err(|_| NodeError::DialTimeout)?
        .map_err(|_| NodeError::LogicUnavailable)
    }

    pub async fn on_client_data(&self, peer: PeerId, message: Message) {
        let _ = self.tx.send(LogicCommand::ClientData { peer, message }).await;
    }

    pub async fn on_client_closed(&self, peer: PeerId, reason: String) {
        let _ = self.tx.send(LogicCommand::ClientClosed { peer, reason }).await;
    }

    pub async fn on_listener_terminating(&self, reason: String) {
        let _ = self
            .tx
            .send(LogicCommand::ListenerTerminating { reason })
            .await;
    }

    // Entry point for a block this node mined itself, as opposed to one
    // read off a peer socket. Embedders drive mining externally (the miner
    // has no opinion on chain state, spec §4.6) and call this to hand the
    // result to Logic once it clears `Block::mined`.
    pub async fn announce(&self, block: Block) {
        let _ = self.tx.send(LogicCommand::Announce(block)).await;
    }
}

// Per-node coordinator state (spec §4.9). `chain` holds the newest block at
// index 0; its tail is always genesis. Private to the actor loop below —
// every mutation funnels through Logic's single mailbox.
struct LogicState {
    tag: String,
    chain: Vec<Block>,
    peers: HashMap<PeerId, PeerHandle>,
    // Last time (unix seconds) each peer was heard from, updated on `Pong`.
    // Not consensus-relevant; liveness bookkeeping only (see SPEC_FULL.md).
    last_seen: HashMap<PeerId, u64>,
    store: Arc<dyn BlockStore>,
    genesis: GenesisConfig,
    peer_channel_size: usize,
    ping_interval_secs: u64,
    clients: Arc<ChildSupervisor>,
}

// Spawns the coordinator actor and returns a handle to address it. `tag` is
// used only for log prefixing (typically the node's bind host); `clients`
// is the node's peer supervisor, shared with the embedding `NodeHandle`.
pub fn spawn(
    tag: String,
    genesis: GenesisConfig,
    store: Arc<dyn BlockStore>,
    config: &NodeConfig,
    clients: Arc<ChildSupervisor>,
) -> LogicHandle {
    let (tx, rx) = mpsc::channel(config.logic_channel_size);
    let handle = LogicHandle { tx };

    let state = LogicState {
        tag,
        chain: vec![genesis.block()],
        peers: HashMap::new(),
        last_seen: HashMap::new(),
        store,
        genesis,
        peer_channel_size: config.peer_channel_size,
        ping_interval_secs: config.ping_interval_secs,
        clients,
    };

    tokio::spawn(run(state, rx, handle.clone()));
    handle
}

async fn run(mut state: LogicState, mut rx: mpsc::Receiver<LogicCommand>, self_handle: LogicHandle) {
    if let Err(e) = state.store.store(state.chain[0].clone()).await {
        warn!("logic({}): failed to persist genesis: {}", state.tag, e);
    }

    while let Some(command) = rx.recv().await {
        match command {
            LogicCommand::Pid(reply) => {
                let _ = reply.send(self_handle.clone());
            }
            LogicCommand::ClientSocket {
                stream,
                addr,
                direction,
                reply,
            } => {
                let id = peer::next_peer_id();
                let (handle, read_join) = peer::spawn(
                    id,
                    addr,
                    stream,
                    direction,
                    self_handle.clone(),
                    state.peer_channel_size,
                    state.ping_interval_secs,
                );
                state.clients.add(read_join);
                state.peers.insert(id, handle.clone());
                debug!(
                    "logic({}): registered {:?} peer {} ({})",
                    state.tag, direction, id, addr
                );
                let _ = reply.send(id);
                state.on_client_ready(&handle).await;
            }
            LogicCommand::ClientData { peer, message } => {
                state.on_client_data(peer, message).await;
            }
            LogicCommand::ClientClosed { peer, reason } => {
                state.last_seen.remove(&peer);
                if state.peers.remove(&peer).is_some() {
                    debug!("logic({}): peer {} closed ({})", state.tag, peer, reason);
                }
            }
            LogicCommand::ListenerTerminating { reason } => {
                warn!("logic({}): listener terminating: {}", state.tag, reason);
            }
            LogicCommand::Announce(block) => {
                state.handle_incoming_block(block).await;
            }
        }
    }

    debug!(
        "logic({}): shutting down with {} peers open",
        state.tag,
        state.peers.len()
    );
}

impl LogicState {
    // §4.9: an outbound peer starts the handshake by pinging and asking for
    // the remote's highest block; an inbound peer just waits to be asked.
    async fn on_client_ready(&self, peer: &PeerHandle) {
        if peer.direction == Direction::Outbound {
            peer.send(Message::Ping(1)).await;
            peer.send(Message::BlockQuery(BlockQuery::Highest)).await;
        }
    }

    async fn on_client_data(&mut self, peer: PeerId, message: Message) {
        let handle = match self.peers.get(&peer) {
            Some(handle) => handle.clone(),
            None => return,
        };

        match message {
            Message::Ping(n) => handle.send(Message::Pong(n)).await,
            Message::Pong(_) => {
                let seen_at = get_current_time_in_seconds();
                self.last_seen.insert(peer, seen_at);
                trace!("logic({}): peer {} alive as of {}", self.tag, peer, seen_at);
            }
            Message::BlockQuery(query) => {
                let result = self.process_block_query(query).await;
                handle.send(Message::BlockResponse(result)).await;
            }
            Message::BlockResponse(BlockQueryResult::Block(block)) => {
                self.handle_incoming_block(block).await;
            }
            Message::BlockResponse(BlockQueryResult::Blocks(blocks)) => {
                for block in blocks {
                    self.handle_incoming_block(block).await;
                }
            }
            Message::BlockResponse(BlockQueryResult::Err(e)) => {
                trace!("logic({}): peer {} block query failed: {}", self.tag, peer, e);
            }
            Message::Announce(block) => self.handle_incoming_block(block).await,
        }
    }

    // Open Question decision (see DESIGN.md): unlike `Block::ancestry`,
    // which excludes its starting block, the `{ancestry, h}` protocol reply
    // includes the target block itself, oldest-first.
    async fn process_block_query(&self, query: BlockQuery) -> BlockQueryResult {
        match query {
            BlockQuery::Genesis => BlockQueryResult::Block(self.genesis.block()),
            BlockQuery::Highest => BlockQueryResult::Block(self.head().clone()),
            BlockQuery::Ancestry(hash) => match self.store.find_by_hash(&hash).await {
                Ok(block) => match block.ancestry(self.store.as_ref(), None).await {
                    Ok(mut ancestors) => {
                        ancestors.push(block);
                        BlockQueryResult::Blocks(ancestors)
                    }
                    Err(e) => {
                        warn!("logic({}): ancestry walk failed: {}", self.tag, e);
                        BlockQueryResult::Err(MessageError::UnknownBlockHash)
                    }
                },
                Err(_) => BlockQueryResult::Err(MessageError::UnknownBlockHash),
            },
        }
    }

    fn head(&self) -> &Block {
        self.chain
            .first()
            .expect("chain always holds at least genesis")
    }

    // Chain extension policy (spec §4.9, minimal and explicit): a block is
    // accepted onto `chain` iff it is mined and directly extends the
    // current head. Valid blocks that don't extend the head are persisted
    // but left orphaned in memory — fork choice is explicitly out of scope
    // (see DESIGN.md Open Question decisions).
    async fn handle_incoming_block(&mut self, block: Block) {
        if !block.mined(self.store.as_ref()).await {
            trace!(
                "logic({}): rejecting unmined/invalid block {}",
                self.tag,
                block.hash
            );
            return;
        }

        if let Err(e) = self.store.store(block.clone()).await {
            warn!("logic({}): failed to persist block {}: {}", self.tag, block.hash, e);
            return;
        }

        let head = self.head();
        if block.parent_hash == head.hash && block.height == head.height + 1 {
            info!(
                "logic({}): chain extended to height {} ({})",
                self.tag,
                block.height,
                block.hash.readable_short(Case::Lower)
            );
            self.chain.insert(0, block.clone());
            self.broadcast(Message::Announce(block)).await;
        } else {
            trace!(
                "logic({}): stored orphan block {} at height {}",
                self.tag,
                block.hash,
                block.height
            );
        }
    }

    async fn broadcast(&self, message: Message) {
        for peer in self.peers.values() {
            peer.send(message.clone()).await;
        }
    }
}

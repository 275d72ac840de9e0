//! Single owner of the ledger, the peer set and the miner.
//!
//! All protocol logic runs inside one task that handles a command at a time,
//! so ledger mutation, inbound message handling and broadcast never
//! interleave. The nonce search runs on the blocking pool and reports back
//! through the same command queue.

use crate::constants::COMMAND_CHANNEL_CAPACITY;
use crate::error::NodeError;
use crate::message::Message;
use crate::p2p;
use ledger_core::{Block, Ledger, Miner, MiningError, Reconciliation};
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

pub type PeerId = u64;

type Reply<T> = oneshot::Sender<Result<T, NodeError>>;

enum Command {
    Blocks {
        reply: oneshot::Sender<Vec<Block>>,
    },
    Peers {
        reply: oneshot::Sender<Vec<String>>,
    },
    Mine {
        data: Value,
        reply: Reply<Block>,
    },
    Mined {
        result: Result<Block, MiningError>,
        reply: Reply<Block>,
    },
    PeerConnected {
        addr: String,
        outbound: mpsc::Sender<Message>,
        reply: oneshot::Sender<PeerId>,
    },
    PeerMessage {
        peer: PeerId,
        message: Message,
    },
    PeerDisconnected {
        peer: PeerId,
    },
    Shutdown,
}

struct Peer {
    addr: String,
    outbound: mpsc::Sender<Message>,
}

/// Cloneable front door to a running [`Node`].
#[derive(Clone)]
pub struct NodeHandle {
    commands: mpsc::Sender<Command>,
}

pub struct Node {
    ledger: Ledger,
    peers: BTreeMap<PeerId, Peer>,
    next_peer: PeerId,
    miner: Miner,
    commands: mpsc::WeakSender<Command>,
}

impl Node {
    /// Start a node holding only the genesis block.
    pub fn spawn() -> NodeHandle {
        Self::spawn_with_ledger(Ledger::new())
    }

    pub fn spawn_with_ledger(ledger: Ledger) -> NodeHandle {
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let node = Node {
            ledger,
            peers: BTreeMap::new(),
            next_peer: 0,
            miner: Miner::new(),
            commands: tx.downgrade(),
        };
        tokio::spawn(node.run(rx));
        NodeHandle { commands: tx }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        info!(height = self.ledger.head().index, "node started");
        while let Some(command) = commands.recv().await {
            if let Command::Shutdown = command {
                break;
            }
            self.handle(command);
        }
        self.miner.cancel();
        info!(peers = self.peers.len(), "node stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Blocks { reply } => {
                let _ = reply.send(self.ledger.blocks().to_vec());
            }
            Command::Peers { reply } => {
                let _ = reply.send(self.peers.values().map(|p| p.addr.clone()).collect());
            }
            Command::Mine { data, reply } => self.start_mining(data, reply),
            Command::Mined { result, reply } => self.finish_mining(result, reply),
            Command::PeerConnected {
                addr,
                outbound,
                reply,
            } => {
                let peer = self.next_peer;
                self.next_peer += 1;
                info!(peer, %addr, "peer connected");
                self.peers.insert(peer, Peer { addr, outbound });
                self.send(peer, Message::QueryLatest);
                let _ = reply.send(peer);
            }
            Command::PeerMessage { peer, message } => self.on_message(peer, message),
            Command::PeerDisconnected { peer } => {
                if let Some(p) = self.peers.remove(&peer) {
                    info!(peer, addr = %p.addr, "peer disconnected");
                }
            }
            Command::Shutdown => {}
        }
    }

    fn on_message(&mut self, peer: PeerId, message: Message) {
        match message {
            Message::QueryLatest => self.send(peer, self.latest_message()),
            Message::QueryAll => {
                self.send(peer, Message::ResponseChain(self.ledger.blocks().to_vec()))
            }
            Message::ResponseChain(mut blocks) => {
                blocks.sort_by_key(|b| b.index);
                let outcome = self.ledger.reconcile(&blocks);
                debug!(peer, received = blocks.len(), ?outcome, "handled chain response");
                if outcome == Reconciliation::QueryAll {
                    self.send(peer, Message::QueryAll);
                }
                if outcome.head_changed() {
                    self.broadcast(self.latest_message());
                }
            }
        }
    }

    fn start_mining(&self, data: Value, reply: Reply<Block>) {
        let previous = self.ledger.head().clone();
        let miner = self.miner.clone();
        let commands = self.commands.clone();
        tokio::task::spawn_blocking(move || {
            let result = miner.mine(&previous, data);
            if let Some(commands) = commands.upgrade() {
                let _ = commands.blocking_send(Command::Mined { result, reply });
            }
        });
    }

    fn finish_mining(&mut self, result: Result<Block, MiningError>, reply: Reply<Block>) {
        let block = match result {
            Ok(block) => block,
            Err(e) => {
                let _ = reply.send(Err(e.into()));
                return;
            }
        };
        match self.ledger.append(block.clone()) {
            Ok(()) => {
                info!(index = block.index, hash = %block.hash, "block added");
                self.broadcast(self.latest_message());
                let _ = reply.send(Ok(block));
            }
            Err(e) => {
                // The head moved while the search ran; mine again on top of it.
                warn!(index = block.index, error = %e, "mined block is stale, restarting");
                self.start_mining(block.data, reply);
            }
        }
    }

    fn latest_message(&self) -> Message {
        Message::ResponseChain(vec![self.ledger.head().clone()])
    }

    fn send(&self, peer: PeerId, message: Message) {
        if let Some(p) = self.peers.get(&peer) {
            Self::enqueue(peer, p, message);
        }
    }

    fn broadcast(&self, message: Message) {
        for (&id, p) in &self.peers {
            Self::enqueue(id, p, message.clone());
        }
    }

    /// Queue without waiting. A full or closed queue drops the message.
    fn enqueue(peer: PeerId, p: &Peer, message: Message) {
        match p.outbound.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(peer, addr = %p.addr, "peer queue full, dropping message")
            }
            Err(TrySendError::Closed(_)) => debug!(peer, "peer writer gone, dropping message"),
        }
    }
}

impl NodeHandle {
    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, NodeError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| NodeError::Stopped)?;
        rx.await.map_err(|_| NodeError::Stopped)
    }

    /// The full ledger, genesis first.
    pub async fn blocks(&self) -> Result<Vec<Block>, NodeError> {
        self.request(|reply| Command::Blocks { reply }).await
    }

    /// Address of every open peer connection.
    pub async fn peers(&self) -> Result<Vec<String>, NodeError> {
        self.request(|reply| Command::Peers { reply }).await
    }

    /// Mine a block carrying `data`, append it and announce it to every peer.
    pub async fn mine(&self, data: Value) -> Result<Block, NodeError> {
        self.request(|reply| Command::Mine { data, reply }).await?
    }

    /// Dial `url` in the background; failures are logged, never retried.
    pub fn add_peer(&self, url: String) {
        let node = self.clone();
        tokio::spawn(async move {
            if let Err(e) = p2p::connect(node, &url).await {
                warn!(peer = %url, error = %e, "connection failed");
            }
        });
    }

    /// Register an open connection. The node immediately queries its head.
    ///
    /// `outbound` should hold [`crate::PEER_QUEUE_CAPACITY`] messages; anything the
    /// node cannot queue for a slow peer is dropped.
    pub async fn register_peer(
        &self,
        addr: String,
        outbound: mpsc::Sender<Message>,
    ) -> Result<PeerId, NodeError> {
        self.request(|reply| Command::PeerConnected {
            addr,
            outbound,
            reply,
        })
        .await
    }

    pub async fn deliver(&self, peer: PeerId, message: Message) -> Result<(), NodeError> {
        self.commands
            .send(Command::PeerMessage { peer, message })
            .await
            .map_err(|_| NodeError::Stopped)
    }

    pub async fn peer_disconnected(&self, peer: PeerId) {
        let _ = self.commands.send(Command::PeerDisconnected { peer }).await;
    }

    /// Stop the node, cancelling any in-flight search and dropping all peers.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }
}

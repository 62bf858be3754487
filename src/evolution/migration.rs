//! Migration of individuals between nodes.
//!
//! The transport is external. The engine hands over its best tables every
//! `migrtime` generations and polls once per generation for tables sent by
//! its predecessor in the ring.

use crossbeam::channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use tracing::{debug, warn};

use crate::chromosome::Table;
use crate::error::Result;

/// Link from one node to the next node of the ring.
pub trait MigrationChannel {
    /// Sends tables to the next node. Must not block.
    fn send(&mut self, tables: Vec<Table>) -> Result<()>;

    /// Returns a batch received from the previous node, if one is waiting.
    fn try_recv(&mut self) -> Option<Vec<Table>>;
}

/// Batches a link holds before new emigrants are dropped.
pub const MIGRATION_QUEUE: usize = 4;

/// In-process ring link built on bounded crossbeam channels, for running
/// several nodes as threads of one process. A slow receiver never blocks
/// the sender: batches beyond the queue capacity are dropped.
#[derive(Debug)]
pub struct ChannelMigration {
    outgoing: Sender<Vec<Table>>,
    incoming: Receiver<Vec<Table>>,
    peer_gone: bool,
}

impl ChannelMigration {
    /// Creates `nodes` links where node `n` sends to node `n + 1` and the
    /// last node sends to the first.
    pub fn ring(nodes: usize) -> Vec<ChannelMigration> {
        Self::ring_with_capacity(nodes, MIGRATION_QUEUE)
    }

    /// Like [`ring`](Self::ring) with `capacity` queued batches per link.
    pub fn ring_with_capacity(nodes: usize, capacity: usize) -> Vec<ChannelMigration> {
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..nodes).map(|_| bounded(capacity.max(1))).unzip();
        let mut receivers: Vec<Option<Receiver<Vec<Table>>>> =
            receivers.into_iter().map(Some).collect();

        senders
            .into_iter()
            .enumerate()
            .filter_map(|(n, outgoing)| {
                // Node n reads from the channel node n - 1 writes to.
                let from = (n + nodes - 1) % nodes;
                receivers[from]
                    .take()
                    .map(|incoming| ChannelMigration {
                        outgoing,
                        incoming,
                        peer_gone: false,
                    })
            })
            .collect()
    }
}

impl MigrationChannel for ChannelMigration {
    fn send(&mut self, tables: Vec<Table>) -> Result<()> {
        match self.outgoing.try_send(tables) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                debug!(count = dropped.len(), "migration queue full, dropping emigrants");
            }
            // A finished neighbour is not an error for the remaining nodes.
            Err(TrySendError::Disconnected(_)) => {
                if !self.peer_gone {
                    warn!("migration receiver has shut down, dropping emigrants");
                    self.peer_gone = true;
                }
            }
        }
        Ok(())
    }

    fn try_recv(&mut self) -> Option<Vec<Table>> {
        match self.incoming.try_recv() {
            Ok(tables) => Some(tables),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                if !self.peer_gone {
                    warn!("migration sender disconnected");
                    self.peer_gone = true;
                }
                None
            }
        }
    }
}

//! The in-memory ledger and its fork-choice rules.

use crate::validation::{validate_block, validate_chain, ValidationError};
use crate::{genesis_block, Block};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdoptError {
    #[error("received chain is not longer: ours {ours}, theirs {theirs}")]
    NotLonger { ours: usize, theirs: usize },

    #[error("received chain is invalid: {0}")]
    Invalid(#[from] ValidationError),
}

/// What the ledger did with a batch of blocks received from a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The batch held no blocks.
    Empty,
    /// Our head is at least as high as the peer's.
    NotAhead,
    /// The peer's head extended ours and was appended.
    Appended,
    /// The peer is ahead but its head does not link to ours; ask for its full chain.
    QueryAll,
    /// The batch was a longer valid chain and replaced ours.
    Replaced,
    /// The batch failed validation; nothing changed.
    Rejected,
}

impl Reconciliation {
    /// True when the local head moved and must be re-broadcast.
    pub fn head_changed(self) -> bool {
        matches!(self, Self::Appended | Self::Replaced)
    }
}

/// Ordered, append-only sequence of blocks rooted at genesis.
///
/// Mutated only by [`Ledger::append`] or wholesale replacement; never empty.
#[derive(Clone, Debug)]
pub struct Ledger {
    blocks: Vec<Block>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            blocks: vec![genesis_block()],
        }
    }

    /// Build a ledger from an existing chain, which must be valid from genesis.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, ValidationError> {
        validate_chain(&blocks)?;
        Ok(Self { blocks })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn head(&self) -> &Block {
        // Starts at genesis and is only ever replaced by a validated chain.
        &self.blocks[self.blocks.len() - 1]
    }

    /// Append `block` if it extends the current head.
    pub fn append(&mut self, block: Block) -> Result<(), ValidationError> {
        validate_block(&block, self.head())?;
        debug!(index = block.index, hash = %block.hash, "appending block");
        self.blocks.push(block);
        Ok(())
    }

    /// Replace the ledger with `candidate` iff it is valid and strictly longer.
    pub fn try_adopt_longer(&mut self, candidate: Vec<Block>) -> Result<(), AdoptError> {
        if candidate.len() <= self.blocks.len() {
            return Err(AdoptError::NotLonger {
                ours: self.blocks.len(),
                theirs: candidate.len(),
            });
        }
        validate_chain(&candidate)?;
        info!(
            old_len = self.blocks.len(),
            new_len = candidate.len(),
            "received chain is valid, replacing current chain"
        );
        self.blocks = candidate;
        Ok(())
    }

    /// Fold a batch of peer blocks, sorted by ascending index, into the ledger.
    ///
    /// A single block that links onto our head is appended; a single block
    /// that does not link asks for the full chain; anything longer is treated
    /// as a candidate chain.
    pub fn reconcile(&mut self, received: &[Block]) -> Reconciliation {
        let Some(latest) = received.last() else {
            return Reconciliation::Empty;
        };
        let held = self.head();
        if latest.index <= held.index {
            debug!(
                ours = held.index,
                theirs = latest.index,
                "received chain is not longer, ignoring"
            );
            return Reconciliation::NotAhead;
        }

        info!(ours = held.index, theirs = latest.index, "chain possibly behind");
        if held.hash == latest.previous_hash {
            return match self.append(latest.clone()) {
                Ok(()) => Reconciliation::Appended,
                Err(e) => {
                    warn!(error = %e, "rejecting received head");
                    Reconciliation::Rejected
                }
            };
        }
        if received.len() == 1 {
            debug!("received head does not link, querying full chain");
            return Reconciliation::QueryAll;
        }
        match self.try_adopt_longer(received.to_vec()) {
            Ok(()) => Reconciliation::Replaced,
            Err(e) => {
                warn!(error = %e, "rejecting received chain");
                Reconciliation::Rejected
            }
        }
    }
}

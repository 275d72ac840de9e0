//! Structural checks for single blocks and whole chains.
//!
//! Only linkage and fingerprints are verified. The puzzle predicate is not
//! re-checked on received blocks and genesis is compared by value, never
//! rehashed.

use crate::{genesis_block, Block, Hash};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid index: expected {expected}, got {actual}")]
    IndexMismatch { expected: u64, actual: u64 },

    #[error("invalid previous hash: expected {expected}, got {actual}")]
    PreviousHashMismatch { expected: Hash, actual: Hash },

    #[error("invalid hash: computed {computed}, block claims {claimed}")]
    HashMismatch { computed: Hash, claimed: Hash },

    #[error("chain is empty")]
    EmptyChain,

    #[error("first block is not the canonical genesis block")]
    GenesisMismatch,

    #[error("block at position {position} is invalid: {source}")]
    InvalidBlock {
        position: usize,
        #[source]
        source: Box<ValidationError>,
    },
}

/// Check that `candidate` extends `previous`, stopping at the first failure.
pub fn validate_block(candidate: &Block, previous: &Block) -> Result<(), ValidationError> {
    let expected = previous.index + 1;
    if candidate.index != expected {
        return Err(ValidationError::IndexMismatch {
            expected,
            actual: candidate.index,
        });
    }
    if candidate.previous_hash != previous.hash {
        return Err(ValidationError::PreviousHashMismatch {
            expected: previous.hash.clone(),
            actual: candidate.previous_hash.clone(),
        });
    }
    let computed = candidate.calculate_hash();
    if computed != candidate.hash {
        return Err(ValidationError::HashMismatch {
            computed,
            claimed: candidate.hash.clone(),
        });
    }
    Ok(())
}

pub fn is_valid_block(candidate: &Block, previous: &Block) -> bool {
    validate_block(candidate, previous).is_ok()
}

pub fn validate_chain(chain: &[Block]) -> Result<(), ValidationError> {
    let first = chain.first().ok_or(ValidationError::EmptyChain)?;
    if *first != genesis_block() {
        return Err(ValidationError::GenesisMismatch);
    }
    for (position, pair) in chain.windows(2).enumerate() {
        validate_block(&pair[1], &pair[0]).map_err(|e| ValidationError::InvalidBlock {
            position: position + 1,
            source: Box::new(e),
        })?;
    }
    Ok(())
}

pub fn is_valid_chain(chain: &[Block]) -> bool {
    validate_chain(chain).is_ok()
}

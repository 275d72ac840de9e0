use crate::{fingerprint, pow::satisfies_puzzle, Block};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MiningError {
    #[error("mining cancelled")]
    Cancelled,

    #[error("nonce space exhausted for block {index}")]
    NonceSpaceExhausted { index: u64 },
}

/// Proof-of-work search over sequential nonces.
///
/// Clones share the cancellation flag and hash counter, so a handle kept by
/// the caller can stop a search running on another thread.
#[derive(Clone, Debug, Default)]
pub struct Miner {
    cancelled: Arc<AtomicBool>,
    total_hashes: Arc<AtomicU64>,
}

impl Miner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop every search sharing this handle. Searches started afterwards
    /// return immediately.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Hashes computed across all searches on this handle.
    pub fn hash_count(&self) -> u64 {
        self.total_hashes.load(Ordering::Relaxed)
    }

    /// Mine the block following `previous`, timestamped with the system clock.
    pub fn mine(&self, previous: &Block, data: Value) -> Result<Block, MiningError> {
        self.mine_with_clock(previous, data, unix_now)
    }

    /// Try nonces 0, 1, 2, ... resampling `clock` before each attempt, and
    /// return the first block whose hash tail is prime.
    pub fn mine_with_clock<C>(
        &self,
        previous: &Block,
        data: Value,
        mut clock: C,
    ) -> Result<Block, MiningError>
    where
        C: FnMut() -> u64,
    {
        let index = previous.index + 1;
        debug!(index, previous = %previous.hash, "starting nonce search");

        let mut nonce: u64 = 0;
        loop {
            if self.is_cancelled() {
                return Err(MiningError::Cancelled);
            }

            let timestamp = clock();
            let hash = fingerprint(index, &previous.hash, timestamp, &data, nonce);
            self.total_hashes.fetch_add(1, Ordering::Relaxed);

            if satisfies_puzzle(&hash) {
                info!(index, nonce, hash = %hash, "block mined");
                return Ok(Block::new(
                    index,
                    previous.hash.clone(),
                    timestamp,
                    data,
                    hash,
                    None,
                    nonce,
                ));
            }

            nonce = nonce
                .checked_add(1)
                .ok_or(MiningError::NonceSpaceExhausted { index })?;
        }
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

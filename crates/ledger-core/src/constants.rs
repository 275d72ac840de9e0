pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// Trailing hex digits of a block hash inspected by the puzzle.
pub const PUZZLE_TAIL_HEX_LEN: usize = 4;

pub const GENESIS_PREVIOUS_HASH: &str = "0";
pub const GENESIS_TIMESTAMP: u64 = 1_682_839_690;
pub const GENESIS_DATA: &str = "RUT-MIIT first block";
/// Digest of the genesis fields without the nonce, as published on the network.
pub const GENESIS_HASH: &str = "8d9d5a7ff4a78042ea6737bf59c772f8ed27ef3c9b576eac1976c91aaf48d2de";

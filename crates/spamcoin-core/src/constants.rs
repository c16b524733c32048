pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// A difficulty above this can never be met by a hex digest.
pub const MAX_DIFFICULTY: u32 = HASH_HEX_SIZE as u32;
pub const GENESIS_DATA: &str = "Let there be coin.";
pub const GENESIS_PREVIOUS_HASH: &str = "0";
pub const PROGRESS_INTERVAL: u64 = 100;
pub const MAX_THREADS: usize = 1024;
pub const DEFAULT_CHAIN_HEIGHT: u64 = 20;

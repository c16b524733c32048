//! Errors surfaced by chain assembly and the nonce search.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ChainError>;

/// Everything that can go wrong while configuring, mining or validating a chain.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A chain needs at least its genesis block.
    #[error("target height must be at least 1, got {0}")]
    InvalidHeight(u64),
    /// No hex digest has that many characters.
    #[error("difficulty {difficulty} exceeds the maximum of {max}")]
    DifficultyTooHigh { difficulty: u32, max: u32 },
    /// `threads` was zero or above the supported maximum.
    #[error("thread count must be between 1 and {max}, got {threads}")]
    InvalidThreadCount { threads: usize, max: usize },
    /// Every nonce allowed by `max_attempts` was tried without success.
    #[error("no valid nonce for block {height} after {attempts} attempts")]
    SearchExhausted { height: u64, attempts: u64 },
    /// The search ran past its deadline.
    #[error("deadline exceeded mining block {height} after {attempts} attempts")]
    DeadlineExceeded { height: u64, attempts: u64 },
    /// The cancel token was tripped.
    #[error("mining of block {height} was cancelled")]
    Cancelled { height: u64 },
    /// A block does not follow the current tip.
    #[error("block {height} does not link to its predecessor: {reason}")]
    BrokenLink { height: u64, reason: String },
    /// A block's stored hash disagrees with its fields.
    #[error("block {height} carries a hash that does not match its contents")]
    HashMismatch { height: u64 },
    /// A block in the chain misses the expected difficulty.
    #[error("block {height} does not meet difficulty {difficulty}")]
    InsufficientWork { height: u64, difficulty: u32 },
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

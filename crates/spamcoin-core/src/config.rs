use crate::{
    constants::{MAX_DIFFICULTY, MAX_THREADS, PROGRESS_INTERVAL},
    error::{ChainError, Result},
};
use std::time::Duration;

/// Knobs for the nonce search. Passed explicitly into mining and chain
/// assembly; there is no process-wide state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MiningConfig {
    /// Required leading zero digits. `None` or `Some(0)` disables proof-of-work.
    pub difficulty: Option<u32>,
    /// Emit a progress line every `progress_interval` attempts.
    pub verbose: bool,
    pub progress_interval: u64,
    /// Upper bound on nonces tried per block.
    pub max_attempts: Option<u64>,
    /// Wall-clock budget per block.
    pub deadline: Option<Duration>,
    /// Search a single block's nonce space on this many threads.
    pub threads: Option<usize>,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            difficulty: None,
            verbose: false,
            progress_interval: PROGRESS_INTERVAL,
            max_attempts: None,
            deadline: None,
            threads: None,
        }
    }
}

impl MiningConfig {
    pub fn with_difficulty(mut self, difficulty: Option<u32>) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u64>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    /// Difficulty with zero folded into "no proof-of-work".
    pub fn effective_difficulty(&self) -> Option<u32> {
        self.difficulty.filter(|d| *d > 0)
    }

    /// Number of worker threads when the parallel search applies.
    pub fn parallelism(&self) -> Option<usize> {
        self.threads.filter(|n| *n > 1)
    }

    /// Rejects settings that could never produce a block.
    pub fn validate(&self) -> Result<()> {
        if let Some(difficulty) = self.difficulty {
            if difficulty > MAX_DIFFICULTY {
                return Err(ChainError::DifficultyTooHigh {
                    difficulty,
                    max: MAX_DIFFICULTY,
                });
            }
        }
        if let Some(threads) = self.threads {
            if threads == 0 || threads > MAX_THREADS {
                return Err(ChainError::InvalidThreadCount {
                    threads,
                    max: MAX_THREADS,
                });
            }
        }
        Ok(())
    }
}

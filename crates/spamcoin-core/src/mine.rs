use crate::{
    clock::Clock,
    config::MiningConfig,
    error::{ChainError, Result},
    pow::meets_difficulty,
    Block,
};
use rayon::{prelude::*, ThreadPool};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::Instant,
};
use tracing::{debug, dispatcher, info, Dispatch};

/// Nonces handed to each worker per parallel round.
const PARALLEL_BATCH_PER_THREAD: u64 = 1024;

/// Shared flag that stops an in-flight nonce search. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Placeholder payload for a mined block.
pub fn block_data(height: u64) -> String {
    format!("This is where the block transactions would go.  Height: {height}.")
}

/// Derives the block that follows `last_block`.
///
/// The timestamp is read from `clock` once and shared by every nonce attempt.
/// Without a difficulty the nonce-0 block is returned as is; otherwise the
/// lowest nonce whose hash meets the difficulty wins.
pub fn mine_next_block(
    last_block: &Block,
    config: &MiningConfig,
    clock: &dyn Clock,
    cancel: &CancelToken,
) -> Result<Block> {
    Miner::new(config.clone())?.mine_next_block(last_block, clock, cancel)
}

/// Searches nonces `0, 1, 2, …` for `template` until its hash meets the
/// configured difficulty, honouring `max_attempts`, `deadline` and `cancel`.
///
/// Only the nonce of `template` varies; every other field is reused.
pub fn search_nonce(
    template: &Block,
    config: &MiningConfig,
    cancel: &CancelToken,
) -> Result<Block> {
    Miner::new(config.clone())?.search_nonce(template, cancel)
}

/// A validated [`MiningConfig`] plus the worker pool for the parallel search,
/// built once and reused for every block.
pub struct Miner {
    config: MiningConfig,
    pool: Option<ThreadPool>,
}

impl Miner {
    pub fn new(config: MiningConfig) -> Result<Self> {
        config.validate()?;
        let pool = match config.effective_difficulty().and(config.parallelism()) {
            Some(threads) => Some(build_pool(threads)?),
            None => None,
        };
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &MiningConfig {
        &self.config
    }

    /// Worker threads of the parallel search, if it applies.
    pub fn threads(&self) -> Option<usize> {
        self.pool.as_ref().map(ThreadPool::current_num_threads)
    }

    pub fn mine_next_block(
        &self,
        last_block: &Block,
        clock: &dyn Clock,
        cancel: &CancelToken,
    ) -> Result<Block> {
        let height = last_block.height() + 1;
        let template = Block::new(
            height,
            clock.now(),
            block_data(height),
            last_block.hash(),
            0,
        );

        let block = if self.config.effective_difficulty().is_some() {
            self.search_nonce(&template, cancel)?
        } else {
            template
        };

        debug!(
            height,
            nonce = block.nonce(),
            hash = block.hash(),
            "mined block"
        );
        Ok(block)
    }

    pub fn search_nonce(&self, template: &Block, cancel: &CancelToken) -> Result<Block> {
        match &self.pool {
            Some(pool) => search_parallel(template, &self.config, cancel, pool),
            None => search_sequential(template, &self.config, cancel),
        }
    }
}

/// Workers log through the subscriber that is current where the pool is built.
fn build_pool(threads: usize) -> Result<ThreadPool> {
    let dispatch = dispatcher::get_default(Dispatch::clone);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("spamcoin-miner-{i}"))
        .spawn_handler(move |worker| {
            let dispatch = dispatch.clone();
            let name = worker.name().unwrap_or("spamcoin-miner").to_owned();
            thread::Builder::new()
                .name(name)
                .spawn(move || dispatcher::with_default(&dispatch, || worker.run()))?;
            Ok(())
        })
        .build()?;
    Ok(pool)
}

fn search_sequential(
    template: &Block,
    config: &MiningConfig,
    cancel: &CancelToken,
) -> Result<Block> {
    let difficulty = config.effective_difficulty().unwrap_or(0);
    let height = template.height();
    let limit = config.max_attempts.unwrap_or(u64::MAX);
    let started = Instant::now();

    let mut attempts = 0u64;
    while attempts < limit {
        if cancel.is_cancelled() {
            return Err(ChainError::Cancelled { height });
        }
        if config.deadline.is_some_and(|d| started.elapsed() >= d) {
            return Err(ChainError::DeadlineExceeded { height, attempts });
        }

        let nonce = attempts;
        let hash = Block::compute_hash(
            height,
            &template.timestamp(),
            template.data(),
            template.previous_hash(),
            nonce,
        );
        attempts += 1;
        if meets_difficulty(&hash, difficulty) {
            return Ok(template.with_nonce(nonce));
        }
        report_progress(config, height, attempts);
    }

    Err(ChainError::SearchExhausted { height, attempts })
}

/// Splits the nonce space into consecutive windows and scans each window on
/// `pool`. `find_map_first` keeps the result identical to the sequential
/// search: the lowest satisfying nonce.
fn search_parallel(
    template: &Block,
    config: &MiningConfig,
    cancel: &CancelToken,
    pool: &ThreadPool,
) -> Result<Block> {
    let difficulty = config.effective_difficulty().unwrap_or(0);
    let height = template.height();
    let limit = config.max_attempts.unwrap_or(u64::MAX);
    let window = PARALLEL_BATCH_PER_THREAD.saturating_mul(pool.current_num_threads() as u64);
    let timestamp = template.timestamp();
    let attempts = AtomicU64::new(0);
    let started = Instant::now();

    let mut start = 0u64;
    while start < limit {
        let end = start.saturating_add(window).min(limit);
        let found = pool.install(|| {
            (start..end).into_par_iter().find_map_first(|nonce| {
                if cancel.is_cancelled() {
                    return Some(Err(ChainError::Cancelled { height }));
                }
                if config.deadline.is_some_and(|d| started.elapsed() >= d) {
                    return Some(Err(ChainError::DeadlineExceeded {
                        height,
                        attempts: attempts.load(Ordering::Relaxed),
                    }));
                }
                let hash = Block::compute_hash(
                    height,
                    &timestamp,
                    template.data(),
                    template.previous_hash(),
                    nonce,
                );
                let done = attempts.fetch_add(1, Ordering::Relaxed) + 1;
                report_progress(config, height, done);
                meets_difficulty(&hash, difficulty).then_some(Ok(nonce))
            })
        });

        match found {
            Some(Ok(nonce)) => return Ok(template.with_nonce(nonce)),
            Some(Err(err)) => return Err(err),
            None => start = end,
        }
    }

    Err(ChainError::SearchExhausted {
        height,
        attempts: attempts.into_inner(),
    })
}

fn report_progress(config: &MiningConfig, height: u64, attempts: u64) {
    if !config.verbose || config.progress_interval == 0 {
        return;
    }
    if attempts % config.progress_interval == 0 {
        info!(height, "{attempts} rounds");
    }
}

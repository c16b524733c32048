use crate::{
    clock::Clock,
    config::MiningConfig,
    constants::{GENESIS_DATA, GENESIS_PREVIOUS_HASH},
    error::{ChainError, Result},
    mine::{CancelToken, Miner},
    Block,
};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::info;

/// Height 0, predecessor `"0"`, nonce 0.
pub fn create_genesis_block(clock: &dyn Clock) -> Block {
    Block::new(0, clock.now(), GENESIS_DATA, GENESIS_PREVIOUS_HASH, 0)
}

/// Append-only sequence of blocks starting at genesis.
#[derive(Clone, Debug, Serialize)]
#[serde(transparent)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Chain {
    pub fn new(clock: &dyn Clock) -> Self {
        Self {
            blocks: vec![create_genesis_block(clock)],
        }
    }

    pub fn tip(&self) -> &Block {
        // `blocks` always holds at least the genesis block.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn genesis(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, height: u64) -> Option<&Block> {
        usize::try_from(height).ok().and_then(|i| self.blocks.get(i))
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// Appends `block` if it directly follows the current tip.
    pub fn push(&mut self, block: Block) -> Result<()> {
        check_link(self.tip(), &block)?;
        self.blocks.push(block);
        Ok(())
    }

    /// Re-checks every stored hash and link, and the difficulty of each
    /// non-genesis block when one is given.
    pub fn validate(&self, difficulty: Option<u32>) -> Result<()> {
        for block in &self.blocks {
            if !block.has_valid_hash() {
                return Err(ChainError::HashMismatch {
                    height: block.height(),
                });
            }
        }
        if !self.genesis().is_genesis() {
            return Err(ChainError::BrokenLink {
                height: self.genesis().height(),
                reason: "first block is not a genesis block".into(),
            });
        }
        for pair in self.blocks.windows(2) {
            check_link(&pair[0], &pair[1])?;
            if let Some(difficulty) = difficulty.filter(|d| *d > 0) {
                if !pair[1].meets_difficulty(difficulty) {
                    return Err(ChainError::InsufficientWork {
                        height: pair[1].height(),
                        difficulty,
                    });
                }
            }
        }
        Ok(())
    }

    /// Mean nonce over every block, genesis included.
    pub fn average_nonce(&self) -> f64 {
        let total: u128 = self.blocks.iter().map(|b| u128::from(b.nonce())).sum();
        total as f64 / self.blocks.len() as f64
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

fn check_link(previous: &Block, next: &Block) -> Result<()> {
    if next.height() != previous.height() + 1 {
        return Err(ChainError::BrokenLink {
            height: next.height(),
            reason: format!("expected height {}", previous.height() + 1),
        });
    }
    if next.previous_hash() != previous.hash() {
        return Err(ChainError::BrokenLink {
            height: next.height(),
            reason: format!("previous hash should be {}", previous.hash()),
        });
    }
    Ok(())
}

/// A finished chain plus how long it took to mine.
#[derive(Clone, Debug)]
pub struct BuildReport {
    pub chain: Chain,
    pub elapsed: Duration,
}

impl BuildReport {
    pub fn average_nonce(&self) -> f64 {
        self.chain.average_nonce()
    }
}

/// Builds a chain of `target_height` blocks, genesis included.
pub fn build_chain(
    target_height: u64,
    config: &MiningConfig,
    clock: &dyn Clock,
) -> Result<BuildReport> {
    build_chain_with(target_height, config, clock, &CancelToken::new(), |_| {})
}

/// Like [`build_chain`], calling `on_block` for every block appended after
/// genesis. The first search error aborts assembly.
pub fn build_chain_with<F>(
    target_height: u64,
    config: &MiningConfig,
    clock: &dyn Clock,
    cancel: &CancelToken,
    mut on_block: F,
) -> Result<BuildReport>
where
    F: FnMut(&Block),
{
    if target_height == 0 {
        return Err(ChainError::InvalidHeight(target_height));
    }
    let miner = Miner::new(config.clone())?;

    let started = Instant::now();
    let mut chain = Chain::new(clock);
    for _ in 1..target_height {
        let block = miner.mine_next_block(chain.tip(), clock, cancel)?;
        chain.push(block)?;
        on_block(chain.tip());
    }
    let elapsed = started.elapsed();

    info!(
        blocks = chain.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        average_nonce = chain.average_nonce(),
        "chain built"
    );
    Ok(BuildReport { chain, elapsed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FixedClock, SystemClock, Timestamp};
    use chrono::{DateTime, Utc};

    fn fixed_clock() -> FixedClock {
        let at: Timestamp = DateTime::parse_from_rfc3339("2021-03-14T15:09:26.535897Z")
            .unwrap()
            .with_timezone(&Utc);
        FixedClock::new(at)
    }

    #[test]
    fn genesis_block_example() {
        let genesis = create_genesis_block(&fixed_clock());
        assert_eq!(genesis.height(), 0);
        assert_eq!(genesis.previous_hash(), "0");
        assert_eq!(genesis.nonce(), 0);
        assert_eq!(genesis.data(), "Let there be coin.");
        assert_eq!(
            genesis.hash(),
            "bf8fcb506b7e394744157bb72f25bf1cf6db517a48c9d5d0b91ef8e03478a854"
        );
    }

    #[test]
    fn new_chain_holds_only_genesis() {
        let chain = Chain::new(&SystemClock);
        assert_eq!(chain.len(), 1);
        assert!(!chain.is_empty());
        assert_eq!(chain.tip(), chain.genesis());
        assert!(chain.validate(None).is_ok());
    }

    #[test]
    fn push_rejects_wrong_predecessor() {
        let clock = fixed_clock();
        let mut chain = Chain::new(&clock);
        let stray = Block::new(1, clock.now(), "stray", "not-the-tip", 0);
        let err = chain.push(stray).unwrap_err();
        assert!(matches!(err, ChainError::BrokenLink { height: 1, .. }));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn push_rejects_wrong_height() {
        let clock = fixed_clock();
        let mut chain = Chain::new(&clock);
        let tip_hash = chain.tip().hash().to_string();
        let skipped = Block::new(2, clock.now(), "skip", tip_hash, 0);
        assert!(matches!(
            chain.push(skipped),
            Err(ChainError::BrokenLink { height: 2, .. })
        ));
    }

    #[test]
    fn three_blocks_without_difficulty() {
        let report = build_chain(3, &MiningConfig::default(), &fixed_clock()).unwrap();
        let chain = &report.chain;
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.blocks()[1].nonce(), 0);
        assert_eq!(chain.blocks()[2].nonce(), 0);
        assert_eq!(chain.blocks()[1].previous_hash(), chain.blocks()[0].hash());
        assert_eq!(report.average_nonce(), 0.0);
        assert!(chain.validate(None).is_ok());
    }

    #[test]
    fn difficulty_two_chain_is_reproducible() {
        let config = MiningConfig::default().with_difficulty(Some(2));
        let report = build_chain(3, &config, &fixed_clock()).unwrap();
        let chain = &report.chain;
        assert_eq!(chain.get(1).unwrap().nonce(), 88);
        assert_eq!(chain.get(2).unwrap().nonce(), 52);
        assert_eq!(
            chain.tip().hash(),
            "00f2cec9f6aa625048ff02cb4b15ddf8763b4c7730820f4ee2b29c8319caf11d"
        );
        assert!((report.average_nonce() - 140.0 / 3.0).abs() < 1e-9);
        assert!(chain.validate(Some(2)).is_ok());
        assert!(matches!(
            chain.validate(Some(3)),
            Err(ChainError::InsufficientWork { .. })
        ));
    }

    #[test]
    fn zero_height_is_rejected() {
        let err = build_chain(0, &MiningConfig::default(), &SystemClock).unwrap_err();
        assert!(matches!(err, ChainError::InvalidHeight(0)));
    }

    #[test]
    fn height_one_is_just_genesis() {
        let report = build_chain(1, &MiningConfig::default(), &SystemClock).unwrap();
        assert_eq!(report.chain.len(), 1);
        assert!(report.chain.tip().is_genesis());
    }

    #[test]
    fn on_block_sees_every_mined_block() {
        let mut seen = Vec::new();
        let report = build_chain_with(
            5,
            &MiningConfig::default(),
            &fixed_clock(),
            &CancelToken::new(),
            |block| seen.push(block.height()),
        )
        .unwrap();
        assert_eq!(seen, vec![1, 2, 3, 4]);
        assert_eq!(report.chain.len(), 5);
    }

    #[test]
    fn search_error_aborts_assembly() {
        let config = MiningConfig::default()
            .with_difficulty(Some(2))
            .with_max_attempts(Some(10));
        let err = build_chain(3, &config, &fixed_clock()).unwrap_err();
        assert!(matches!(
            err,
            ChainError::SearchExhausted {
                height: 1,
                attempts: 10
            }
        ));
    }

    #[test]
    fn chain_serializes_as_array() {
        let report = build_chain(2, &MiningConfig::default(), &fixed_clock()).unwrap();
        let json = serde_json::to_value(&report.chain).unwrap();
        let blocks = json.as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1]["previous_hash"], blocks[0]["hash"]);
    }
}

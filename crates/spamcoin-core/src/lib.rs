//! A minimal proof-of-work block chain.
//!
//! Each [`Block`] hashes its own fields at construction and points at its
//! predecessor's hash. [`chain::build_chain`] grows a [`Chain`] from a genesis
//! block, optionally searching nonces until every hash starts with the
//! configured number of `'0'` digits.

pub mod block;
pub mod chain;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod mine;
pub mod pow;

pub use block::Block;
pub use chain::{build_chain, build_chain_with, create_genesis_block, BuildReport, Chain};
pub use clock::{Clock, FixedClock, SystemClock, Timestamp};
pub use config::MiningConfig;
pub use error::{ChainError, Result};
pub use mine::{block_data, mine_next_block, search_nonce, CancelToken, Miner};

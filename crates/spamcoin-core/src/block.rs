use crate::{clock::Timestamp, constants::GENESIS_PREVIOUS_HASH, pow};
use chrono::{SecondsFormat, SubsecRound};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// One link of the chain. The hash is computed once, in [`Block::new`], and
/// every field is read-only afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Block {
    height: u64,
    timestamp: Timestamp,
    data: String,
    previous_hash: String,
    nonce: u64,
    hash: String,
}

impl Block {
    pub fn new(
        height: u64,
        timestamp: Timestamp,
        data: impl Into<String>,
        previous_hash: impl Into<String>,
        nonce: u64,
    ) -> Self {
        // The canonical encoding carries microseconds; anything finer would
        // give two distinct blocks the same preimage.
        let timestamp = timestamp.trunc_subsecs(6);
        let data = data.into();
        let previous_hash = previous_hash.into();
        let hash = Self::compute_hash(height, &timestamp, &data, &previous_hash, nonce);
        Self {
            height,
            timestamp,
            data,
            previous_hash,
            nonce,
            hash,
        }
    }

    /// Lowercase hex SHA-256 over `height ++ timestamp ++ data ++ previous_hash ++ nonce`,
    /// each field in its canonical text form, no separators.
    pub fn compute_hash(
        height: u64,
        timestamp: &Timestamp,
        data: &str,
        previous_hash: &str,
        nonce: u64,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(height.to_string().as_bytes());
        hasher.update(canonical_timestamp(timestamp).as_bytes());
        hasher.update(data.as_bytes());
        hasher.update(previous_hash.as_bytes());
        hasher.update(nonce.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn is_genesis(&self) -> bool {
        self.height == 0 && self.previous_hash == GENESIS_PREVIOUS_HASH
    }

    /// Recomputes the digest from the fields and compares it with the stored one.
    pub fn has_valid_hash(&self) -> bool {
        self.hash
            == Self::compute_hash(
                self.height,
                &self.timestamp,
                &self.data,
                &self.previous_hash,
                self.nonce,
            )
    }

    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        pow::meets_difficulty(&self.hash, difficulty)
    }

    /// Same height, timestamp, data and predecessor, different nonce.
    pub(crate) fn with_nonce(&self, nonce: u64) -> Self {
        Self::new(
            self.height,
            self.timestamp,
            self.data.clone(),
            self.previous_hash.clone(),
            nonce,
        )
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}: {}", self.height, self.hash)
    }
}

/// RFC 3339 with exactly six fractional digits and a numeric offset,
/// e.g. `2021-03-14T15:09:26.535897+00:00`.
pub fn canonical_timestamp(timestamp: &Timestamp) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, false)
}

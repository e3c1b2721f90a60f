use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use utoipa::ToSchema;

use super::transaction::Transaction;

/// Proof carried by the genesis block
pub const GENESIS_PROOF: u64 = 100;

/// Previous hash carried by the genesis block, which has no predecessor
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// Errors that can occur while hashing a block
#[derive(Debug, Error)]
pub enum BlockError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Represents a block in the blockchain
///
/// Field order is significant: it fixes the canonical serialization that
/// [`Block::hash`] digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Block {
    /// Position of the block in the chain, starting at 1
    pub index: u64,

    /// Unix timestamp (seconds) when the block was forged
    pub timestamp: i64,

    /// Transactions included in this block
    pub transactions: Vec<Transaction>,

    /// Proof of work
    pub proof: u64,

    /// Hash of the previous block
    pub previous_hash: String,
}

impl Block {
    /// Creates a new block stamped with the current time
    ///
    /// # Arguments
    ///
    /// * `index` - The index of the block in the chain
    /// * `transactions` - The transactions to include in the block
    /// * `proof` - The proof of work
    /// * `previous_hash` - The hash of the previous block
    pub fn new(index: u64, transactions: Vec<Transaction>, proof: u64, previous_hash: String) -> Self {
        Block {
            index,
            timestamp: Utc::now().timestamp(),
            transactions,
            proof,
            previous_hash,
        }
    }

    /// Creates the first block of a chain
    pub fn genesis() -> Self {
        Block::new(1, Vec::new(), GENESIS_PROOF, GENESIS_PREVIOUS_HASH.to_string())
    }

    /// Calculates the hash of the block
    ///
    /// # Returns
    ///
    /// The SHA-256 digest of the block's JSON encoding as a hexadecimal string
    pub fn hash(&self) -> Result<String, BlockError> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

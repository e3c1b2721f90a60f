// Blockchain module
//
// This module contains the ledger engine including:
// - Block structure and hashing
// - Transaction structure
// - Proof of work algorithm
// - Blockchain structure and consensus
// - Peer client used by consensus

pub mod block;
pub mod chain;
pub mod peer;
pub mod pow;
pub mod transaction;

// Re-export main components for easier access
pub use block::Block;
pub use chain::Blockchain;
pub use peer::{ChainResponse, HttpPeerClient};
pub use transaction::Transaction;

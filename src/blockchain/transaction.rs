use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Sender used for coins issued by the network as a mining reward
pub const NETWORK_SENDER: &str = "0";

/// Amount credited to a node for mining a block
pub const MINING_REWARD: i64 = 1;

/// Errors that can occur when checking a submitted transaction
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Missing sender")]
    MissingSender,

    #[error("Missing recipient")]
    MissingRecipient,

    #[error("Missing amount")]
    MissingAmount,
}

/// Represents a transfer of coins between two parties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Sender's identifier
    pub sender: String,

    /// Recipient's identifier
    pub recipient: String,

    /// Amount being transferred
    pub amount: i64,
}

impl Transaction {
    /// Creates a new transaction
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: i64) -> Self {
        Transaction {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }

    /// Creates the reward transaction paying `recipient` for a mined block
    ///
    /// # Arguments
    ///
    /// * `recipient` - The identifier of the mining node
    pub fn new_reward(recipient: impl Into<String>) -> Self {
        Transaction::new(NETWORK_SENDER, recipient, MINING_REWARD)
    }

    /// Checks that every required field carries a value
    ///
    /// An empty party or a zero amount counts as missing.
    pub fn validate(&self) -> Result<(), TransactionError> {
        if self.sender.is_empty() {
            return Err(TransactionError::MissingSender);
        }
        if self.recipient.is_empty() {
            return Err(TransactionError::MissingRecipient);
        }
        if self.amount == 0 {
            return Err(TransactionError::MissingAmount);
        }
        Ok(())
    }

    /// Checks if the transaction was issued by the network
    pub fn is_reward(&self) -> bool {
        self.sender == NETWORK_SENDER
    }
}

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use actix_web::http::Uri;
use futures::future::join_all;
use log::{debug, info, warn};
use thiserror::Error;
use uuid::Uuid;

use super::block::{Block, BlockError};
use super::peer::PeerClient;
use super::pow::ProofOfWork;
use super::transaction::Transaction;

/// Errors that can occur during blockchain operations
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("Block error: {0}")]
    BlockError(#[from] BlockError),

    #[error("Chain has no blocks")]
    EmptyChain,
}

/// Chain and pending pool, always locked together
#[derive(Debug)]
struct LedgerState {
    chain: Vec<Block>,
    pending_transactions: Vec<Transaction>,
}

impl LedgerState {
    fn last_block(&self) -> Result<&Block, BlockchainError> {
        self.chain.last().ok_or(BlockchainError::EmptyChain)
    }
}

/// The node's ledger
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Debug, Clone)]
pub struct Blockchain {
    /// Identifier credited with mining rewards
    node_id: String,

    /// The chain of blocks and the transactions waiting for the next block
    state: Arc<RwLock<LedgerState>>,

    /// Hosts of the registered peer nodes
    nodes: Arc<Mutex<HashSet<String>>>,

    /// Puzzle every block after genesis must solve
    pow: ProofOfWork,

    /// Used to fetch peer chains during conflict resolution
    peer_client: Arc<dyn PeerClient>,
}

impl Blockchain {
    /// Creates a new blockchain with a genesis block and the default difficulty
    pub fn new(peer_client: Arc<dyn PeerClient>) -> Self {
        Blockchain::with_proof_of_work(ProofOfWork::default(), peer_client)
    }

    /// Creates a new blockchain with a genesis block
    ///
    /// # Arguments
    ///
    /// * `pow` - The proof of work puzzle used for mining and validation
    /// * `peer_client` - The client used to reach peer nodes
    pub fn with_proof_of_work(pow: ProofOfWork, peer_client: Arc<dyn PeerClient>) -> Self {
        let node_id = Uuid::new_v4().to_string();
        info!("Created ledger for node {}", node_id);

        Blockchain {
            node_id,
            state: Arc::new(RwLock::new(LedgerState {
                chain: vec![Block::genesis()],
                pending_transactions: Vec::new(),
            })),
            nodes: Arc::new(Mutex::new(HashSet::new())),
            pow,
            peer_client,
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_nodes(&self) -> MutexGuard<'_, HashSet<String>> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn proof_of_work(&self) -> &ProofOfWork {
        &self.pow
    }

    /// Gets the entire blockchain
    pub fn get_chain(&self) -> Vec<Block> {
        self.read_state().chain.clone()
    }

    /// Gets all pending transactions
    pub fn get_pending_transactions(&self) -> Vec<Transaction> {
        self.read_state().pending_transactions.clone()
    }

    /// Adds a transaction to the pending pool
    ///
    /// # Returns
    ///
    /// The index of the block expected to include the transaction. Every
    /// transaction queued before the next mine shares that index.
    pub fn add_transaction(&self, transaction: Transaction) -> u64 {
        let mut state = self.write_state();
        debug!(
            "Queued transaction {} -> {} ({})",
            transaction.sender, transaction.recipient, transaction.amount
        );
        state.pending_transactions.push(transaction);

        state.chain.last().map_or(1, |block| block.index + 1)
    }

    /// Mines a new block holding the pending transactions and this node's reward
    ///
    /// The proof is searched without holding the ledger lock. Only the
    /// transactions pending when the search started go into the block; if
    /// the chain tip moves in the meantime the search starts over.
    pub fn mine_block(&self) -> Result<Block, BlockchainError> {
        loop {
            let (tip, pending_count) = {
                let state = self.read_state();
                (state.last_block()?.clone(), state.pending_transactions.len())
            };

            let proof = self.pow.find_proof(tip.proof);

            let mut state = self.write_state();
            if state.chain.last() != Some(&tip) {
                warn!("Chain tip changed while mining block {}, searching again", tip.index + 1);
                continue;
            }

            let previous_hash = tip.hash()?;
            let take = pending_count.min(state.pending_transactions.len());
            let mut transactions: Vec<Transaction> =
                state.pending_transactions.drain(..take).collect();
            transactions.push(Transaction::new_reward(self.node_id.as_str()));

            let block = Block::new(state.chain.len() as u64 + 1, transactions, proof, previous_hash);
            state.chain.push(block.clone());

            info!(
                "Forged block {} with proof {} and {} transactions",
                block.index,
                block.proof,
                block.transactions.len()
            );
            return Ok(block);
        }
    }

    /// Determines whether `chain` is valid
    ///
    /// Every block after the first must link to the hash of its predecessor
    /// and carry a proof valid against the predecessor's proof.
    pub fn validate_chain(&self, chain: &[Block]) -> bool {
        chain.windows(2).all(|pair| {
            let (previous, block) = (&pair[0], &pair[1]);

            match previous.hash() {
                Ok(hash) if hash == block.previous_hash => {}
                Ok(_) => {
                    debug!("Block {} does not link to block {}", block.index, previous.index);
                    return false;
                }
                Err(err) => {
                    warn!("Could not hash block {}: {}", previous.index, err);
                    return false;
                }
            }

            if !self.pow.valid_proof(previous.proof, block.proof) {
                debug!("Block {} carries an invalid proof {}", block.index, block.proof);
                return false;
            }

            true
        })
    }

    /// Validates this node's own chain
    pub fn is_valid(&self) -> bool {
        let state = self.read_state();
        self.validate_chain(&state.chain)
    }

    /// Registers a peer node
    ///
    /// Peers are keyed by `host[:port]`; the scheme and path are dropped.
    /// Addresses that cannot be parsed, or that name no host, are logged and
    /// ignored.
    ///
    /// # Returns
    ///
    /// The key the peer was registered under
    pub fn register_node(&self, address: &str) -> Option<String> {
        let uri = match address.parse::<Uri>() {
            Ok(uri) => uri,
            Err(err) => {
                warn!("Ignoring malformed node address {:?}: {}", address, err);
                return None;
            }
        };

        let host = match uri.authority() {
            Some(authority) if !authority.host().is_empty() => {
                match (authority.port(), authority.port_u16()) {
                    (_, Some(port)) => format!("{}:{}", authority.host(), port),
                    (None, None) => authority.host().to_string(),
                    (Some(port), None) => {
                        warn!("Ignoring node address with invalid port {}: {:?}", port, address);
                        return None;
                    }
                }
            }
            _ => {
                warn!("Ignoring node address without a host: {:?}", address);
                return None;
            }
        };

        if self.lock_nodes().insert(host.clone()) {
            info!("Registered node {}", host);
        }
        Some(host)
    }

    /// Gets the registered peer nodes in sorted order
    pub fn nodes(&self) -> Vec<String> {
        let mut nodes: Vec<String> = self.lock_nodes().iter().cloned().collect();
        nodes.sort();
        nodes
    }

    /// Consensus: replaces our chain with the longest valid chain among peers
    ///
    /// Peers are queried concurrently. Any peer that cannot be reached or
    /// answers with something other than a chain is skipped.
    ///
    /// # Returns
    ///
    /// true if our chain was replaced
    pub async fn resolve_conflicts(&self) -> bool {
        let nodes = self.nodes();
        let current_length = self.read_state().chain.len();

        let responses = join_all(nodes.iter().map(|host| self.peer_client.fetch_chain(host))).await;

        let mut max_length = current_length;
        let mut new_chain = None;
        for (host, response) in nodes.iter().zip(responses) {
            let remote = match response {
                Ok(remote) => remote,
                Err(err) => {
                    warn!("Skipping node {}: {}", host, err);
                    continue;
                }
            };

            if remote.chain.len() <= max_length {
                debug!("Node {} has {} blocks, not longer than {}", host, remote.chain.len(), max_length);
                continue;
            }
            if !self.validate_chain(&remote.chain) {
                warn!("Node {} served an invalid chain of {} blocks", host, remote.chain.len());
                continue;
            }

            max_length = remote.chain.len();
            new_chain = Some(remote.chain);
        }

        let Some(new_chain) = new_chain else {
            return false;
        };

        let mut state = self.write_state();
        if new_chain.len() <= state.chain.len() {
            info!("Local chain grew to {} blocks while resolving, keeping it", state.chain.len());
            return false;
        }

        info!("Replacing chain of {} blocks with {} blocks", state.chain.len(), new_chain.len());
        state.chain = new_chain;
        true
    }
}

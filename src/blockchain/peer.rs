use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::block::Block;

/// Errors that can occur while fetching a peer's chain
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected status {0}")]
    Status(u16),

    #[error("Reported length {reported} does not match {actual} blocks")]
    LengthMismatch { reported: usize, actual: usize },
}

/// A node's chain snapshot, as served on `GET /chain`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChainResponse {
    /// The blocks in the chain
    pub chain: Vec<Block>,

    /// The length of the chain
    pub length: usize,
}

impl ChainResponse {
    pub fn new(chain: Vec<Block>) -> Self {
        ChainResponse {
            length: chain.len(),
            chain,
        }
    }
}

/// Source of remote chains used during conflict resolution
#[async_trait]
pub trait PeerClient: Send + Sync + fmt::Debug {
    /// Fetches the current chain of the peer at `host`
    async fn fetch_chain(&self, host: &str) -> Result<ChainResponse, PeerError>;
}

/// Fetches chains over plain HTTP
#[derive(Debug, Clone)]
pub struct HttpPeerClient {
    client: reqwest::Client,
}

impl HttpPeerClient {
    /// Creates a client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, PeerError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpPeerClient { client })
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn fetch_chain(&self, host: &str) -> Result<ChainResponse, PeerError> {
        let url = format!("http://{}/chain", host);
        debug!("Fetching chain from {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(PeerError::Status(response.status().as_u16()));
        }

        let remote: ChainResponse = response.json().await?;
        if remote.length != remote.chain.len() {
            return Err(PeerError::LengthMismatch {
                reported: remote.length,
                actual: remote.chain.len(),
            });
        }

        Ok(remote)
    }
}

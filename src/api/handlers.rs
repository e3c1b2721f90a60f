use actix_web::{web, HttpResponse, Responder};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::{Blockchain, ChainResponse, Transaction};

/// Data structure for the blockchain state
pub type BlockchainData = web::Data<Blockchain>;

/// Request for the transaction endpoint
///
/// Missing fields deserialize to empty values and are rejected afterwards.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionRequest {
    /// The sender's identifier
    #[serde(default)]
    pub sender: String,

    /// The recipient's identifier
    #[serde(default)]
    pub recipient: String,

    /// The amount to transfer
    #[serde(default)]
    pub amount: i64,
}

/// Generic response carrying a human readable message
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Response for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineResponse {
    /// The message
    pub message: String,

    /// Index of the newly forged block
    pub index: u64,

    /// Transactions included in the block
    pub transactions: Vec<Transaction>,

    /// Proof of work of the block
    pub proof: u64,

    /// Hash of the previous block
    pub previous_hash: String,
}

/// Request for the node registration endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct RegisterNodesRequest {
    /// Addresses of the peer nodes, e.g. `http://192.168.0.5:5000`
    #[serde(default)]
    pub nodes: Vec<String>,
}

/// Response for the node registration endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct RegisterNodesResponse {
    pub message: String,

    /// Every node known after registration
    pub total_nodes: Vec<String>,
}

/// Response for the node listing endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct NodesResponse {
    pub nodes: Vec<String>,
}

/// Response for the conflict resolution endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ResolveResponse {
    pub message: String,

    /// Our chain after resolution
    pub chain: Vec<crate::blockchain::Block>,
}

/// Response for the validation endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
}

fn error_response(status: actix_web::http::StatusCode, message: String) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({ "error": message }))
}

/// Get the full blockchain
///
/// Returns the entire chain and its length. Peers fetch this endpoint
/// during conflict resolution.
#[utoipa::path(
    get,
    path = "/chain",
    responses(
        (status = 200, description = "Blockchain retrieved successfully", body = ChainResponse)
    )
)]
pub async fn get_chain(blockchain: BlockchainData) -> impl Responder {
    HttpResponse::Ok().json(ChainResponse::new(blockchain.get_chain()))
}

/// Mine a new block
///
/// Runs the proof of work and forges a block with every pending
/// transaction plus this node's reward
#[utoipa::path(
    get,
    path = "/mine",
    responses(
        (status = 200, description = "Block forged successfully", body = MineResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn mine_block(blockchain: BlockchainData) -> impl Responder {
    // Proof search is CPU bound, keep it off the async workers
    let mined = web::block(move || blockchain.mine_block()).await;

    match mined {
        Ok(Ok(block)) => {
            let response = MineResponse {
                message: "New Block Forged".to_string(),
                index: block.index,
                transactions: block.transactions,
                proof: block.proof,
                previous_hash: block.previous_hash,
            };
            HttpResponse::Ok().json(response)
        }
        Ok(Err(err)) => {
            error!("Failed to mine block: {}", err);
            error_response(
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to mine block: {}", err),
            )
        }
        Err(err) => {
            error!("Mining task failed: {}", err);
            error_response(
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                format!("Mining task failed: {}", err),
            )
        }
    }
}

/// Create a new transaction
///
/// Adds a new transaction to the pending pool
#[utoipa::path(
    post,
    path = "/transactions/new",
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Transaction queued", body = MessageResponse),
        (status = 400, description = "Missing values")
    )
)]
pub async fn new_transaction(
    blockchain: BlockchainData,
    transaction_req: web::Json<TransactionRequest>,
) -> impl Responder {
    let request = transaction_req.into_inner();
    let transaction = Transaction::new(request.sender, request.recipient, request.amount);

    if let Err(err) = transaction.validate() {
        warn!("Rejected transaction: {}", err);
        return error_response(actix_web::http::StatusCode::BAD_REQUEST, err.to_string());
    }

    let index = blockchain.add_transaction(transaction);

    HttpResponse::Created().json(MessageResponse {
        message: format!("Transaction will be added to Block {}", index),
    })
}

/// Get all pending transactions
///
/// Returns all transactions waiting to be included in a block
#[utoipa::path(
    get,
    path = "/transactions/pending",
    responses(
        (status = 200, description = "Pending transactions retrieved successfully", body = Vec<Transaction>)
    )
)]
pub async fn get_pending_transactions(blockchain: BlockchainData) -> impl Responder {
    HttpResponse::Ok().json(blockchain.get_pending_transactions())
}

/// Register peer nodes
///
/// Addresses that cannot be parsed are skipped
#[utoipa::path(
    post,
    path = "/nodes/register",
    request_body = RegisterNodesRequest,
    responses(
        (status = 200, description = "Nodes registered", body = RegisterNodesResponse),
        (status = 400, description = "Malformed request body")
    )
)]
pub async fn register_nodes(
    blockchain: BlockchainData,
    nodes_req: web::Json<RegisterNodesRequest>,
) -> impl Responder {
    for address in &nodes_req.nodes {
        blockchain.register_node(address);
    }

    HttpResponse::Ok().json(RegisterNodesResponse {
        message: "New nodes have been added".to_string(),
        total_nodes: blockchain.nodes(),
    })
}

/// List peer nodes
#[utoipa::path(
    get,
    path = "/nodes",
    responses(
        (status = 200, description = "Registered nodes", body = NodesResponse)
    )
)]
pub async fn get_nodes(blockchain: BlockchainData) -> impl Responder {
    HttpResponse::Ok().json(NodesResponse {
        nodes: blockchain.nodes(),
    })
}

/// Resolve conflicts
///
/// Replaces our chain with the longest valid chain among the peer nodes
#[utoipa::path(
    get,
    path = "/nodes/resolve",
    responses(
        (status = 200, description = "Consensus reached", body = ResolveResponse)
    )
)]
pub async fn resolve_conflicts(blockchain: BlockchainData) -> impl Responder {
    let replaced = blockchain.resolve_conflicts().await;

    let message = if replaced {
        "Our chain was replaced"
    } else {
        "Our chain is authoritative"
    };
    info!("{}", message);

    HttpResponse::Ok().json(ResolveResponse {
        message: message.to_string(),
        chain: blockchain.get_chain(),
    })
}

/// Check if the blockchain is valid
///
/// Validates this node's own chain
#[utoipa::path(
    get,
    path = "/validate",
    responses(
        (status = 200, description = "Blockchain validation status", body = ValidateResponse)
    )
)]
pub async fn validate_chain(blockchain: BlockchainData) -> impl Responder {
    HttpResponse::Ok().json(ValidateResponse {
        valid: blockchain.is_valid(),
        length: blockchain.get_chain().len(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{http::StatusCode, test, App};

    use super::*;
    use crate::api::configure_routes;
    use crate::blockchain::chain::tests::{test_blockchain, MockPeerClient};

    macro_rules! init_app {
        ($blockchain:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($blockchain))
                    .configure(configure_routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_get_chain() {
        let app = init_app!(test_blockchain(Arc::new(MockPeerClient::default())));

        let req = test::TestRequest::get().uri("/chain").to_request();
        let resp: ChainResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(resp.length, 1);
        assert_eq!(resp.chain[0].index, 1);
        assert_eq!(resp.chain[0].previous_hash, "1");
    }

    #[actix_web::test]
    async fn test_transaction_then_mine() {
        let blockchain = test_blockchain(Arc::new(MockPeerClient::default()));
        let node_id = blockchain.node_id().to_string();
        let app = init_app!(blockchain.clone());

        let req = test::TestRequest::post()
            .uri("/transactions/new")
            .set_json(serde_json::json!({"sender": "a", "recipient": "b", "amount": 5}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: MessageResponse = test::read_body_json(resp).await;
        assert_eq!(body.message, "Transaction will be added to Block 2");

        let req = test::TestRequest::get().uri("/transactions/pending").to_request();
        let pending: Vec<Transaction> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(pending, vec![Transaction::new("a", "b", 5)]);

        let req = test::TestRequest::get().uri("/mine").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: MineResponse = test::read_body_json(resp).await;
        assert_eq!(body.message, "New Block Forged");
        assert_eq!(body.index, 2);
        assert_eq!(
            body.transactions,
            vec![Transaction::new("a", "b", 5), Transaction::new_reward(node_id)]
        );

        assert_eq!(blockchain.get_chain().len(), 2);
        assert!(blockchain.get_pending_transactions().is_empty());

        let req = test::TestRequest::get().uri("/validate").to_request();
        let body: ValidateResponse = test::call_and_read_body_json(&app, req).await;
        assert!(body.valid);
        assert_eq!(body.length, 2);
    }

    #[actix_web::test]
    async fn test_transaction_missing_values() {
        let blockchain = test_blockchain(Arc::new(MockPeerClient::default()));
        let app = init_app!(blockchain.clone());

        for body in [
            serde_json::json!({"sender": "a", "recipient": "b"}),
            serde_json::json!({"sender": "", "recipient": "b", "amount": 5}),
            serde_json::json!({"recipient": "b", "amount": 5}),
            serde_json::json!({"sender": "a", "recipient": "b", "amount": 0}),
        ] {
            let req = test::TestRequest::post()
                .uri("/transactions/new")
                .set_json(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }

        assert!(blockchain.get_pending_transactions().is_empty());
    }

    #[actix_web::test]
    async fn test_malformed_body_is_bad_request() {
        let app = init_app!(test_blockchain(Arc::new(MockPeerClient::default())));

        let req = test::TestRequest::post()
            .uri("/transactions/new")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["error"].is_string());
    }

    #[actix_web::test]
    async fn test_register_nodes() {
        let app = init_app!(test_blockchain(Arc::new(MockPeerClient::default())));

        let req = test::TestRequest::post()
            .uri("/nodes/register")
            .set_json(serde_json::json!({
                "nodes": ["http://127.0.0.1:5001", "http://127.0.0.1:5001", "bad address"]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: RegisterNodesResponse = test::read_body_json(resp).await;
        assert_eq!(body.message, "New nodes have been added");
        assert_eq!(body.total_nodes, vec!["127.0.0.1:5001".to_string()]);

        let req = test::TestRequest::get().uri("/nodes").to_request();
        let body: NodesResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.nodes, vec!["127.0.0.1:5001".to_string()]);
    }

    #[actix_web::test]
    async fn test_resolve_conflicts() {
        let client = Arc::new(MockPeerClient::default());
        let blockchain = test_blockchain(client.clone());
        let app = init_app!(blockchain.clone());

        let req = test::TestRequest::get().uri("/nodes/resolve").to_request();
        let body: ResolveResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.message, "Our chain is authoritative");
        assert_eq!(body.chain.len(), 1);

        let remote = test_blockchain(client.clone());
        remote.mine_block().unwrap();
        client.set_chain("peer:5000", remote.get_chain());
        blockchain.register_node("http://peer:5000");

        let req = test::TestRequest::get().uri("/nodes/resolve").to_request();
        let body: ResolveResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.message, "Our chain was replaced");
        assert_eq!(body.chain, remote.get_chain());
    }
}

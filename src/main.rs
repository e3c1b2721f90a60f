use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use log::{debug, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod blockchain;
mod config;

use blockchain::{Blockchain, HttpPeerClient};
use config::Config;

/// Periodically runs conflict resolution against the registered nodes
fn spawn_resolver(blockchain: Blockchain, period: Duration) {
    info!("Resolving conflicts every {:?}", period);

    actix_web::rt::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let replaced = blockchain.resolve_conflicts().await;
            debug!("Periodic resolution finished, replaced: {}", replaced);
        }
    });
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::get_chain,
        api::handlers::mine_block,
        api::handlers::new_transaction,
        api::handlers::get_pending_transactions,
        api::handlers::register_nodes,
        api::handlers::get_nodes,
        api::handlers::resolve_conflicts,
        api::handlers::validate_chain
    ),
    components(
        schemas(
            blockchain::Block,
            blockchain::Transaction,
            blockchain::ChainResponse,
            api::handlers::TransactionRequest,
            api::handlers::MessageResponse,
            api::handlers::MineResponse,
            api::handlers::RegisterNodesRequest,
            api::handlers::RegisterNodesResponse,
            api::handlers::NodesResponse,
            api::handlers::ResolveResponse,
            api::handlers::ValidateResponse
        )
    ),
    tags(
        (name = "ledger", description = "Ledger node API endpoints")
    ),
    info(
        title = "Ledger Node API",
        version = "0.1.0",
        description = "A proof-of-work ledger node with longest-chain consensus",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
struct ApiDoc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().context("Invalid configuration")?;

    let peer_client = HttpPeerClient::new(config.peer_timeout).context("Failed to build peer client")?;
    let blockchain = Blockchain::new(Arc::new(peer_client));
    info!(
        "Node {} mining at difficulty {}",
        blockchain.node_id(),
        blockchain.proof_of_work().difficulty()
    );

    if let Some(period) = config.resolve_interval {
        spawn_resolver(blockchain.clone(), period);
    }

    let blockchain = web::Data::new(blockchain);

    info!("Node running on {}:{}", config.host, config.port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let openapi = ApiDoc::openapi();

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(blockchain.clone())
            .configure(api::configure_routes)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?
    .run()
    .await?;

    Ok(())
}

use actix_web::{error, web, HttpResponse};
use log::warn;

use super::handlers;

/// Configures the API routes
///
/// Paths are served from the root because peers fetch `/chain` directly.
/// Request bodies that fail to parse are answered with a JSON 400.
///
/// # Arguments
///
/// * `cfg` - The service configuration
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        warn!("Rejected request body: {}", err);
        let response = HttpResponse::BadRequest().json(serde_json::json!({ "error": err.to_string() }));
        error::InternalError::from_response(err, response).into()
    }))
    .route("/chain", web::get().to(handlers::get_chain))
    .route("/mine", web::get().to(handlers::mine_block))
    .route("/transactions/new", web::post().to(handlers::new_transaction))
    .route("/transactions/pending", web::get().to(handlers::get_pending_transactions))
    .route("/nodes", web::get().to(handlers::get_nodes))
    .route("/nodes/register", web::post().to(handlers::register_nodes))
    .route("/nodes/resolve", web::get().to(handlers::resolve_conflicts))
    .route("/validate", web::get().to(handlers::validate_chain));
}

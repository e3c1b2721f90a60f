// API module
//
// This module maps HTTP requests onto the ledger engine

pub mod handlers;
pub mod routes;

// Re-export main components for easier access
pub use routes::configure_routes;

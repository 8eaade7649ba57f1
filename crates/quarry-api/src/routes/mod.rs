//! HTTP route handlers.

pub mod records;

use std::sync::Arc;

use axum::Router;

use crate::server::AppState;

/// Public record routes.
pub fn api_routes() -> Router<Arc<AppState>> {
    records::routes()
}

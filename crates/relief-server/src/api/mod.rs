//! API routes for the relief dispatch server.

pub mod dispatch;
pub mod fleet;
pub mod forecast;
mod routes;
pub mod ws;

use axum::Router;

pub fn routes() -> Router<std::sync::Arc<crate::state::AppState>> {
    routes::create_router()
}

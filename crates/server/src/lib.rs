#![forbid(unsafe_code)]

mod auth;
mod community;
pub mod dispatch;
mod error;
mod likes;
mod state;

use std::future::Future;

use axum::Router;
use axum::routing::{delete, get, post};
use tokio::net::TcpListener;
use tracing::info;

use jornadas_protocol::routes;

pub use dispatch::{DispatchHub, log_events};
pub use error::ApiError;
pub use state::AppState;

async fn health() -> &'static str {
    "ok"
}

/// Todas as rotas do gateway.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(routes::HEALTH, get(health))
        .route(routes::LIKES, post(likes::toggle))
        .route(routes::LIKE_ENTRY, get(likes::like_data))
        .route(
            routes::COMMUNITY,
            get(community::listing).post(community::append),
        )
        .route(routes::COMMUNITY_ENTRY, delete(community::remove))
        .route(routes::DISPATCH, post(dispatch::dispatch))
        .with_state(state)
}

/// Serve até `shutdown` completar.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("gateway escutando em {addr}");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

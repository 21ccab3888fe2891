//! chat-relay: a small HTTP service that relays per-user chat sessions to
//! Google Gemini.
//!
//! Each user id gets one in-memory conversation. Messages posted to
//! `/chat` are forwarded to Gemini with the full history replayed, and the
//! reply is returned along with the exchange count.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod logging;
pub mod provider;
pub mod routes;
pub mod session;

pub use config::Config;
pub use logging::init_logging;
pub use routes::ChatState;

use anyhow::Result;
use axum::Router;
use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Build the application router for the given configuration.
pub fn build_router(config: &Config) -> Router {
    router_with_state(ChatState::from_config(config))
}

fn router_with_state(state: ChatState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::health_routes())
        .merge(routes::chat_routes())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn start_server(config: Config) -> Result<()> {
    let state = ChatState::from_config(&config);

    if let Some(max_idle) = config.chat.idle_timeout() {
        session::spawn_idle_sweeper(state.sessions.clone(), max_idle);
    }

    let addr = SocketAddr::from((config.bind_address().parse::<IpAddr>()?, config.port()));
    let router = router_with_state(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("chat-relay listening on {}", addr);

    axum::serve(listener, router).await?;
    Ok(())
}

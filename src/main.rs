//! chat-relay service binary.

use anyhow::Result;
use chat_relay::{init_logging, start_server, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load_with_env()?;

    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting chat-relay");

    start_server(config).await
}

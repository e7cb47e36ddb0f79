//! Chat relay server.
//!
//! Listens on the port named by `CHAT_PORT` (default 1234) and relays
//! envelopes between all connected clients until Ctrl-C.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin chat-server
//! CHAT_PORT=4321 cargo run --bin chat-server
//! ```

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::{info, warn};

use chat_relay::{config::ServerConfig, logging::init_tracing, server::Server};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = ServerConfig::from_env()?;
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    let server = Server::new(listener);
    let addr = server.local_addr()?;
    info!("chat relay listening on {}", addr);

    if let Err(err) = server.run_until_ctrl_c().await {
        warn!("server exited with error: {err:?}");
        return Err(err);
    }

    Ok(())
}

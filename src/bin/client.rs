//! Chat relay console client.
//!
//! Dials the server named by `CHAT_ADDR` (default `localhost:1234`), sends
//! each stdin line as a chat message, and prints everything the relay
//! delivers. Type `exit` to quit.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin chat-client
//! CHAT_ADDR=10.0.0.5:4321 cargo run --bin chat-client
//! ```

use chat_relay::{client, config::ClientConfig, logging::init_tracing};

#[tokio::main]
async fn main() {
    init_tracing();

    let config = ClientConfig::from_env();
    if let Err(err) = client::run(config).await {
        tracing::error!("client error: {err:?}");
        std::process::exit(1);
    }

    // A pending stdin read sits on the blocking pool and would stall
    // runtime shutdown; exit instead of waiting for it.
    std::process::exit(0);
}

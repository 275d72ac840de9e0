use crate::constants::{DEFAULT_HTTP_PORT, DEFAULT_P2P_PORT};
use clap::Parser;

/// Startup configuration for a ledger node.
#[derive(Parser, Debug, Clone)]
#[command(name = "ledger-node")]
#[command(about = "Proof-of-work ledger node with WebSocket gossip")]
pub struct NodeConfig {
    /// Interface both listeners bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the HTTP control API
    #[arg(long, env = "HTTP_PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub http_port: u16,

    /// Port for peer WebSocket connections
    #[arg(long, env = "P2P_PORT", default_value_t = DEFAULT_P2P_PORT)]
    pub p2p_port: u16,

    /// Comma-separated peers to dial at startup, e.g. ws://127.0.0.1:6002
    #[arg(long, env = "PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,
}

impl NodeConfig {
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }

    pub fn p2p_addr(&self) -> String {
        format!("{}:{}", self.host, self.p2p_port)
    }
}

use clap::Parser;
use ledger_node::{api, p2p, Node, NodeConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = NodeConfig::parse();
    let node = Node::spawn();

    let peers = p2p::bind(config.p2p_addr()).await?;
    tokio::spawn(p2p::serve(peers, node.clone()));
    for peer in &config.peers {
        node.add_peer(peer.clone());
    }

    let app = api::router(node.clone());
    let listener = tokio::net::TcpListener::bind(config.http_addr()).await?;
    info!("ledger-node listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    node.shutdown().await;
    Ok(())
}

use ledger_core::MiningError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("node is not running")]
    Stopped,

    #[error(transparent)]
    Mining(#[from] MiningError),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

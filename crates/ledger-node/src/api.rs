use crate::error::NodeError;
use crate::node::NodeHandle;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::Block;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Deserialize)]
struct MineIn {
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct PeerIn {
    peer: String,
}

struct ApiError(NodeError);

impl From<NodeError> for ApiError {
    fn from(e: NodeError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

/// HTTP control surface for local operators.
pub fn router(node: NodeHandle) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/blocks", get(blocks))
        .route("/peers", get(peers))
        .route("/mineBlock", post(mine_block))
        .route("/addPeer", post(add_peer))
        .layer(TraceLayer::new_for_http())
        .with_state(node)
}

async fn blocks(State(node): State<NodeHandle>) -> Result<Json<Vec<Block>>, ApiError> {
    Ok(Json(node.blocks().await?))
}

async fn peers(State(node): State<NodeHandle>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(node.peers().await?))
}

async fn mine_block(
    State(node): State<NodeHandle>,
    Json(body): Json<MineIn>,
) -> Result<Json<Block>, ApiError> {
    Ok(Json(node.mine(body.data).await?))
}

async fn add_peer(State(node): State<NodeHandle>, Json(body): Json<PeerIn>) -> StatusCode {
    node.add_peer(body.peer);
    StatusCode::OK
}

mod helpers;

use helpers::{eventually, start_node};
use ledger_core::{genesis_block, Block};
use ledger_node::api;
use serde_json::{json, Value};

async fn serve_api(node: ledger_node::NodeHandle) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, api::router(node)).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn mine_block_over_http() -> anyhow::Result<()> {
    let node = start_node().await;
    let base = serve_api(node.handle.clone()).await;
    let client = reqwest::Client::new();

    let blocks: Vec<Block> = client.get(format!("{base}/blocks")).send().await?.json().await?;
    assert_eq!(blocks, vec![genesis_block()]);

    let mined: Block = client
        .post(format!("{base}/mineBlock"))
        .json(&json!({ "data": "hello" }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(mined.index, 1);
    assert_eq!(mined.previous_hash, genesis_block().hash);
    assert_eq!(mined.data, json!("hello"));

    let blocks: Vec<Value> = client.get(format!("{base}/blocks")).send().await?.json().await?;
    assert_eq!(blocks.len(), 2);
    assert!(blocks[1]["difficulty"].is_null());
    assert_eq!(blocks[1]["previousHash"], json!(genesis_block().hash));
    Ok(())
}

#[tokio::test]
async fn add_peer_over_http() -> anyhow::Result<()> {
    let a = start_node().await;
    let b = start_node().await;
    a.handle.mine(json!("seed")).await?;
    let base = serve_api(b.handle.clone()).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base}/addPeer"))
        .json(&json!({ "peer": a.url() }))
        .send()
        .await?;
    assert!(res.status().is_success());

    let expected = a.handle.blocks().await?;
    assert!(
        eventually(|| {
            let client = client.clone();
            let url = format!("{base}/blocks");
            let expected = expected.clone();
            async move {
                match client.get(url).send().await {
                    Ok(res) => res.json::<Vec<Block>>().await.map(|c| c == expected).unwrap_or(false),
                    Err(_) => false,
                }
            }
        })
        .await
    );

    let peers: Vec<String> = client.get(format!("{base}/peers")).send().await?.json().await?;
    assert_eq!(peers, vec![a.url()]);
    Ok(())
}

#[tokio::test]
async fn health_and_stopped_node() -> anyhow::Result<()> {
    let node = start_node().await;
    let base = serve_api(node.handle.clone()).await;
    let client = reqwest::Client::new();

    let health: Value = client.get(format!("{base}/health")).send().await?.json().await?;
    assert_eq!(health, json!({ "status": "ok" }));

    node.handle.shutdown().await;
    let res = client.get(format!("{base}/blocks")).send().await?;
    assert_eq!(res.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], json!("node is not running"));
    Ok(())
}

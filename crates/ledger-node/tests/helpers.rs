#![allow(dead_code)]

use ledger_node::{p2p, Node, NodeHandle};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

pub struct TestNode {
    pub handle: NodeHandle,
    pub p2p_addr: SocketAddr,
}

impl TestNode {
    pub fn url(&self) -> String {
        format!("ws://{}", self.p2p_addr)
    }
}

pub async fn start_node() -> TestNode {
    let handle = Node::spawn();
    let listener = p2p::bind("127.0.0.1:0").await.expect("bind p2p listener");
    let p2p_addr = listener.local_addr().expect("local addr");
    tokio::spawn(p2p::serve(listener, handle.clone()));
    TestNode { handle, p2p_addr }
}

/// Poll `check` until it returns true or five seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

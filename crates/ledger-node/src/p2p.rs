//! WebSocket transport for peer gossip.
//!
//! Each connection is split into a reader loop that feeds decoded messages to
//! the node and a writer task draining the peer's bounded outbound queue.
//! Connections are either open or gone: a close frame, a read error or a
//! failed write removes the peer, and nothing is ever retried.

use crate::constants::PEER_QUEUE_CAPACITY;
use crate::error::NodeError;
use crate::message::Message;
use crate::node::{NodeHandle, PeerId};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as Frame};
use tokio_tungstenite::{accept_async, connect_async, WebSocketStream};
use tracing::{debug, info, warn};

pub async fn bind(addr: impl ToSocketAddrs) -> Result<TcpListener, NodeError> {
    Ok(TcpListener::bind(addr).await?)
}

/// Accept inbound peers until the listener fails.
pub async fn serve(listener: TcpListener, node: NodeHandle) {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "listening for peers");
    }
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "peer listener stopped");
                return;
            }
        };
        let node = node.clone();
        tokio::spawn(async move {
            match accept_async(stream).await {
                Ok(ws) => {
                    if let Err(e) = attach(node, ws, addr.to_string()).await {
                        debug!(%addr, error = %e, "inbound peer not registered");
                    }
                }
                Err(e) => warn!(%addr, error = %e, "websocket handshake failed"),
            }
        });
    }
}

/// Dial a peer such as `ws://127.0.0.1:6001` and register it with the node.
pub async fn connect(node: NodeHandle, url: &str) -> Result<PeerId, NodeError> {
    let (ws, _response) = connect_async(url).await?;
    attach(node, ws, url.to_string()).await
}

async fn attach<S>(node: NodeHandle, ws: WebSocketStream<S>, addr: String) -> Result<PeerId, NodeError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (sink, mut stream) = ws.split();
    let (outbound, queue) = mpsc::channel::<Message>(PEER_QUEUE_CAPACITY);
    let peer = node.register_peer(addr.clone(), outbound).await?;

    tokio::spawn(write_loop(node.clone(), peer, sink, queue));

    tokio::spawn(async move {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Frame::Text(text)) => match Message::decode(text.as_str()) {
                    Ok(message) => {
                        if node.deliver(peer, message).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(peer, %addr, error = %e, "ignoring malformed message"),
                },
                Ok(Frame::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(peer, %addr, error = %e, "read failed");
                    break;
                }
            }
        }
        node.peer_disconnected(peer).await;
    });

    Ok(peer)
}

/// Drain `queue` into `sink`. A failed write drops the peer; a closed queue
/// means the node already has.
async fn write_loop<W>(
    node: NodeHandle,
    peer: PeerId,
    mut sink: W,
    mut queue: mpsc::Receiver<Message>,
)
where
    W: Sink<Frame, Error = WsError> + Unpin,
{
    while let Some(message) = queue.recv().await {
        let text = match message.encode() {
            Ok(text) => text,
            Err(e) => {
                warn!(peer, error = %e, "failed to encode message");
                continue;
            }
        };
        if let Err(e) = sink.send(Frame::text(text)).await {
            debug!(peer, error = %e, "write failed");
            node.peer_disconnected(peer).await;
            return;
        }
    }
    let _ = sink.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    struct BrokenSink;

    impl Sink<Frame> for BrokenSink {
        type Error = WsError;

        fn poll_ready(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), WsError>> {
            Poll::Ready(Err(WsError::ConnectionClosed))
        }

        fn start_send(self: Pin<&mut Self>, _: Frame) -> Result<(), WsError> {
            Err(WsError::ConnectionClosed)
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), WsError>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), WsError>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn failed_write_removes_peer() {
        let node = Node::spawn();
        let (outbound, queue) = mpsc::channel(PEER_QUEUE_CAPACITY);
        let peer = node.register_peer("10.0.0.9:6001".to_string(), outbound).await.unwrap();
        assert_eq!(node.peers().await.unwrap().len(), 1);

        // The queued opening QueryLatest is the write that fails.
        write_loop(node.clone(), peer, BrokenSink, queue).await;

        assert!(node.peers().await.unwrap().is_empty());
    }
}

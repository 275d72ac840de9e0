pub mod api;
pub mod config;
mod constants;
pub mod error;
pub mod message;
pub mod node;
pub mod p2p;

pub use config::NodeConfig;
pub use constants::PEER_QUEUE_CAPACITY;
pub use error::NodeError;
pub use message::{Message, MessageError};
pub use node::{Node, NodeHandle, PeerId};

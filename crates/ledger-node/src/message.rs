//! Peer wire protocol.
//!
//! Every frame is a JSON object with a numeric `type`. Chain responses carry
//! their blocks in `data` as a JSON string holding the block array; an inline
//! array is accepted on receipt as well.

use ledger_core::Block;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Discriminant carried in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    QueryLatest = 0,
    QueryAll = 1,
    ResponseChain = 2,
}

impl TryFrom<u64> for MessageType {
    type Error = MessageError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::QueryLatest),
            1 => Ok(Self::QueryAll),
            2 => Ok(Self::ResponseChain),
            other => Err(MessageError::UnknownType(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Ask for the peer's head.
    QueryLatest,
    /// Ask for the peer's whole chain.
    QueryAll,
    /// One block (a head) or many (a full chain).
    ResponseChain(Vec<Block>),
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown message type {0}")]
    UnknownType(u64),

    #[error("chain response has no data")]
    MissingData,

    #[error("chain response data must be a block array or a string holding one")]
    InvalidPayload,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::QueryLatest => MessageType::QueryLatest,
            Self::QueryAll => MessageType::QueryAll,
            Self::ResponseChain(_) => MessageType::ResponseChain,
        }
    }

    pub fn encode(&self) -> Result<String, MessageError> {
        let data = match self {
            Self::QueryLatest | Self::QueryAll => None,
            Self::ResponseChain(blocks) => Some(Value::String(serde_json::to_string(blocks)?)),
        };
        let envelope = Envelope {
            kind: self.message_type() as u64,
            data,
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    pub fn decode(text: &str) -> Result<Self, MessageError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        match MessageType::try_from(envelope.kind)? {
            MessageType::QueryLatest => Ok(Self::QueryLatest),
            MessageType::QueryAll => Ok(Self::QueryAll),
            MessageType::ResponseChain => {
                let blocks = match envelope.data.ok_or(MessageError::MissingData)? {
                    Value::String(inner) => serde_json::from_str(&inner)?,
                    array @ Value::Array(_) => serde_json::from_value(array)?,
                    _ => return Err(MessageError::InvalidPayload),
                };
                Ok(Self::ResponseChain(blocks))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::genesis_block;
    use serde_json::json;

    #[test]
    fn queries_encode_as_bare_type() {
        assert_eq!(Message::QueryLatest.encode().unwrap(), r#"{"type":0}"#);
        assert_eq!(Message::QueryAll.encode().unwrap(), r#"{"type":1}"#);
    }

    #[test]
    fn chain_response_nests_blocks_as_string() {
        let text = Message::ResponseChain(vec![genesis_block()]).encode().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], json!(2));
        let inner = value["data"].as_str().expect("data is a string");
        let blocks: Vec<Block> = serde_json::from_str(inner).unwrap();
        assert_eq!(blocks, vec![genesis_block()]);
    }

    #[test]
    fn decodes_reference_frames() {
        assert_eq!(Message::decode(r#"{"type":0}"#).unwrap(), Message::QueryLatest);
        assert_eq!(Message::decode(r#"{"type":1}"#).unwrap(), Message::QueryAll);

        let frame = r#"{"type":2,"data":"[{\"index\":0,\"previousHash\":\"0\",\"timestamp\":1682839690,\"data\":\"RUT-MIIT first block\",\"hash\":\"8d9d5a7ff4a78042ea6737bf59c772f8ed27ef3c9b576eac1976c91aaf48d2de\",\"difficulty\":0,\"nonce\":0}]"}"#;
        assert_eq!(
            Message::decode(frame).unwrap(),
            Message::ResponseChain(vec![genesis_block()])
        );
    }

    #[test]
    fn accepts_inline_block_array() {
        let frame = json!({ "type": 2, "data": [genesis_block()] }).to_string();
        assert_eq!(
            Message::decode(&frame).unwrap(),
            Message::ResponseChain(vec![genesis_block()])
        );
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(matches!(Message::decode("not json"), Err(MessageError::Json(_))));
        assert!(matches!(
            Message::decode(r#"{"type":7}"#),
            Err(MessageError::UnknownType(7))
        ));
        assert!(matches!(
            Message::decode(r#"{"type":2}"#),
            Err(MessageError::MissingData)
        ));
        assert!(matches!(
            Message::decode(r#"{"type":2,"data":5}"#),
            Err(MessageError::InvalidPayload)
        ));
        assert!(matches!(
            Message::decode(r#"{"type":2,"data":"[{\"index\":1}]"}"#),
            Err(MessageError::Json(_))
        ));
        assert!(Message::decode(r#"{"kind":0}"#).is_err());
    }
}

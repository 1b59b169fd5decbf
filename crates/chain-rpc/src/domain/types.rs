//! Request and response types for the chain_* namespace.

use super::header::{HexNumber, ProcessedHeader};
use serde::{Deserialize, Serialize};
use shared_types::{BlockNumber, Bytes, HeadTopic};

/// Subscription handle returned to callers.
pub type SubscriptionId = String;

/// Block number as sent by callers: a JSON integer or a `"0x"` hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockNumberParam {
    Number(BlockNumber),
    Hex(HexNumber),
}

impl From<BlockNumberParam> for BlockNumber {
    fn from(param: BlockNumberParam) -> Self {
        match param {
            BlockNumberParam::Number(n) => n,
            BlockNumberParam::Hex(h) => h.value(),
        }
    }
}

/// Block body returned by `chain_getBlock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBody {
    pub header: ProcessedHeader,
    pub extrinsics: Vec<Bytes>,
}

/// `chain_getBlock` result.
///
/// `justifications` is always `null`; finality proofs are not served here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBlock {
    pub block: BlockBody,
    pub justifications: Option<Vec<Bytes>>,
}

impl SignedBlock {
    pub fn new(header: ProcessedHeader, extrinsics: Vec<Bytes>) -> Self {
        Self {
            block: BlockBody { header, extrinsics },
            justifications: None,
        }
    }
}

/// Notification method the transport tags pushes with.
pub fn notification_method(topic: HeadTopic) -> &'static str {
    match topic {
        HeadTopic::NewHead => "chain_newHead",
        HeadTopic::FinalizedHead => "chain_finalizedHead",
    }
}

/// Server → client subscription push
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: SubscriptionParams,
}

/// Subscription params
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionParams {
    pub subscription: SubscriptionId,
    pub result: serde_json::Value,
}

impl SubscriptionNotification {
    pub fn new(topic: HeadTopic, subscription_id: SubscriptionId, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: notification_method(topic).to_string(),
            params: SubscriptionParams {
                subscription: subscription_id,
                result,
            },
        }
    }
}

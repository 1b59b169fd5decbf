//! RPC error types with JSON-RPC 2.0 error codes.

use serde::{Deserialize, Serialize};
use shared_types::{BlockNumber, Hash};
use std::fmt;

/// Error codes surfaced to callers.
pub mod codes {
    /// Requested block does not exist.
    pub const BLOCK_NOT_FOUND: i32 = 1;

    // JSON-RPC 2.0 standard errors (-32700 to -32600)
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    // Server errors (-32000 to -32099)
    pub const METHOD_NOT_SUPPORTED: i32 = -32004;
}

/// JSON-RPC error object returned to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseError {
    pub code: i32,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl ResponseError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    // Chain errors

    /// No block at this height.
    pub fn block_number_not_found(number: BlockNumber) -> Self {
        Self::new(codes::BLOCK_NOT_FOUND, format!("Block #{} not found", number))
    }

    /// No block with this hash.
    pub fn block_not_found(hash: &Hash) -> Self {
        Self::new(codes::BLOCK_NOT_FOUND, format!("Block {:?} not found", hash))
    }

    // Dispatcher errors

    pub fn parse_error(details: impl Into<String>) -> Self {
        Self::new(
            codes::PARSE_ERROR,
            format!("Parse error: {}", details.into()),
        )
    }

    pub fn invalid_request(details: impl Into<String>) -> Self {
        Self::new(
            codes::INVALID_REQUEST,
            format!("Invalid request: {}", details.into()),
        )
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )
    }

    pub fn invalid_params(details: impl Into<String>) -> Self {
        Self::new(
            codes::INVALID_PARAMS,
            format!("Invalid params: {}", details.into()),
        )
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(
            codes::INTERNAL_ERROR,
            format!("Internal error: {}", details.into()),
        )
    }

    /// Subscription requested on a transport that cannot push.
    pub fn subscriptions_unsupported(method: &str) -> Self {
        Self::new(
            codes::METHOD_NOT_SUPPORTED,
            format!("Method not supported over this transport: {}", method),
        )
    }
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ResponseError {}

impl Serialize for ResponseError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let len = if self.data.is_some() { 3 } else { 2 };
        let mut state = serializer.serialize_struct("ResponseError", len)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("message", &self.message)?;
        if let Some(ref data) = self.data {
            state.serialize_field("data", data)?;
        }
        state.end()
    }
}

impl<'de> Deserialize<'de> for ResponseError {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ErrorHelper {
            code: i32,
            message: String,
            data: Option<serde_json::Value>,
        }

        let helper = ErrorHelper::deserialize(deserializer)?;
        Ok(ResponseError {
            code: helper.code,
            message: helper.message,
            data: helper.data,
        })
    }
}

impl From<serde_json::Error> for ResponseError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_syntax() || e.is_eof() {
            ResponseError::parse_error(e.to_string())
        } else {
            ResponseError::invalid_params(e.to_string())
        }
    }
}

/// Result type for RPC operations
pub type RpcResult<T> = Result<T, ResponseError>;

/// Service-level errors (not JSON-RPC, internal use)
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(std::io::Error),

    /// Server terminated abnormally
    #[error("server error: {0}")]
    Serve(std::io::Error),
}

//! Uniform handler contract.
//!
//! Every method is an async `call(ctx, params, session)`. Whether the
//! backing lookup is synchronous or not is invisible to the dispatcher.

use super::RpcContext;
use crate::domain::{ConnectionId, ResponseError, RpcResult};
use crate::ports::SubscriptionSink;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// One RPC operation.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, ctx: &RpcContext, params: Params<'_>, session: &Session)
        -> RpcResult<Value>;
}

/// The caller a request arrived from.
///
/// HTTP sessions carry no sink and cannot subscribe.
#[derive(Clone)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub sink: Option<Arc<dyn SubscriptionSink>>,
}

impl Session {
    /// One-shot session for an HTTP request.
    pub fn http() -> Self {
        Self {
            connection_id: ConnectionId::new(),
            sink: None,
        }
    }

    /// Long-lived session able to receive pushes.
    pub fn websocket(connection_id: ConnectionId, sink: Arc<dyn SubscriptionSink>) -> Self {
        Self {
            connection_id,
            sink: Some(sink),
        }
    }

    pub fn can_push(&self) -> bool {
        self.sink.is_some()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("connection_id", &self.connection_id)
            .field("can_push", &self.can_push())
            .finish()
    }
}

/// Positional request params.
///
/// A bare non-array value is treated as the single first param.
#[derive(Debug, Clone, Copy)]
pub struct Params<'a>(Option<&'a Value>);

impl<'a> Params<'a> {
    pub fn new(raw: Option<&'a Value>) -> Self {
        Self(raw)
    }

    fn get(&self, index: usize) -> Option<&'a Value> {
        match self.0? {
            Value::Array(items) => items.get(index),
            Value::Null => None,
            other if index == 0 => Some(other),
            _ => None,
        }
    }

    /// Parse a required parameter.
    pub fn required<T: DeserializeOwned>(&self, index: usize) -> RpcResult<T> {
        match self.optional(index)? {
            Some(value) => Ok(value),
            None => Err(ResponseError::invalid_params(format!(
                "missing parameter at index {}",
                index
            ))),
        }
    }

    /// Parse an optional parameter. Absent and `null` both yield `None`.
    pub fn optional<T: DeserializeOwned>(&self, index: usize) -> RpcResult<Option<T>> {
        match self.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| {
                    ResponseError::invalid_params(format!(
                        "invalid parameter at index {}: {}",
                        index, e
                    ))
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::codes;
    use serde_json::json;

    #[test]
    fn test_params_positional() {
        let raw = json!([5, null, "x"]);
        let params = Params::new(Some(&raw));

        assert_eq!(params.required::<u64>(0), Ok(5));
        assert_eq!(params.optional::<u64>(1), Ok(None));
        assert_eq!(params.optional::<String>(2), Ok(Some("x".into())));
        assert_eq!(params.optional::<u64>(3), Ok(None));
    }

    #[test]
    fn test_params_missing_and_malformed() {
        let params = Params::new(None);
        assert_eq!(params.optional::<u64>(0), Ok(None));
        assert_eq!(
            params.required::<u64>(0).unwrap_err().code,
            codes::INVALID_PARAMS
        );

        let raw = json!(["not a number"]);
        let err = Params::new(Some(&raw)).optional::<u64>(0).unwrap_err();
        assert_eq!(err.code, codes::INVALID_PARAMS);
    }

    #[test]
    fn test_bare_value_is_first_param() {
        let raw = json!(7);
        let params = Params::new(Some(&raw));
        assert_eq!(params.required::<u64>(0), Ok(7));
        assert_eq!(params.optional::<u64>(1), Ok(None));
    }

    #[test]
    fn test_http_session_cannot_push() {
        assert!(!Session::http().can_push());
        assert_ne!(Session::http().connection_id, Session::http().connection_id);
    }
}

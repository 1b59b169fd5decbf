//! JSON-RPC dispatch.
//!
//! [`RpcModule`] maps method names to [`Handler`]s and turns raw request
//! text into response text. Transports only move bytes.

pub mod chain;
pub mod handler;

pub use handler::{Handler, Params, Session};

use crate::domain::methods::METHOD_REGISTRY;
use crate::domain::{get_method_info, LimitsConfig, ResponseError, RpcResult};
use crate::ports::ChainState;
use crate::resolver::BlockResolver;
use crate::ws::{HeadNotifier, SubscriptionRegistry};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Maximum accepted length of a string request id.
const MAX_ID_LENGTH: usize = 256;

/// State shared by every handler.
#[derive(Clone)]
pub struct RpcContext {
    pub resolver: BlockResolver,
    pub notifier: Arc<HeadNotifier>,
}

impl RpcContext {
    pub fn new(chain: Arc<dyn ChainState>) -> Self {
        let resolver = BlockResolver::new(chain);
        let notifier = Arc::new(HeadNotifier::new(
            resolver.clone(),
            Arc::new(SubscriptionRegistry::new()),
        ));
        Self { resolver, notifier }
    }
}

/// Method table plus dispatch.
pub struct RpcModule {
    ctx: RpcContext,
    methods: HashMap<&'static str, Arc<dyn Handler>>,
    limits: LimitsConfig,
}

impl RpcModule {
    /// Module serving every chain_* method.
    pub fn new(chain: Arc<dyn ChainState>, limits: LimitsConfig) -> Self {
        let methods = METHOD_REGISTRY
            .values()
            .map(|info| (info.name, Arc::new(info.method) as Arc<dyn Handler>))
            .collect();

        Self {
            ctx: RpcContext::new(chain),
            methods,
            limits,
        }
    }

    /// Register an additional method, replacing any previous one.
    pub fn register(&mut self, name: &'static str, handler: Arc<dyn Handler>) {
        self.methods.insert(name, handler);
    }

    pub fn context(&self) -> &RpcContext {
        &self.ctx
    }

    pub fn method_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.methods.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Invoke one method.
    pub async fn call(
        &self,
        method: &str,
        params: Option<&Value>,
        session: &Session,
    ) -> RpcResult<Value> {
        let handler = self
            .methods
            .get(method)
            .ok_or_else(|| ResponseError::method_not_found(method))?;

        if let Some(info) = get_method_info(method) {
            if info.needs_push() && !session.can_push() {
                return Err(ResponseError::subscriptions_unsupported(method));
            }
            debug!(method, kind = ?info.kind, "Dispatching");
        }
        handler.call(&self.ctx, Params::new(params), session).await
    }

    /// Handle one request object and build its response object.
    pub async fn handle_request(&self, request: &Value, session: &Session) -> Value {
        let id = match request_id(request) {
            Ok(id) => id,
            Err(e) => return error_response(Value::Null, e),
        };

        let Some(method) = request.get("method").and_then(Value::as_str) else {
            return error_response(id, ResponseError::invalid_request("missing method"));
        };

        match self.call(method, request.get("params"), session).await {
            Ok(result) => json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": result,
            }),
            Err(e) => {
                debug!(method, code = e.code, error = %e.message, "RPC call failed");
                error_response(id, e)
            }
        }
    }

    /// Handle raw request text: a single request or a batch.
    pub async fn handle_text(&self, text: &str, session: &Session) -> String {
        let request: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                return error_response(Value::Null, ResponseError::parse_error(e.to_string()))
                    .to_string();
            }
        };

        let response = match &request {
            Value::Array(batch) => self.handle_batch(batch, session).await,
            single => self.handle_request(single, session).await,
        };
        response.to_string()
    }

    async fn handle_batch(&self, batch: &[Value], session: &Session) -> Value {
        if batch.is_empty() {
            return error_response(Value::Null, ResponseError::invalid_request("empty batch"));
        }
        if batch.len() > self.limits.max_batch_size {
            warn!(
                size = batch.len(),
                max = self.limits.max_batch_size,
                "Batch exceeds size limit"
            );
            return error_response(
                Value::Null,
                ResponseError::invalid_request(format!(
                    "batch of {} exceeds limit of {}",
                    batch.len(),
                    self.limits.max_batch_size
                )),
            );
        }

        let mut responses = Vec::with_capacity(batch.len());
        for request in batch {
            responses.push(self.handle_request(request, session).await);
        }
        Value::Array(responses)
    }
}

/// Validate the request id. Notifications (absent or null id) are rejected.
fn request_id(request: &Value) -> RpcResult<Value> {
    if !request.is_object() {
        return Err(ResponseError::invalid_request("request must be an object"));
    }

    match request.get("id") {
        None | Some(Value::Null) => Err(ResponseError::invalid_request(
            "null id (notifications not supported)",
        )),
        Some(Value::String(s)) if s.is_empty() => {
            Err(ResponseError::invalid_request("empty string id"))
        }
        Some(Value::String(s)) if s.len() > MAX_ID_LENGTH => Err(ResponseError::invalid_request(
            format!("id string too long (max {} chars)", MAX_ID_LENGTH),
        )),
        Some(id @ (Value::String(_) | Value::Number(_))) => Ok(id.clone()),
        Some(_) => Err(ResponseError::invalid_request(
            "id must be string or number",
        )),
    }
}

/// Create JSON-RPC error response
pub fn error_response(id: Value, error: ResponseError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryChainState;
    use crate::domain::codes;

    fn module(max_batch_size: usize) -> RpcModule {
        let chain = Arc::new(InMemoryChainState::with_genesis());
        chain.import_block(vec![]);
        RpcModule::new(
            chain,
            LimitsConfig {
                max_batch_size,
                ..Default::default()
            },
        )
    }

    async fn roundtrip(module: &RpcModule, text: &str) -> Value {
        let out = module.handle_text(text, &Session::http()).await;
        serde_json::from_str(&out).unwrap()
    }

    #[tokio::test]
    async fn test_single_request() {
        let module = module(10);
        let resp = roundtrip(
            &module,
            r#"{"jsonrpc":"2.0","id":1,"method":"chain_getHeader","params":[]}"#,
        )
        .await;

        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["number"], "0x1");
        assert!(resp.get("error").is_none());
    }

    #[tokio::test]
    async fn test_dispatcher_errors() {
        let module = module(10);

        let resp = roundtrip(&module, "{nope").await;
        assert_eq!(resp["error"]["code"], codes::PARSE_ERROR);
        assert!(resp["id"].is_null());

        let resp = roundtrip(&module, r#"{"id":1,"method":"chain_nope"}"#).await;
        assert_eq!(resp["error"]["code"], codes::METHOD_NOT_FOUND);

        let resp = roundtrip(&module, r#"{"method":"chain_getHead"}"#).await;
        assert_eq!(resp["error"]["code"], codes::INVALID_REQUEST);

        let resp = roundtrip(&module, r#"{"id":{},"method":"chain_getHead"}"#).await;
        assert_eq!(resp["error"]["code"], codes::INVALID_REQUEST);

        let resp = roundtrip(&module, r#"{"id":2}"#).await;
        assert_eq!(resp["error"]["code"], codes::INVALID_REQUEST);
        assert_eq!(resp["id"], 2);

        let resp = roundtrip(
            &module,
            r#"{"id":3,"method":"chain_getBlockHash","params":[{}]}"#,
        )
        .await;
        assert_eq!(resp["error"]["code"], codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_batch() {
        let module = module(3);

        let resp = roundtrip(
            &module,
            r#"[{"id":1,"method":"chain_getHead"},{"id":2,"method":"chain_getBlockHash","params":[5]}]"#,
        )
        .await;
        let items = resp.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["id"], 1);
        assert!(items[0]["result"].is_string());
        assert_eq!(items[1]["error"]["code"], codes::BLOCK_NOT_FOUND);

        let resp = roundtrip(&module, "[]").await;
        assert_eq!(resp["error"]["code"], codes::INVALID_REQUEST);

        let resp = roundtrip(
            &module,
            r#"[{"id":1,"method":"chain_getHead"},{"id":2,"method":"chain_getHead"},
                {"id":3,"method":"chain_getHead"},{"id":4,"method":"chain_getHead"}]"#,
        )
        .await;
        assert_eq!(resp["error"]["code"], codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_every_registered_method_dispatches() {
        let module = module(10);
        assert_eq!(module.method_names().len(), 11);
        for name in module.method_names() {
            let err = module.call(name, None, &Session::http()).await.err();
            assert_ne!(err.map(|e| e.code), Some(codes::METHOD_NOT_FOUND), "{}", name);
        }
    }

    #[tokio::test]
    async fn test_subscribe_rejected_without_push_channel() {
        let module = module(10);
        for name in ["chain_subscribeNewHeads", "chain_subscribeFinalizedHeads"] {
            let err = module.call(name, None, &Session::http()).await.unwrap_err();
            assert_eq!(err.code, codes::METHOD_NOT_SUPPORTED);
            assert!(err.message.ends_with(name), "{}", err.message);
        }
        assert!(module.context().notifier.registry().is_empty());

        // Queries and unsubscribe still work over the same session
        let closed = module
            .call("chain_unsubscribeNewHead", Some(&json!(["0x1"])), &Session::http())
            .await;
        assert_eq!(closed, Ok(Value::Bool(false)));
    }

    #[tokio::test]
    async fn test_custom_handler_registration() {
        struct Echo;

        #[async_trait::async_trait]
        impl Handler for Echo {
            async fn call(
                &self,
                _ctx: &RpcContext,
                params: Params<'_>,
                _session: &Session,
            ) -> RpcResult<Value> {
                params.required::<Value>(0)
            }
        }

        let mut module = module(10);
        module.register("test_echo", Arc::new(Echo));
        let result = module
            .call("test_echo", Some(&json!(["hi"])), &Session::http())
            .await;
        assert_eq!(result, Ok(json!("hi")));
    }
}

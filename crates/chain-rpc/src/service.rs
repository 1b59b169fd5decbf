//! RPC service - HTTP and WebSocket entry point.
//!
//! Both transports share one [`RpcModule`]. HTTP requests get a throwaway
//! session and cannot subscribe; each WebSocket connection gets a session
//! with a push sink.

use crate::domain::config::CorsConfig;
use crate::domain::{RpcConfig, ServiceError};
use crate::ports::ChainState;
use crate::rpc::{RpcModule, Session};
use crate::ws::WebSocketHandler;
use axum::{
    extract::{ws::WebSocketUpgrade, DefaultBodyLimit, State},
    http::{header, HeaderValue, Method},
    response::IntoResponse,
    routing::{get, MethodRouter},
    Json, Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Chain RPC service
pub struct RpcService {
    config: RpcConfig,
    module: Arc<RpcModule>,
}

impl RpcService {
    /// Create a service over `chain`. Fails if `config` is invalid.
    pub fn new(config: RpcConfig, chain: Arc<dyn ChainState>) -> Result<Self, ServiceError> {
        config.validate()?;
        let module = Arc::new(RpcModule::new(chain, config.limits.clone()));
        Ok(Self { config, module })
    }

    pub fn module(&self) -> &Arc<RpcModule> {
        &self.module
    }

    /// Build the router: `/` for JSON-RPC, `/health` for probes.
    pub fn router(&self) -> Router {
        let state = AppState {
            module: Arc::clone(&self.module),
            config: Arc::new(self.config.clone()),
        };

        let mut root = MethodRouter::new();
        if self.config.server.http_enabled {
            root = root.post(handle_json_rpc);
        }
        if self.config.server.ws_enabled {
            root = root.get(handle_ws_upgrade);
        }

        let middleware = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(create_cors_layer(&self.config.cors))
            .layer(DefaultBodyLimit::max(self.config.limits.max_request_size));

        Router::new()
            .route("/", root)
            .route("/health", get(health_check))
            .layer(middleware)
            .with_state(state)
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServiceError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.addr())
            .await
            .map_err(ServiceError::Bind)?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServiceError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: Option<SocketAddr> = listener.local_addr().ok();
        info!(
            addr = ?addr,
            http = self.config.server.http_enabled,
            ws = self.config.server.ws_enabled,
            "Chain RPC listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(ServiceError::Serve)?;

        info!("Chain RPC stopped");
        Ok(())
    }
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    module: Arc<RpcModule>,
    config: Arc<RpcConfig>,
}

/// Handle JSON-RPC over HTTP POST
async fn handle_json_rpc(State(state): State<AppState>, body: String) -> impl IntoResponse {
    let response = state.module.handle_text(&body, &Session::http()).await;
    ([(header::CONTENT_TYPE, "application/json")], response)
}

/// Upgrade to a WebSocket session
async fn handle_ws_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let config = state.config.websocket.clone();
    ws.max_message_size(config.max_message_size)
        .on_upgrade(move |socket| async move {
            let handler = WebSocketHandler::new(state.module, config);
            handler.handle(socket).await;
        })
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let resolver = &state.module.context().resolver;
    let best = resolver.chain().best_head();
    let finalized = resolver.chain().finalized_head();

    Json(serde_json::json!({
        "status": "healthy",
        "service": "chain-rpc",
        "version": env!("CARGO_PKG_VERSION"),
        "best": best.number,
        "finalized": finalized.number,
        "subscriptions": state.module.context().notifier.registry().len(),
    }))
}

/// Create CORS layer from config
fn create_cors_layer(config: &CorsConfig) -> CorsLayer {
    if !config.enabled {
        return CorsLayer::very_permissive();
    }

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(config.max_age);

    if config.allowed_origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

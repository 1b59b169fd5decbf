#![allow(missing_docs)]

//! Chain RPC - block queries and head subscriptions over JSON-RPC.
//!
//! Sits in front of a node's canonical chain state and serves the `chain_*`
//! namespace: point lookups of hashes, headers and blocks, plus push
//! subscriptions for the best and the finalized head.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          CHAIN RPC                               │
//! ├──────────────────────────────────────────────────────────────────┤
//! │   ┌──────────────┐      ┌──────────────┐                         │
//! │   │  HTTP POST / │      │  WS GET /    │   transports            │
//! │   └──────┬───────┘      └──────┬───────┘                         │
//! │          └─────────┬───────────┘                                 │
//! │             ┌──────┴──────┐                                      │
//! │             │  RpcModule  │   method table + Handler contract    │
//! │             └──────┬──────┘                                      │
//! │        ┌───────────┴────────────┐                                │
//! │ ┌──────┴────────┐      ┌────────┴───────┐   ┌──────────────────┐ │
//! │ │ BlockResolver │      │  HeadNotifier  │──▶│ Subscription     │ │
//! │ └──────┬────────┘      └────────┬───────┘   │ Registry         │ │
//! │        │                        │ listener  └──────────────────┘ │
//! └────────┼────────────────────────┼────────────────────────────────┘
//!          ▼                        ▼
//!     ChainState (port)      HeadEventBus (shared-bus)
//! ```
//!
//! # Subscriptions
//!
//! A subscribe call returns only after the current header of its topic has
//! been pushed. Later pushes follow head changes in order. After an
//! unsubscribe, or once the connection closes, nothing more is pushed for
//! that id.
//!
//! # Usage
//!
//! ```ignore
//! use chain_rpc::{InMemoryChainState, RpcConfig, RpcService};
//!
//! let chain = Arc::new(InMemoryChainState::with_genesis());
//! let service = RpcService::new(RpcConfig::default(), chain)?;
//! service.run(shutdown_signal()).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod resolver;
pub mod rpc;
pub mod service;
pub mod ws;

// Re-exports
pub use adapters::{ChainStoreError, InMemoryChainState};
pub use domain::{
    codes, process_header, ConfigError, ConnectionId, HexNumber, ProcessedHeader, ResponseError,
    RpcConfig, RpcResult, ServiceError, SignedBlock, SubscriptionId, SubscriptionNotification,
};
pub use ports::{ChainState, SinkClosed, SubscriptionSink};
pub use resolver::{BlockResolver, HeadSnapshot};
pub use rpc::{Handler, Params, RpcContext, RpcModule, Session};
pub use service::RpcService;
pub use ws::{DeliveryOutcome, HeadNotifier, SubscriptionRegistry};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

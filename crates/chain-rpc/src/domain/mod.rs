//! Domain types for the chain RPC facade.
//!
//! Configuration, errors, the method table and the wire shapes of headers
//! and blocks. No I/O happens here.

pub mod config;
pub mod connection;
pub mod error;
pub mod header;
pub mod methods;
pub mod types;

// Re-exports for convenience
pub use config::{ConfigError, LimitsConfig, RpcConfig};
pub use connection::ConnectionId;
pub use error::{codes, ResponseError, RpcResult, ServiceError};
pub use header::{process_header, HexNumber, ProcessedHeader};
pub use methods::{get_method_info, ChainMethod, MethodInfo, MethodKind};
pub use types::*;

//! Adapters layer.
//!
//! Concrete implementations of the outbound ports.

pub mod memory;

pub use memory::{ChainStoreError, InMemoryChainState};

//! # Shared Types Crate
//!
//! Chain entities consumed by every crate in the workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: hashes, headers and block references are
//!   defined once here.
//! - **Raw Storage Shape**: `Header::number` is a plain integer. Any
//!   transport-facing re-encoding happens at the RPC boundary, never here.

pub mod entities;

pub use entities::*;

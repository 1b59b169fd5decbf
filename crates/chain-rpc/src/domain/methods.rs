//! Method table for the chain_* namespace.
//!
//! Several names are aliases: both `chain_subscribeNewHead` and
//! `chain_subscribeNewHeads` open a best-head subscription, and every
//! unsubscribe name maps to the same topic-agnostic operation.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Operation a method name resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainMethod {
    GetBlockHash,
    GetHeader,
    GetBlock,
    GetFinalizedHead,
    GetHead,
    SubscribeNewHead,
    SubscribeFinalizedHeads,
    Unsubscribe,
}

impl ChainMethod {
    /// Canonical method name.
    pub const fn name(self) -> &'static str {
        match self {
            ChainMethod::GetBlockHash => "chain_getBlockHash",
            ChainMethod::GetHeader => "chain_getHeader",
            ChainMethod::GetBlock => "chain_getBlock",
            ChainMethod::GetFinalizedHead => "chain_getFinalizedHead",
            ChainMethod::GetHead => "chain_getHead",
            ChainMethod::SubscribeNewHead => "chain_subscribeNewHead",
            ChainMethod::SubscribeFinalizedHeads => "chain_subscribeFinalizedHeads",
            ChainMethod::Unsubscribe => "chain_unsubscribeNewHead",
        }
    }
}

/// How a method interacts with the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    /// Point query, any transport
    Query,
    /// Opens a subscription, needs a push channel
    Subscribe,
    /// Closes a subscription
    Unsubscribe,
}

/// Method metadata
#[derive(Debug, Clone)]
pub struct MethodInfo {
    /// Full method name (e.g., "chain_getHeader")
    pub name: &'static str,
    pub method: ChainMethod,
    pub kind: MethodKind,
}

impl MethodInfo {
    const fn new(name: &'static str, method: ChainMethod, kind: MethodKind) -> Self {
        Self { name, method, kind }
    }

    /// Requires a transport that can push notifications.
    pub const fn needs_push(&self) -> bool {
        matches!(self.kind, MethodKind::Subscribe)
    }
}

/// All supported method names.
pub static METHOD_REGISTRY: LazyLock<HashMap<&'static str, MethodInfo>> = LazyLock::new(|| {
    use ChainMethod::*;
    let methods = [
        // --- Queries ---
        MethodInfo::new("chain_getBlockHash", GetBlockHash, MethodKind::Query),
        MethodInfo::new("chain_getHeader", GetHeader, MethodKind::Query),
        MethodInfo::new("chain_getBlock", GetBlock, MethodKind::Query),
        MethodInfo::new("chain_getFinalizedHead", GetFinalizedHead, MethodKind::Query),
        MethodInfo::new("chain_getHead", GetHead, MethodKind::Query),
        // --- Subscriptions ---
        MethodInfo::new("chain_subscribeNewHead", SubscribeNewHead, MethodKind::Subscribe),
        MethodInfo::new("chain_subscribeNewHeads", SubscribeNewHead, MethodKind::Subscribe),
        MethodInfo::new("chain_subscribeFinalizedHeads", SubscribeFinalizedHeads, MethodKind::Subscribe),
        MethodInfo::new("chain_unsubscribeNewHead", Unsubscribe, MethodKind::Unsubscribe),
        MethodInfo::new("chain_unsubscribeNewHeads", Unsubscribe, MethodKind::Unsubscribe),
        MethodInfo::new("chain_unsubscribeFinalizedHeads", Unsubscribe, MethodKind::Unsubscribe),
    ];

    methods.into_iter().map(|m| (m.name, m)).collect()
});

/// Look up method metadata.
pub fn get_method_info(method: &str) -> Option<&'static MethodInfo> {
    METHOD_REGISTRY.get(method)
}

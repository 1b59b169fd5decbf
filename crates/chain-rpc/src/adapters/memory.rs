//! In-memory chain state.
//!
//! A single linear canonical chain. Used by the dev node and by tests.

use crate::ports::ChainState;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_bus::{HeadEvent, HeadEventBus, HeadListener, HeadPublisher};
use shared_types::{Block, BlockNumber, BlockRef, Bytes, Hash, HeadTopic, Header};
use std::collections::HashMap;
use tracing::debug;

/// Chain store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainStoreError {
    #[error("unknown block {0:?}")]
    UnknownBlock(Hash),
    #[error("block #{0} is not on the canonical chain")]
    NotCanonical(BlockNumber),
    #[error("cannot finalize #{requested}, already finalized #{finalized}")]
    FinalityRegression {
        requested: BlockNumber,
        finalized: BlockNumber,
    },
}

struct ChainStore {
    blocks: HashMap<Hash, Block>,
    /// Canonical hashes indexed by block number.
    canonical: Vec<Hash>,
    best: BlockRef,
    finalized: BlockRef,
}

/// Linear in-memory chain publishing head changes on a [`HeadEventBus`].
pub struct InMemoryChainState {
    store: RwLock<ChainStore>,
    bus: HeadEventBus,
}

impl InMemoryChainState {
    /// Start a chain from `genesis`, which is both best and finalized.
    pub fn new(genesis: Block) -> Self {
        let head = genesis.block_ref();
        let mut blocks = HashMap::new();
        blocks.insert(head.hash, genesis);

        Self {
            store: RwLock::new(ChainStore {
                blocks,
                canonical: vec![head.hash],
                best: head,
                finalized: head,
            }),
            bus: HeadEventBus::new(),
        }
    }

    /// Start from [`Block::genesis`].
    pub fn with_genesis() -> Self {
        Self::new(Block::genesis())
    }

    /// Append a block on top of the best head and make it the new best.
    pub fn import_block(&self, extrinsics: Vec<Bytes>) -> BlockRef {
        let head = {
            let mut store = self.store.write();
            let parent = &store.blocks[&store.best.hash].header;
            let block = Block::child_of(parent, extrinsics);
            let head = block.block_ref();

            store.blocks.insert(head.hash, block);
            store.canonical.push(head.hash);
            store.best = head;
            head
        };

        debug!(number = head.number, hash = ?head.hash, "Imported block");
        // Publish after the store lock is released so listeners that
        // re-read the chain see the new head.
        self.bus.publish(HeadEvent::new_head(head));
        head
    }

    /// Mark a canonical block as finalized.
    pub fn finalize(&self, hash: &Hash) -> Result<BlockRef, ChainStoreError> {
        let head = {
            let mut store = self.store.write();
            let number = store
                .blocks
                .get(hash)
                .map(|b| b.header.number)
                .ok_or(ChainStoreError::UnknownBlock(*hash))?;

            if store.canonical.get(number as usize) != Some(hash) {
                return Err(ChainStoreError::NotCanonical(number));
            }
            if number < store.finalized.number {
                return Err(ChainStoreError::FinalityRegression {
                    requested: number,
                    finalized: store.finalized.number,
                });
            }
            if number == store.finalized.number {
                return Ok(store.finalized);
            }

            store.finalized = BlockRef {
                hash: *hash,
                number,
            };
            store.finalized
        };

        debug!(number = head.number, hash = ?head.hash, "Finalized block");
        self.bus.publish(HeadEvent::finalized(head));
        Ok(head)
    }

    /// Finalize the canonical block at `number`.
    pub fn finalize_number(&self, number: BlockNumber) -> Result<BlockRef, ChainStoreError> {
        let hash = self
            .store
            .read()
            .canonical
            .get(number as usize)
            .copied()
            .ok_or(ChainStoreError::NotCanonical(number))?;
        self.finalize(&hash)
    }

    /// Event bus head changes are published on.
    pub fn bus(&self) -> &HeadEventBus {
        &self.bus
    }
}

impl Default for InMemoryChainState {
    fn default() -> Self {
        Self::with_genesis()
    }
}

#[async_trait]
impl ChainState for InMemoryChainState {
    fn best_head(&self) -> BlockRef {
        self.store.read().best
    }

    fn finalized_head(&self) -> BlockRef {
        self.store.read().finalized
    }

    async fn block_hash_at(&self, number: BlockNumber) -> Option<Hash> {
        let index = usize::try_from(number).ok()?;
        self.store.read().canonical.get(index).copied()
    }

    async fn header(&self, hash: &Hash) -> Option<Header> {
        self.store.read().blocks.get(hash).map(|b| b.header.clone())
    }

    async fn extrinsics(&self, hash: &Hash) -> Option<Vec<Bytes>> {
        self.store.read().blocks.get(hash).map(|b| b.extrinsics.clone())
    }

    fn head_listener(&self, topic: HeadTopic) -> HeadListener {
        self.bus.listen(topic)
    }
}

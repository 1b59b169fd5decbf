//! Block and hash resolution over [`ChainState`].
//!
//! Every query handler goes through here. An omitted block number or hash
//! means "the best head at the time of the call".

use crate::domain::{process_header, ProcessedHeader, ResponseError, RpcResult, SignedBlock};
use crate::ports::ChainState;
use shared_types::{BlockNumber, BlockRef, Hash, HeadTopic};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Header of a head pointer, captured together with the pointer itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadSnapshot {
    pub head: BlockRef,
    pub header: ProcessedHeader,
}

/// Read-only resolver shared by all handlers.
#[derive(Clone)]
pub struct BlockResolver {
    chain: Arc<dyn ChainState>,
}

impl BlockResolver {
    pub fn new(chain: Arc<dyn ChainState>) -> Self {
        Self { chain }
    }

    pub fn chain(&self) -> &Arc<dyn ChainState> {
        &self.chain
    }

    /// chain_getBlockHash
    #[instrument(skip(self))]
    pub async fn get_block_hash(&self, number: Option<BlockNumber>) -> RpcResult<Hash> {
        let number = number.unwrap_or_else(|| self.chain.best_head().number);
        self.chain
            .block_hash_at(number)
            .await
            .ok_or_else(|| ResponseError::block_number_not_found(number))
    }

    /// chain_getHeader
    #[instrument(skip(self))]
    pub async fn get_header(&self, hash: Option<Hash>) -> RpcResult<ProcessedHeader> {
        let hash = hash.unwrap_or_else(|| self.chain.best_head().hash);
        let header = self
            .chain
            .header(&hash)
            .await
            .ok_or_else(|| ResponseError::block_not_found(&hash))?;
        Ok(process_header(&header))
    }

    /// chain_getBlock
    #[instrument(skip(self))]
    pub async fn get_block(&self, hash: Option<Hash>) -> RpcResult<SignedBlock> {
        let hash = hash.unwrap_or_else(|| self.chain.best_head().hash);
        let header = self
            .chain
            .header(&hash)
            .await
            .ok_or_else(|| ResponseError::block_not_found(&hash))?;
        let extrinsics = self
            .chain
            .extrinsics(&hash)
            .await
            .ok_or_else(|| ResponseError::block_not_found(&hash))?;
        Ok(SignedBlock::new(process_header(&header), extrinsics))
    }

    /// chain_getFinalizedHead
    pub fn finalized_head(&self) -> Hash {
        self.chain.finalized_head().hash
    }

    /// chain_getHead
    pub fn best_head(&self) -> Hash {
        self.chain.best_head().hash
    }

    /// Current header of a head pointer.
    ///
    /// `None` only if the chain state reports a head it cannot serve.
    pub async fn current_head(&self, topic: HeadTopic) -> Option<HeadSnapshot> {
        let head = self.chain.head(topic);
        match self.chain.header(&head.hash).await {
            Some(header) => Some(HeadSnapshot {
                head,
                header: process_header(&header),
            }),
            None => {
                debug!(topic = %topic, hash = ?head.hash, "Head header unavailable");
                None
            }
        }
    }
}

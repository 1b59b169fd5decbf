//! # Core Chain Entities
//!
//! - **Identity**: `Hash`, `BlockNumber`, `BlockRef`
//! - **Content**: `Header`, `Digest`, `Block`, `Bytes`
//! - **Head tracking**: `HeadTopic`

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};
use std::fmt;

/// A 32-byte block hash, serialized as `"0x"` + 64 hex chars.
pub use primitive_types::H256 as Hash;

/// Block height in the canonical chain.
pub type BlockNumber = u64;

// =============================================================================
// BYTES
// =============================================================================

/// Opaque byte string with `"0x"`-prefixed hex serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Bytes(v)
    }
}

impl From<&[u8]> for Bytes {
    fn from(v: &[u8]) -> Self {
        Bytes(v.to_vec())
    }
}

impl fmt::Display for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl Serialize for Bytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let stripped = s
            .strip_prefix("0x")
            .ok_or_else(|| de::Error::custom("bytes must start with 0x"))?;
        hex::decode(stripped)
            .map(Bytes)
            .map_err(|e| de::Error::custom(format!("invalid hex: {}", e)))
    }
}

// =============================================================================
// HEADER & BLOCK
// =============================================================================

/// Header digest: an ordered list of opaque log items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    pub logs: Vec<Bytes>,
}

/// Block header as stored by the chain state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    /// Hash of the parent block (zero for genesis).
    pub parent_hash: Hash,
    /// Block height.
    pub number: BlockNumber,
    /// State root after applying this block.
    pub state_root: Hash,
    /// Commitment to the block's extrinsics.
    pub extrinsics_root: Hash,
    /// Consensus/runtime log items.
    pub digest: Digest,
}

impl Header {
    /// Compute the header hash.
    ///
    /// SHA-256 over the fixed-width fields followed by length-prefixed log
    /// items, so two headers differing in any field never collide.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.parent_hash.as_bytes());
        hasher.update(self.number.to_le_bytes());
        hasher.update(self.state_root.as_bytes());
        hasher.update(self.extrinsics_root.as_bytes());
        for log in &self.digest.logs {
            hasher.update((log.len() as u64).to_le_bytes());
            hasher.update(log.as_slice());
        }
        Hash::from_slice(&hasher.finalize())
    }

    /// Reference (hash + number) identifying this header.
    pub fn block_ref(&self) -> BlockRef {
        BlockRef {
            hash: self.hash(),
            number: self.number,
        }
    }
}

/// A block: header plus its encoded extrinsics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub extrinsics: Vec<Bytes>,
}

impl Block {
    /// Genesis block: number 0, zero parent, no extrinsics.
    pub fn genesis() -> Self {
        Self {
            header: Header {
                parent_hash: Hash::zero(),
                number: 0,
                state_root: Hash::zero(),
                extrinsics_root: extrinsics_root(&[]),
                digest: Digest::default(),
            },
            extrinsics: Vec::new(),
        }
    }

    /// Build a child of `parent` carrying `extrinsics`.
    ///
    /// The state root is carried over from the parent; this type never
    /// executes extrinsics.
    pub fn child_of(parent: &Header, extrinsics: Vec<Bytes>) -> Self {
        Self {
            header: Header {
                parent_hash: parent.hash(),
                number: parent.number + 1,
                state_root: parent.state_root,
                extrinsics_root: extrinsics_root(&extrinsics),
                digest: Digest::default(),
            },
            extrinsics,
        }
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn block_ref(&self) -> BlockRef {
        self.header.block_ref()
    }
}

/// Commitment over an ordered list of extrinsics.
pub fn extrinsics_root(extrinsics: &[Bytes]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update((extrinsics.len() as u64).to_le_bytes());
    for xt in extrinsics {
        hasher.update((xt.len() as u64).to_le_bytes());
        hasher.update(xt.as_slice());
    }
    Hash::from_slice(&hasher.finalize())
}

/// Immutable pointer to a block produced by the chain state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRef {
    pub hash: Hash,
    pub number: BlockNumber,
}

// =============================================================================
// HEAD TRACKING
// =============================================================================

/// Which head pointer a change or subscription refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeadTopic {
    /// Best (possibly non-final) head.
    NewHead,
    /// Most recent irreversible head.
    FinalizedHead,
}

impl HeadTopic {
    pub const ALL: [HeadTopic; 2] = [HeadTopic::NewHead, HeadTopic::FinalizedHead];
}

impl fmt::Display for HeadTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeadTopic::NewHead => write!(f, "new_head"),
            HeadTopic::FinalizedHead => write!(f, "finalized_head"),
        }
    }
}

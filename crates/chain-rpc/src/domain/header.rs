//! Transport shape of block headers.
//!
//! Chain state stores block numbers as integers; callers receive them as
//! `"0x"`-prefixed hex strings. [`process_header`] is the only place that
//! conversion happens.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use shared_types::{BlockNumber, Digest, Hash, Header};
use std::fmt;

/// Block number serialized as `"0x" + lowercase hex`, no padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HexNumber(pub BlockNumber);

impl HexNumber {
    /// Parse `"0x..."` back into the integer.
    pub fn parse(s: &str) -> Result<Self, HexNumberError> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| HexNumberError::MissingPrefix(s.to_string()))?;
        if digits.is_empty() {
            return Err(HexNumberError::Empty);
        }
        // from_str_radix alone would accept a sign
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(HexNumberError::InvalidDigits(s.to_string()));
        }
        BlockNumber::from_str_radix(digits, 16)
            .map(HexNumber)
            .map_err(|_| HexNumberError::InvalidDigits(s.to_string()))
    }

    pub fn value(self) -> BlockNumber {
        self.0
    }
}

impl From<BlockNumber> for HexNumber {
    fn from(n: BlockNumber) -> Self {
        HexNumber(n)
    }
}

impl fmt::Display for HexNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl Serialize for HexNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HexNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        HexNumber::parse(&s).map_err(de::Error::custom)
    }
}

/// Hex number parse failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HexNumberError {
    #[error("hex number must start with 0x: {0}")]
    MissingPrefix(String),
    #[error("hex number has no digits")]
    Empty,
    #[error("invalid hex number: {0}")]
    InvalidDigits(String),
}

/// Header as surfaced to RPC callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedHeader {
    pub parent_hash: Hash,
    pub number: HexNumber,
    pub state_root: Hash,
    pub extrinsics_root: Hash,
    pub digest: Digest,
}

/// Re-encode the block number; every other field passes through.
pub fn process_header(header: &Header) -> ProcessedHeader {
    ProcessedHeader {
        parent_hash: header.parent_hash,
        number: HexNumber(header.number),
        state_root: header.state_root,
        extrinsics_root: header.extrinsics_root,
        digest: header.digest.clone(),
    }
}

impl From<&Header> for ProcessedHeader {
    fn from(header: &Header) -> Self {
        process_header(header)
    }
}

//! Block implementation - a header plus the trie it commits to

use std::collections::BTreeMap;

use mpt_trie::MemoryTrie;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use tracing::trace;

use crate::error::Result;

/// Block header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub height: i32,
    /// UNIX timestamp in seconds
    pub timestamp: i64,
    pub hash: String,
    pub parent_hash: String,
    /// Byte size of the block value
    pub size: i32,
}

/// A block: header + trie value
#[derive(Debug, Clone)]
pub struct Block {
    pub header: Header,
    pub value: MemoryTrie,
}

/// Wire form of a block
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct BlockJson {
    pub height: i32,
    #[serde(rename = "timeStamp")]
    pub timestamp: i64,
    pub hash: String,
    #[serde(rename = "parentHash")]
    pub parent_hash: String,
    pub size: i32,
    pub mpt: BTreeMap<String, String>,
}

/// Hex SHA3-256 over height, timestamp, parent hash, trie root and size
fn hash_block(height: i32, timestamp: i64, parent_hash: &str, root: &str, size: i32) -> String {
    let input = format!("{}{}{}{}{}", height, timestamp, parent_hash, root, size);
    hex::encode(Sha3_256::digest(input.as_bytes()))
}

impl Block {
    /// Form a block over `value`. Size and hash are derived from the trie.
    pub fn new(height: i32, timestamp: i64, parent_hash: impl Into<String>, value: MemoryTrie) -> Self {
        let parent_hash = parent_hash.into();
        let size = i32::try_from(value.byte_size()).unwrap_or(i32::MAX);
        let hash = hash_block(height, timestamp, &parent_hash, value.root_hash(), size);
        trace!(height, %hash, "block formed");
        Block {
            header: Header {
                height,
                timestamp,
                hash,
                parent_hash,
                size,
            },
            value,
        }
    }

    pub fn hash(&self) -> &str {
        &self.header.hash
    }

    pub fn height(&self) -> i32 {
        self.header.height
    }

    pub(crate) fn to_json_struct(&self) -> Result<BlockJson> {
        Ok(BlockJson {
            height: self.header.height,
            timestamp: self.header.timestamp,
            hash: self.header.hash.clone(),
            parent_hash: self.header.parent_hash.clone(),
            size: self.header.size,
            mpt: self.value.snapshot()?,
        })
    }

    /// Rebuild a block from its wire form. Header fields are kept as given.
    pub(crate) fn from_json_struct(json: BlockJson) -> Self {
        let mut value = MemoryTrie::new_memory();
        for (key, v) in json.mpt {
            value.insert(&key, v);
        }
        Block {
            header: Header {
                height: json.height,
                timestamp: json.timestamp,
                hash: json.hash,
                parent_hash: json.parent_hash,
                size: json.size,
            },
            value,
        }
    }

    /// Encode as a JSON object with the trie flattened into `mpt`
    pub fn encode_to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_json_struct()?)?)
    }

    pub fn decode_from_json(json: &str) -> Result<Self> {
        let parsed: BlockJson = serde_json::from_str(json)?;
        Ok(Self::from_json_struct(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChainError;

    fn hello_trie() -> MemoryTrie {
        let mut trie = MemoryTrie::new_memory();
        trie.insert("hello", "world");
        trie.insert("charles", "ge");
        trie
    }

    #[test]
    fn test_new_block() {
        let trie = hello_trie();
        let size = trie.byte_size() as i32;
        let root = trie.root_hash().to_string();
        let block = Block::new(1, 1234567890, "genesis", trie);

        assert_eq!(block.height(), 1);
        assert_eq!(block.header.timestamp, 1234567890);
        assert_eq!(block.header.parent_hash, "genesis");
        assert_eq!(block.header.size, size);
        assert_eq!(block.value.root_hash(), root);
        assert_eq!(block.hash().len(), 64);
        assert!(block.hash().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_block_hash_commits_to_header() {
        let a = Block::new(1, 1234567890, "genesis", hello_trie());
        let b = Block::new(1, 1234567890, "genesis", hello_trie());
        assert_eq!(a.hash(), b.hash());

        let other_height = Block::new(2, 1234567890, "genesis", hello_trie());
        let other_parent = Block::new(1, 1234567890, a.hash(), hello_trie());
        let mut trie = hello_trie();
        trie.insert("extra", "x");
        let other_value = Block::new(1, 1234567890, "genesis", trie);

        assert_ne!(a.hash(), other_height.hash());
        assert_ne!(a.hash(), other_parent.hash());
        assert_ne!(a.hash(), other_value.hash());
    }

    #[test]
    fn test_encode_json_shape() {
        let block = Block::new(1, 1234567890, "genesis", hello_trie());
        let json = block.encode_to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["height"], 1);
        assert_eq!(value["timeStamp"], 1234567890);
        assert_eq!(value["hash"], block.hash());
        assert_eq!(value["parentHash"], "genesis");
        assert_eq!(value["size"], block.header.size);
        assert_eq!(value["mpt"]["hello"], "world");
        assert_eq!(value["mpt"]["charles"], "ge");
    }

    #[test]
    fn test_decode_keeps_header_verbatim() {
        let json = r#"{"hash": "3ff3b4efe9177f705550231079c2459ba54a22d340a517e84ec5261a0d74ca48", "timeStamp": 1234567890, "height": 1, "parentHash": "genesis", "size": 1174, "mpt": {"hello": "world", "charles": "ge"}}"#;
        let block = Block::decode_from_json(json).unwrap();

        assert_eq!(
            block.hash(),
            "3ff3b4efe9177f705550231079c2459ba54a22d340a517e84ec5261a0d74ca48"
        );
        assert_eq!(block.header.size, 1174);
        assert_eq!(block.header.parent_hash, "genesis");
        assert_eq!(block.value.get("hello").unwrap(), "world");
        assert_eq!(block.value.get("charles").unwrap(), "ge");
        assert_eq!(block.value.root_hash(), hello_trie().root_hash());
    }

    #[test]
    fn test_json_roundtrip() {
        let block = Block::new(3, 1551025401, "parent", hello_trie());
        let decoded = Block::decode_from_json(&block.encode_to_json().unwrap()).unwrap();
        assert_eq!(decoded.header, block.header);
        assert_eq!(decoded.value.root_hash(), block.value.root_hash());
    }

    #[test]
    fn test_decode_invalid_json() {
        assert!(matches!(
            Block::decode_from_json("{\"height\": 1"),
            Err(ChainError::Json(_))
        ));
        assert!(matches!(
            Block::decode_from_json("{\"height\": 1}"),
            Err(ChainError::Json(_))
        ));
    }
}

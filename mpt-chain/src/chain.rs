//! Block chain - blocks indexed by height, forks kept side by side

use std::collections::BTreeMap;

use tracing::debug;

use crate::block::{Block, BlockJson};
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct BlockChain {
    /// Height -> blocks at that height, in insertion order
    chain: BTreeMap<i32, Vec<Block>>,
    /// Highest height seen
    length: i32,
}

impl BlockChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks stored at `height`, if any
    pub fn get(&self, height: i32) -> Option<&[Block]> {
        self.chain.get(&height).map(Vec::as_slice)
    }

    /// Highest block height in the chain, 0 when empty
    pub fn length(&self) -> i32 {
        self.length
    }

    /// Add a block at its height. A block whose hash is already stored at
    /// that height is ignored.
    pub fn insert(&mut self, block: Block) {
        let height = block.height();
        let blocks = self.chain.entry(height).or_default();
        if blocks.iter().any(|b| b.hash() == block.hash()) {
            debug!(height, hash = block.hash(), "duplicate block skipped");
            return;
        }
        debug!(height, hash = block.hash(), "block inserted");
        blocks.push(block);
        self.length = self.length.max(height);
    }

    /// All blocks, ascending by height
    pub fn blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.chain.values().flatten()
    }

    /// Encode as a JSON array of block objects
    pub fn encode_to_json(&self) -> Result<String> {
        let blocks = self
            .blocks()
            .map(Block::to_json_struct)
            .collect::<Result<Vec<_>>>()?;
        Ok(serde_json::to_string(&blocks)?)
    }

    /// Decode a JSON array of block objects, inserting each in order
    pub fn decode_from_json(json: &str) -> Result<Self> {
        let parsed: Vec<BlockJson> = serde_json::from_str(json)?;
        let mut chain = Self::new();
        for block in parsed {
            chain.insert(Block::from_json_struct(block));
        }
        Ok(chain)
    }
}

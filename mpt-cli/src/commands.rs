//! Subcommand implementations. Each returns the text to print.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use mpt_chain::{Block, BlockChain};
use mpt_trie::MemoryTrie;
use tracing::debug;

/// Build a trie from a flat `{key: value}` JSON file
pub fn load_trie(path: &Path) -> Result<MemoryTrie> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let pairs: BTreeMap<String, String> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a flat JSON object of strings", path.display()))?;

    let mut trie = MemoryTrie::new_memory();
    for (key, value) in pairs {
        trie.insert(&key, value);
    }
    debug!(path = %path.display(), nodes = trie.node_count(), "trie loaded");
    Ok(trie)
}

pub fn root(pairs: &Path) -> Result<String> {
    let trie = load_trie(pairs)?;
    Ok(format!("root: {}\nsize: {}", trie.root_hash(), trie.byte_size()))
}

pub fn get(pairs: &Path, key: &str) -> Result<String> {
    let trie = load_trie(pairs)?;
    trie.get(key).with_context(|| format!("key {:?} not found", key))
}

pub fn dump(pairs: &Path) -> Result<String> {
    let trie = load_trie(pairs)?;
    Ok(trie.dump_nodes()?)
}

pub fn block(pairs: &Path, height: i32, timestamp: i64, parent: &str) -> Result<String> {
    let trie = load_trie(pairs)?;
    let block = Block::new(height, timestamp, parent, trie);
    Ok(block.encode_to_json()?)
}

/// Decode a chain file, then print a per-height summary and the re-encoded chain
pub fn chain(path: &Path) -> Result<String> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let chain = BlockChain::decode_from_json(&raw)
        .with_context(|| format!("failed to decode chain from {}", path.display()))?;

    let mut out = format!("length: {}\n", chain.length());
    for block in chain.blocks() {
        writeln!(
            out,
            "  {:3}. {} <- {} ({} bytes)",
            block.height(),
            block.hash(),
            block.header.parent_hash,
            block.header.size
        )?;
    }
    out.push_str(&chain.encode_to_json()?);
    Ok(out)
}

//! # MPT Chain
//!
//! Blocks carrying a Merkle Patricia Trie as their value, and a chain of
//! such blocks indexed by height:
//! 1. A block header commits to its height, timestamp, parent and trie root
//! 2. Blocks and chains round-trip through JSON
//! 3. A height may hold several blocks (forks); duplicates are ignored

mod block;
mod chain;
mod error;

pub use block::{Block, Header};
pub use chain::BlockChain;
pub use error::{ChainError, Result};

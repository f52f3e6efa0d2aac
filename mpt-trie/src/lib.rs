//! # Merkle Patricia Trie
//!
//! A key/value map over string keys and string values whose structure is
//! content addressed: every node is stored under the hash of its contents,
//! so the root hash commits to the entire map.
//!
//! Key features:
//! - Nibble paths with hex-prefix (compact) encoding
//! - Reference-counted node store, shared subtrees stored once
//! - Order-independent root hash
//! - Snapshot of all stored pairs

pub mod error;
pub mod nibbles;
pub mod node;
pub mod snapshot;
pub mod store;
pub mod trie;

pub use error::{Result, TrieError};
pub use nibbles::{compact_decode, compact_encode, Nibbles};
pub use node::{Node, NodeHash};
pub use store::{MemoryStore, NodeStore};
pub use trie::{MemoryTrie, PatriciaTrie};

//! # Error types for MPT

use thiserror::Error;

/// MPT error types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrieError {
    /// The key has no stored value, or a delete target does not exist.
    #[error("path_not_found")]
    NotFound,

    #[error("Invalid hex-prefix encoding: {0}")]
    InvalidEncoding(String),

    /// A node reference points at a hash the store does not hold.
    #[error("Node not found: {0}")]
    MissingNode(String),

    #[error("Invalid key path: {0}")]
    InvalidPath(String),
}

/// Result type for trie operations
pub type Result<T> = std::result::Result<T, TrieError>;

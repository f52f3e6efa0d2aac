//! Error types for blocks and chains

use mpt_trie::TrieError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("invalid block json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("trie error: {0}")]
    Trie(#[from] TrieError),
}

pub type Result<T> = std::result::Result<T, ChainError>;

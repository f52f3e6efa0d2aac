//! # Patricia Trie
//!
//! The main trie data structure with insert, get, and delete operations.
//!
//! Every mutation walks down from the root one nibble at a time, takes the
//! nodes it rewrites out of the store and puts their replacements back, so
//! the store only ever holds nodes reachable from the current root.
//! Restructuring is expressed with four transformations:
//!
//! - `split`: a leaf/extension path diverges from the inserted path; a
//!   branch is created at the divergence nibble.
//! - `wrap`: a non-empty shared prefix above a branch becomes an extension.
//! - `collapse`: a branch left with a single populated slot is replaced by
//!   a leaf or an extension.
//! - `merge`: a prefix is spliced onto a leaf/extension child, or kept as an
//!   extension in front of a branch child.

use tracing::{debug, trace};

use crate::error::{Result, TrieError};
use crate::nibbles::Nibbles;
use crate::node::{Node, NodeHash};
use crate::store::{MemoryStore, NodeStore};

/// A leaf or extension displaced by a `split`.
enum Displaced {
    /// Leaf remainder below the shared prefix, possibly empty
    Leaf { rest: Nibbles, value: String },
    /// Extension cut at nibble `idx`, with the rest of its path below it
    Extension {
        idx: u8,
        below: Nibbles,
        child: NodeHash,
    },
}

/// Merkle Patricia Trie
#[derive(Debug, Clone)]
pub struct PatriciaTrie<S: NodeStore> {
    /// Root node reference, `None` for the empty trie
    root: Option<NodeHash>,
    /// Node database
    store: S,
}

/// Trie over the in-memory store
pub type MemoryTrie = PatriciaTrie<MemoryStore>;

impl<S: NodeStore> PatriciaTrie<S> {
    /// Create new empty trie
    pub fn new(store: S) -> Self {
        PatriciaTrie { root: None, store }
    }

    /// Root hash, or the empty string for an empty trie
    pub fn root_hash(&self) -> &str {
        self.root.as_ref().map_or("", NodeHash::as_str)
    }

    pub fn root(&self) -> Option<&NodeHash> {
        self.root.as_ref()
    }

    /// Check if trie is empty
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Number of distinct nodes held by the store
    pub fn node_count(&self) -> usize {
        self.store.len()
    }

    /// Get value for key. The empty key never resolves.
    pub fn get(&self, key: &str) -> Result<String> {
        if key.is_empty() {
            return Err(TrieError::NotFound);
        }
        let root = self.root.as_ref().ok_or(TrieError::NotFound)?;
        self.lookup(root, &Nibbles::from_str_key(key))
            .map(str::to_string)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_ok()
    }

    /// Resolve a stored node
    pub(crate) fn node(&self, hash: &NodeHash) -> Result<&Node> {
        self.store
            .get(hash)
            .ok_or_else(|| TrieError::MissingNode(hash.to_string()))
    }

    /// Internal recursive get
    fn lookup(&self, hash: &NodeHash, key: &Nibbles) -> Result<&str> {
        match self.node(hash)? {
            Node::Branch { children, value } => match key.first() {
                None => value.as_deref().ok_or(TrieError::NotFound),
                Some(idx) => {
                    let child = children[idx as usize]
                        .as_ref()
                        .ok_or(TrieError::NotFound)?;
                    self.lookup(child, &key.slice(1))
                }
            },

            Node::Leaf { path, value } => {
                if path == key {
                    Ok(value)
                } else {
                    Err(TrieError::NotFound)
                }
            }

            Node::Extension { path, child } => {
                if !key.starts_with(path) {
                    return Err(TrieError::NotFound);
                }
                self.lookup(child, &key.slice(path.len()))
            }
        }
    }

    /// Insert key-value pair, replacing any previous value
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        let path = Nibbles::from_str_key(key);
        let old_root = self.root.take();
        let new_root = self.insert_at(old_root, path, value.into());
        debug!(key, root = %new_root, "trie insert");
        self.root = Some(new_root);
    }

    /// Internal recursive insert. Consumes the reference to `hash` and
    /// returns a reference to the replacement.
    fn insert_at(&mut self, hash: Option<NodeHash>, path: Nibbles, value: String) -> NodeHash {
        let Some(node) = hash.and_then(|h| self.store.take(&h)) else {
            return self.store.put(Node::leaf(path, value));
        };

        match node {
            Node::Branch {
                mut children,
                value: branch_value,
            } => match path.first() {
                None => self.store.put(Node::Branch {
                    children,
                    value: Some(value),
                }),
                Some(idx) => {
                    let idx = idx as usize;
                    let child = children[idx].take();
                    children[idx] = Some(self.insert_at(child, path.slice(1), value));
                    self.store.put(Node::Branch {
                        children,
                        value: branch_value,
                    })
                }
            },

            Node::Leaf {
                path: leaf_path,
                value: leaf_value,
            } => {
                if leaf_path == path {
                    return self.store.put(Node::leaf(path, value));
                }
                let common = path.common_prefix_len(&leaf_path);
                let displaced = Displaced::Leaf {
                    rest: leaf_path.slice(common),
                    value: leaf_value,
                };
                self.split(path.slice_range(0, common), displaced, path.slice(common), value)
            }

            Node::Extension {
                path: ext_path,
                child,
            } => {
                let common = path.common_prefix_len(&ext_path);
                match ext_path.get(common) {
                    // Full match - descend into the branch below
                    None => {
                        let new_child = self.insert_at(Some(child), path.slice(common), value);
                        self.store.put(Node::extension(ext_path, new_child))
                    }
                    Some(idx) => {
                        let displaced = Displaced::Extension {
                            idx,
                            below: ext_path.slice(common + 1),
                            child,
                        };
                        self.split(path.slice_range(0, common), displaced, path.slice(common), value)
                    }
                }
            }
        }
    }

    /// Build a branch holding the displaced node and the new value, wrapped
    /// in an extension carrying `prefix` when it is non-empty.
    fn split(&mut self, prefix: Nibbles, displaced: Displaced, rest: Nibbles, value: String) -> NodeHash {
        trace!(prefix = %prefix, rest = %rest, "split");
        let mut children: Box<[Option<NodeHash>; 16]> = Box::default();
        let mut branch_value = None;

        match displaced {
            Displaced::Leaf {
                rest: leaf_rest,
                value: leaf_value,
            } => self.attach(&mut children, &mut branch_value, leaf_rest, leaf_value),
            Displaced::Extension { idx, below, child } => {
                children[idx as usize] = Some(self.wrap(below, child));
            }
        }
        self.attach(&mut children, &mut branch_value, rest, value);

        let branch = self.store.put(Node::Branch {
            children,
            value: branch_value,
        });
        self.wrap(prefix, branch)
    }

    /// Place a value under a branch: directly in the value slot when the
    /// path is consumed, otherwise as a leaf in the slot of its next nibble.
    fn attach(
        &mut self,
        children: &mut [Option<NodeHash>; 16],
        slot_value: &mut Option<String>,
        rest: Nibbles,
        value: String,
    ) {
        match rest.first() {
            None => *slot_value = Some(value),
            Some(idx) => {
                let leaf = self.store.put(Node::leaf(rest.slice(1), value));
                children[idx as usize] = Some(leaf);
            }
        }
    }

    /// Extension over `branch` for a non-empty `path`, otherwise the branch itself
    fn wrap(&mut self, path: Nibbles, branch: NodeHash) -> NodeHash {
        if path.is_empty() {
            branch
        } else {
            self.store.put(Node::extension(path, branch))
        }
    }

    /// Delete key from trie.
    ///
    /// The key is resolved read-only first; a missing key leaves the store
    /// untouched.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        let path = Nibbles::from_str_key(key);
        let root = self.root.clone().ok_or(TrieError::NotFound)?;
        self.lookup(&root, &path)?;

        self.root = self.delete_at(root, &path)?;
        debug!(key, root = self.root_hash(), "trie delete");
        Ok(())
    }

    /// Internal recursive delete over a path known to resolve. Consumes the
    /// reference to `hash`; `None` means nothing is left of the subtree.
    fn delete_at(&mut self, hash: NodeHash, key: &Nibbles) -> Result<Option<NodeHash>> {
        let node = self
            .store
            .take(&hash)
            .ok_or_else(|| TrieError::MissingNode(hash.to_string()))?;

        match node {
            Node::Leaf { .. } => Ok(None),

            Node::Branch {
                mut children,
                mut value,
            } => {
                match key.first() {
                    None => value = None,
                    Some(idx) => {
                        let idx = idx as usize;
                        let child = children[idx].take().ok_or(TrieError::NotFound)?;
                        children[idx] = self.delete_at(child, &key.slice(1))?;
                    }
                }
                self.collapse(children, value)
            }

            Node::Extension { path, child } => {
                match self.delete_at(child, &key.slice(path.len()))? {
                    Some(below) => self.merge(path, below).map(Some),
                    None => Ok(None),
                }
            }
        }
    }

    /// Re-store a branch after one of its slots was cleared, replacing it
    /// when a single slot remains.
    fn collapse(
        &mut self,
        mut children: Box<[Option<NodeHash>; 16]>,
        value: Option<String>,
    ) -> Result<Option<NodeHash>> {
        let populated = children.iter().filter(|c| c.is_some()).count();

        match (populated, value) {
            (0, None) => Ok(None),
            (0, Some(value)) => {
                trace!("collapse branch into value leaf");
                Ok(Some(self.store.put(Node::leaf(Nibbles::new(), value))))
            }
            (1, None) => {
                let (idx, child) = children
                    .iter_mut()
                    .enumerate()
                    .find_map(|(idx, slot)| slot.take().map(|child| (idx, child)))
                    .ok_or_else(|| TrieError::MissingNode("collapsed branch child".to_string()))?;
                trace!(idx, "collapse branch into its only child");
                self.merge(Nibbles::from_raw(vec![idx as u8]), child).map(Some)
            }
            (_, value) => Ok(Some(self.store.put(Node::Branch { children, value }))),
        }
    }

    /// Put `prefix` in front of `child`: spliced into a leaf or extension,
    /// or as a new extension over a branch.
    fn merge(&mut self, prefix: Nibbles, child: NodeHash) -> Result<NodeHash> {
        let node = self
            .store
            .take(&child)
            .ok_or_else(|| TrieError::MissingNode(child.to_string()))?;

        let merged = match node {
            Node::Branch { .. } => {
                let branch = self.store.put(node);
                Node::extension(prefix, branch)
            }
            Node::Leaf { path, value } => Node::leaf(prefix.join(&path), value),
            Node::Extension { path, child } => Node::extension(prefix.join(&path), child),
        };
        trace!(node = %merged, "merge");
        Ok(self.store.put(merged))
    }
}

impl PatriciaTrie<MemoryStore> {
    /// Create new trie with in-memory database
    pub fn new_memory() -> Self {
        PatriciaTrie::new(MemoryStore::new())
    }
}

impl Default for PatriciaTrie<MemoryStore> {
    fn default() -> Self {
        Self::new_memory()
    }
}

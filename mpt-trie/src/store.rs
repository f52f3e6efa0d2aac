//! # Node Store
//!
//! Content-addressed storage for trie nodes. The store is the sole owner of
//! every node; tree edges are just [`NodeHash`] values.
//!
//! Entries are reference counted. A count is the number of references held
//! on a hash: by parent nodes, by the trie root, or by an algorithm that is
//! about to embed it. Identical subtrees reachable from several parents are
//! stored once, so evicting one parent must not drop a shared child.

use std::collections::HashMap;

use crate::node::{Node, NodeHash};

/// Database interface for storing nodes
pub trait NodeStore {
    /// Get node by hash
    fn get(&self, hash: &NodeHash) -> Option<&Node>;

    /// Store a node, taking ownership of the child references it carries,
    /// and return a new reference to it.
    fn put(&mut self, node: Node) -> NodeHash;

    /// Give up one reference and return the node. The caller becomes the
    /// owner of one reference to each of the node's children.
    fn take(&mut self, hash: &NodeHash) -> Option<Node>;

    /// Give up one reference. Entries whose count reaches zero are evicted
    /// together with the references they hold.
    fn release(&mut self, hash: &NodeHash);

    /// Number of distinct stored nodes
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored `(hash, node)` pairs, in no particular order
    fn iter(&self) -> impl Iterator<Item = (&NodeHash, &Node)> + '_;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    node: Node,
    refs: usize,
}

/// In-memory node store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    nodes: HashMap<NodeHash, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            nodes: HashMap::new(),
        }
    }

    /// Reference count of a stored node, 0 when absent
    pub fn ref_count(&self, hash: &NodeHash) -> usize {
        self.nodes.get(hash).map_or(0, |e| e.refs)
    }

    fn retain(&mut self, hash: &NodeHash) {
        if let Some(entry) = self.nodes.get_mut(hash) {
            entry.refs += 1;
        }
    }
}

impl NodeStore for MemoryStore {
    fn get(&self, hash: &NodeHash) -> Option<&Node> {
        self.nodes.get(hash).map(|e| &e.node)
    }

    fn put(&mut self, node: Node) -> NodeHash {
        let hash = node.hash();
        match self.nodes.get_mut(&hash) {
            Some(entry) => {
                entry.refs += 1;
                // The stored copy already holds these children.
                for child in node.children() {
                    self.release(child);
                }
            }
            None => {
                self.nodes.insert(hash.clone(), Entry { node, refs: 1 });
            }
        }
        hash
    }

    fn take(&mut self, hash: &NodeHash) -> Option<Node> {
        let entry = self.nodes.get_mut(hash)?;
        if entry.refs > 1 {
            entry.refs -= 1;
            let node = entry.node.clone();
            for child in node.children() {
                self.retain(child);
            }
            Some(node)
        } else {
            self.nodes.remove(hash).map(|e| e.node)
        }
    }

    fn release(&mut self, hash: &NodeHash) {
        if let Some(node) = self.take(hash) {
            for child in node.children() {
                self.release(child);
            }
        }
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn iter(&self) -> impl Iterator<Item = (&NodeHash, &Node)> + '_ {
        self.nodes.iter().map(|(h, e)| (h, &e.node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nibbles::Nibbles;

    fn leaf(path: Vec<u8>, value: &str) -> Node {
        Node::leaf(Nibbles::from_raw(path), value)
    }

    #[test]
    fn test_put_get() {
        let mut store = MemoryStore::new();
        let node = leaf(vec![1, 2], "v");
        let hash = store.put(node.clone());

        assert_eq!(hash, node.hash());
        assert_eq!(store.get(&hash), Some(&node));
        assert_eq!(store.len(), 1);
        assert_eq!(store.ref_count(&hash), 1);
    }

    #[test]
    fn test_duplicate_put_shares_entry() {
        let mut store = MemoryStore::new();
        let a = store.put(leaf(vec![1], "v"));
        let b = store.put(leaf(vec![1], "v"));

        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
        assert_eq!(store.ref_count(&a), 2);

        store.release(&a);
        assert_eq!(store.ref_count(&a), 1);
        assert!(store.get(&a).is_some());

        store.release(&a);
        assert!(store.is_empty());
    }

    #[test]
    fn test_release_cascades_to_children() {
        let mut store = MemoryStore::new();
        let child = store.put(leaf(vec![2], "v"));
        let mut branch = Node::empty_branch();
        if let Node::Branch { ref mut children, .. } = branch {
            children[1] = Some(child.clone());
        }
        let ext = store.put(branch);
        let root = store.put(Node::extension(Nibbles::from_raw(vec![7]), ext));
        assert_eq!(store.len(), 3);

        store.release(&root);
        assert!(store.is_empty());
        assert_eq!(store.ref_count(&child), 0);
    }

    #[test]
    fn test_take_shared_retains_children() {
        let mut store = MemoryStore::new();
        let child = store.put(leaf(vec![], "v"));
        let ext = Node::extension(Nibbles::from_raw(vec![3]), child.clone());
        let first = store.put(ext.clone());
        // second parent reference: the duplicate's child ref is released
        store.retain(&child);
        let second = store.put(ext);
        assert_eq!(first, second);
        assert_eq!(store.ref_count(&child), 1);

        let taken = store.take(&first).unwrap();
        assert_eq!(store.ref_count(&first), 1);
        // the caller now owns a reference to the child as well
        assert_eq!(store.ref_count(&child), 2);

        for c in taken.children() {
            store.release(c);
        }
        store.release(&second);
        assert!(store.is_empty());
    }

    #[test]
    fn test_iter_lists_distinct_nodes() {
        let mut store = MemoryStore::new();
        let a = store.put(leaf(vec![1], "a"));
        let b = store.put(leaf(vec![2], "b"));
        store.put(leaf(vec![1], "a"));

        let mut hashes: Vec<&NodeHash> = store.iter().map(|(h, _)| h).collect();
        hashes.sort();
        let mut expected = vec![&a, &b];
        expected.sort();
        assert_eq!(hashes, expected);
        assert!(store.iter().all(|(h, node)| node.hash() == *h));
    }

    #[test]
    fn test_take_missing() {
        let mut store = MemoryStore::new();
        let hash = leaf(vec![], "nope").hash();
        assert!(store.take(&hash).is_none());
        store.release(&hash);
        assert!(store.is_empty());
    }
}

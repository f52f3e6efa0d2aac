//! # Snapshot and traversal
//!
//! Walks the trie to rebuild the stored key/value pairs, and renders the
//! node store for debugging and size reporting.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{Result, TrieError};
use crate::nibbles::Nibbles;
use crate::node::{Node, NodeHash};
use crate::store::NodeStore;
use crate::trie::PatriciaTrie;

/// Turn a full key path back into the string key it was expanded from
fn path_to_key(path: &Nibbles) -> Result<String> {
    let bytes = path.to_bytes()?;
    String::from_utf8(bytes).map_err(|e| TrieError::InvalidPath(e.to_string()))
}

impl<S: NodeStore> PatriciaTrie<S> {
    /// Every stored `(key, value)` pair, ordered by key
    pub fn snapshot(&self) -> Result<BTreeMap<String, String>> {
        match self.root() {
            Some(root) => self.collect_from(root, Nibbles::new()),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Pairs stored below `hash`, whose path from the root is `prefix`
    pub fn collect_from(&self, hash: &NodeHash, prefix: Nibbles) -> Result<BTreeMap<String, String>> {
        let mut pairs = BTreeMap::new();
        let mut path = prefix;
        self.collect_into(hash, &mut path, &mut pairs)?;
        Ok(pairs)
    }

    fn collect_into(
        &self,
        hash: &NodeHash,
        path: &mut Nibbles,
        pairs: &mut BTreeMap<String, String>,
    ) -> Result<()> {
        match self.node(hash)? {
            Node::Branch { children, value } => {
                if let Some(value) = value {
                    pairs.insert(path_to_key(path)?, value.clone());
                }
                for (idx, child) in children.iter().enumerate() {
                    if let Some(child) = child {
                        path.push(idx as u8);
                        self.collect_into(child, path, pairs)?;
                        path.pop();
                    }
                }
            }
            Node::Leaf { path: rest, value } => {
                pairs.insert(path_to_key(&path.join(rest))?, value.clone());
            }
            Node::Extension { path: rest, child } => {
                let depth = path.len();
                path.extend(rest);
                self.collect_into(child, path, pairs)?;
                path.truncate(depth);
            }
        }
        Ok(())
    }

    /// Byte length of the trie's rendering, reported as a size metric
    pub fn byte_size(&self) -> usize {
        self.to_string().len()
    }

    /// Depth-first listing of the nodes reachable from the root.
    ///
    /// Nodes are labelled `Hash0`, `Hash1`, ... in visiting order and child
    /// references are shown by label.
    pub fn dump_nodes(&self) -> Result<String> {
        let Some(root) = self.root() else {
            return Ok(String::new());
        };

        let mut labels: HashMap<&NodeHash, String> = HashMap::new();
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(hash) = stack.pop() {
            if labels.contains_key(hash) {
                continue;
            }
            labels.insert(hash, format!("Hash{}", order.len()));
            let node = self.node(hash)?;
            order.push((hash, node));
            stack.extend(node.children());
        }

        let mut out = String::new();
        for (hash, node) in order {
            let mut line = node.to_string();
            for child in node.children() {
                line = line.replace(child.as_str(), &labels[child]);
            }
            out.push_str(&format!("{}: {}\n", labels[hash], line));
        }
        Ok(out)
    }
}

/// `ROOT=<root>` followed by one `<hash>: <node>` line per stored node,
/// ordered by hash.
impl<S: NodeStore> fmt::Display for PatriciaTrie<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ROOT={}", self.root_hash())?;
        let mut nodes: Vec<_> = self.store().iter().collect();
        nodes.sort_by(|a, b| a.0.cmp(b.0));
        for (hash, node) in nodes {
            writeln!(f, "{}: {}", hash, node)?;
        }
        Ok(())
    }
}

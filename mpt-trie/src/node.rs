//! # MPT Node Types
//!
//! The MPT has three stored node types:
//! 1. Leaf - stores a value at the end of a remaining path
//! 2. Extension - shares a common prefix path down to a single branch
//! 3. Branch - 16-way branch point + optional value
//!
//! The null trie is not a node: it is the absence of a root reference.
//! Children are referenced purely by [`NodeHash`]; the store owns the nodes.

use std::fmt;

use sha3::{Digest, Sha3_256};

use crate::nibbles::Nibbles;

const HASH_START: &str = "HashStart_";
const HASH_END: &str = "_HashEnd";

/// Reference to a stored node: the wrapped hex digest of its contents.
///
/// The `HashStart_..._HashEnd` wrapper keeps node references
/// distinguishable from raw values when both are rendered as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHash(String);

impl NodeHash {
    /// SHA3-256 of `data`, hex encoded and wrapped
    pub fn digest(data: &[u8]) -> Self {
        let sum = Sha3_256::digest(data);
        NodeHash(format!("{}{}{}", HASH_START, hex::encode(sum), HASH_END))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bare hex digest without the wrapper
    pub fn hex(&self) -> &str {
        &self.0[HASH_START.len()..self.0.len() - HASH_END.len()]
    }
}

impl fmt::Display for NodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NodeHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// MPT node types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Branch node: [child0, child1, ..., child15, value]
    /// 16 children (one per nibble) + optional value
    Branch {
        children: Box<[Option<NodeHash>; 16]>,
        value: Option<String>,
    },

    /// Leaf node: remaining key nibbles (terminator implied) and the value
    Leaf { path: Nibbles, value: String },

    /// Extension node: shared nibbles and the branch below them
    Extension { path: Nibbles, child: NodeHash },
}

impl Node {
    /// Create empty branch node
    pub fn empty_branch() -> Self {
        Node::Branch {
            children: Box::default(),
            value: None,
        }
    }

    /// Create leaf node
    pub fn leaf(path: Nibbles, value: impl Into<String>) -> Self {
        Node::Leaf {
            path,
            value: value.into(),
        }
    }

    /// Create extension node
    pub fn extension(path: Nibbles, child: NodeHash) -> Self {
        Node::Extension { path, child }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, Node::Branch { .. })
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Hex-prefix encoding of a leaf/extension path, with the leaf flag set
    /// for leaves.
    pub fn encoded_path(&self) -> Option<Vec<u8>> {
        match self {
            Node::Leaf { path, .. } => Some(path.to_hex_prefix(true)),
            Node::Extension { path, .. } => Some(path.to_hex_prefix(false)),
            Node::Branch { .. } => None,
        }
    }

    /// References this node holds, in slot order
    pub fn children(&self) -> impl Iterator<Item = &NodeHash> + '_ {
        let (slots, child): (&[Option<NodeHash>], Option<&NodeHash>) = match self {
            Node::Branch { children, .. } => (&children[..], None),
            Node::Extension { child, .. } => (&[], Some(child)),
            Node::Leaf { .. } => (&[], None),
        };
        slots.iter().flatten().chain(child)
    }

    /// Number of populated branch slots, counting the value slot as one.
    pub fn populated_slots(&self) -> usize {
        match self {
            Node::Branch { children, value } => {
                children.iter().filter(|c| c.is_some()).count() + usize::from(value.is_some())
            }
            _ => 0,
        }
    }

    /// Canonical string the node hash is computed over.
    ///
    /// Branch slots are written in fixed order, each either `_` (empty) or
    /// length-prefixed; leaf and extension paths are included in hex-prefix
    /// form.
    pub fn hash_input(&self) -> String {
        fn push_slot(s: &mut String, slot: Option<&str>) {
            match slot {
                Some(content) => s.push_str(&format!("{}:{}", content.len(), content)),
                None => s.push('_'),
            }
        }

        match self {
            Node::Branch { children, value } => {
                let mut s = String::from("branch_");
                for child in children.iter() {
                    push_slot(&mut s, child.as_ref().map(NodeHash::as_str));
                }
                push_slot(&mut s, value.as_deref());
                s
            }
            Node::Leaf { path, value } => {
                format!("leaf_{}_{}", hex::encode(path.to_hex_prefix(true)), value)
            }
            Node::Extension { path, child } => {
                format!("ext_{}_{}", hex::encode(path.to_hex_prefix(false)), child)
            }
        }
    }

    /// Get hash of this node
    pub fn hash(&self) -> NodeHash {
        NodeHash::digest(self.hash_input().as_bytes())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Branch { children, value } => {
                write!(f, "Branch[")?;
                for (i, child) in children.iter().enumerate() {
                    let slot = child.as_ref().map(NodeHash::as_str).unwrap_or("");
                    write!(f, "{}=\"{}\", ", i, slot)?;
                }
                write!(f, "value={}]", value.as_deref().unwrap_or(""))
            }
            Node::Leaf { path, value } => {
                write!(f, "Leaf<{:?}, value=\"{}\">", path.as_slice(), value)
            }
            Node::Extension { path, child } => {
                write!(f, "Ext<{:?}, value=\"{}\">", path.as_slice(), child)
            }
        }
    }
}

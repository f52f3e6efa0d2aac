//! # Nibbles
//!
//! Keys in the MPT are represented as nibbles (half-bytes / 4 bits).
//! This allows branching on 16 possible values at each node.
//!
//! Leaf and extension paths are stored in hex-prefix ("compact") form: a
//! flag nibble `2 * is_leaf + odd_len` is prepended, a zero pad nibble is
//! added when the flagged path would otherwise have odd length, and the
//! nibbles are packed two per byte.

use std::fmt;

use crate::error::{Result, TrieError};

/// Sentinel nibble marking a path that ends at a value.
pub const TERMINATOR: u8 = 16;

/// A sequence of nibbles (4-bit values)
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Nibbles {
    /// The nibble data
    data: Vec<u8>,
}

impl Nibbles {
    /// Create empty nibbles
    pub fn new() -> Self {
        Nibbles { data: Vec::new() }
    }

    /// Create from bytes (each byte becomes 2 nibbles)
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut data = Vec::with_capacity(bytes.len() * 2);
        for byte in bytes {
            data.push(byte >> 4); // High nibble
            data.push(byte & 0x0f); // Low nibble
        }
        Nibbles { data }
    }

    /// Hex-expand the UTF-8 bytes of a string key: `"abc"` -> `[6,1,6,2,6,3]`
    pub fn from_str_key(key: &str) -> Self {
        Self::from_bytes(key.as_bytes())
    }

    /// Create from raw nibbles
    pub fn from_raw(nibbles: Vec<u8>) -> Self {
        debug_assert!(nibbles.iter().all(|n| *n < 16));
        Nibbles { data: nibbles }
    }

    /// Decode hex prefix encoded data into `(path, is_leaf)`.
    ///
    /// Flags: bit 0 = odd length, bit 1 = leaf node. Empty input decodes to
    /// an empty extension path.
    pub fn from_hex_prefix(encoded: &[u8]) -> Result<(Self, bool)> {
        let Some(&first) = encoded.first() else {
            return Ok((Nibbles::new(), false));
        };

        let flag = first >> 4;
        if flag > 3 {
            return Err(TrieError::InvalidEncoding(format!(
                "flag nibble {} out of range",
                flag
            )));
        }
        let is_leaf = flag & 2 == 2;
        let odd = flag & 1 == 1;

        let mut nibbles = Vec::with_capacity(encoded.len() * 2);
        if odd {
            // First byte carries the first path nibble
            nibbles.push(first & 0x0f);
        } else if first & 0x0f != 0 {
            return Err(TrieError::InvalidEncoding(format!(
                "non-zero pad nibble in {:#04x}",
                first
            )));
        }

        for byte in &encoded[1..] {
            nibbles.push(byte >> 4);
            nibbles.push(byte & 0x0f);
        }

        Ok((Nibbles { data: nibbles }, is_leaf))
    }

    /// Encode to hex prefix format
    pub fn to_hex_prefix(&self, is_leaf: bool) -> Vec<u8> {
        let prefix = if is_leaf { 2 } else { 0 };
        let odd = self.len() % 2 == 1;

        let mut encoded = Vec::with_capacity(self.len() / 2 + 1);

        let rest = if odd {
            // First byte: flag | first nibble
            encoded.push((prefix + 1) << 4 | self.data[0]);
            &self.data[1..]
        } else {
            // First byte: flag | pad
            encoded.push(prefix << 4);
            &self.data[..]
        };

        for chunk in rest.chunks(2) {
            encoded.push(chunk[0] << 4 | chunk[1]);
        }

        encoded
    }

    /// Convert back to bytes (each 2 nibbles -> 1 byte)
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.data.len() % 2 != 0 {
            return Err(TrieError::InvalidPath(format!(
                "odd number of nibbles ({})",
                self.data.len()
            )));
        }

        Ok(self
            .data
            .chunks(2)
            .map(|chunk| chunk[0] << 4 | chunk[1])
            .collect())
    }

    /// Get length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get nibble at index
    pub fn get(&self, index: usize) -> Option<u8> {
        self.data.get(index).copied()
    }

    /// Get first nibble
    pub fn first(&self) -> Option<u8> {
        self.data.first().copied()
    }

    /// Get slice from index
    pub fn slice(&self, start: usize) -> Self {
        Nibbles {
            data: self.data[start..].to_vec(),
        }
    }

    /// Get slice range
    pub fn slice_range(&self, start: usize, end: usize) -> Self {
        Nibbles {
            data: self.data[start..end].to_vec(),
        }
    }

    /// Find common prefix length with another nibble sequence
    pub fn common_prefix_len(&self, other: &Nibbles) -> usize {
        self.data
            .iter()
            .zip(other.data.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }

    /// Whether `prefix` is a prefix of this sequence
    pub fn starts_with(&self, prefix: &Nibbles) -> bool {
        self.data.starts_with(&prefix.data)
    }

    /// Append another nibble sequence
    pub fn extend(&mut self, other: &Nibbles) {
        self.data.extend_from_slice(&other.data);
    }

    /// `self ++ other` as a new sequence
    pub fn join(&self, other: &Nibbles) -> Self {
        let mut joined = self.clone();
        joined.extend(other);
        joined
    }

    /// Push a single nibble
    pub fn push(&mut self, nibble: u8) {
        debug_assert!(nibble < 16);
        self.data.push(nibble);
    }

    /// Remove the last nibble
    pub fn pop(&mut self) -> Option<u8> {
        self.data.pop()
    }

    /// Drop the last `n` nibbles
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    /// Get as slice
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl Default for Nibbles {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Nibbles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nibbles(")?;
        for n in &self.data {
            write!(f, "{:x}", n)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Nibbles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for n in &self.data {
            write!(f, "{:x}", n)?;
        }
        Ok(())
    }
}

/// Hex-prefix encode a raw nibble slice.
///
/// A trailing [`TERMINATOR`] selects the leaf flag and is not stored. An
/// empty input encodes to an empty output.
pub fn compact_encode(hex_array: &[u8]) -> Vec<u8> {
    if hex_array.is_empty() {
        return Vec::new();
    }
    let (path, is_leaf) = match hex_array.split_last() {
        Some((&TERMINATOR, rest)) => (rest, true),
        _ => (hex_array, false),
    };
    Nibbles::from_raw(path.to_vec()).to_hex_prefix(is_leaf)
}

/// Inverse of [`compact_encode`], returning the path nibbles without the
/// terminator.
pub fn compact_decode(encoded: &[u8]) -> Result<Vec<u8>> {
    let (path, _) = Nibbles::from_hex_prefix(encoded)?;
    Ok(path.data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_from_bytes() {
        let nibbles = Nibbles::from_bytes(&[0xab, 0xcd]);
        assert_eq!(nibbles.len(), 4);
        assert_eq!(nibbles.get(0), Some(0xa));
        assert_eq!(nibbles.get(1), Some(0xb));
        assert_eq!(nibbles.get(2), Some(0xc));
        assert_eq!(nibbles.get(3), Some(0xd));
    }

    #[test]
    fn test_from_str_key() {
        let nibbles = Nibbles::from_str_key("abc");
        assert_eq!(nibbles.as_slice(), &[6, 1, 6, 2, 6, 3]);
        assert_eq!(nibbles.to_string(), "616263");
    }

    #[test]
    fn test_to_bytes() {
        let nibbles = Nibbles::from_raw(vec![0xa, 0xb, 0xc, 0xd]);
        assert_eq!(nibbles.to_bytes().unwrap(), vec![0xab, 0xcd]);
        assert!(Nibbles::from_raw(vec![1, 2, 3]).to_bytes().is_err());
    }

    #[test]
    fn test_compact_encode_odd_extension() {
        // flag 1, no pad: [1,1,6,1] -> [0x11, 0x61]
        assert_eq!(compact_encode(&[1, 6, 1]), vec![17, 97]);
        assert_eq!(compact_decode(&[17, 97]).unwrap(), vec![1, 6, 1]);
    }

    #[test]
    fn test_compact_encode_terminated() {
        let encoded = compact_encode(&[0, 15, 1, 12, 11, 8, 16]);
        assert_eq!(encoded, vec![0x20, 0x0f, 0x1c, 0xb8]);
        assert_eq!(compact_decode(&encoded).unwrap(), vec![0, 15, 1, 12, 11, 8]);

        let encoded = compact_encode(&[15, 1, 12, 11, 8, 16]);
        assert_eq!(encoded, vec![0x3f, 0x1c, 0xb8]);
        assert_eq!(compact_decode(&encoded).unwrap(), vec![15, 1, 12, 11, 8]);
    }

    #[test]
    fn test_compact_encode_empty() {
        assert!(compact_encode(&[]).is_empty());
        assert!(compact_decode(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_hex_prefix_leaf_odd() {
        let nibbles = Nibbles::from_raw(vec![1, 2, 3]);
        let encoded = nibbles.to_hex_prefix(true);
        // Odd leaf: prefix = 3, first byte = 0x31
        assert_eq!(encoded, vec![0x31, 0x23]);

        let (decoded, is_leaf) = Nibbles::from_hex_prefix(&encoded).unwrap();
        assert!(is_leaf);
        assert_eq!(decoded, nibbles);
    }

    #[test]
    fn test_hex_prefix_leaf_even() {
        let nibbles = Nibbles::from_raw(vec![1, 2, 3, 4]);
        let encoded = nibbles.to_hex_prefix(true);
        // Even leaf: prefix = 2, first byte = 0x20
        assert_eq!(encoded, vec![0x20, 0x12, 0x34]);

        let (decoded, is_leaf) = Nibbles::from_hex_prefix(&encoded).unwrap();
        assert!(is_leaf);
        assert_eq!(decoded, nibbles);
    }

    #[test]
    fn test_hex_prefix_extension_even() {
        let nibbles = Nibbles::from_raw(vec![1, 2, 3, 4]);
        let encoded = nibbles.to_hex_prefix(false);
        assert_eq!(encoded, vec![0x00, 0x12, 0x34]);

        let (decoded, is_leaf) = Nibbles::from_hex_prefix(&encoded).unwrap();
        assert!(!is_leaf);
        assert_eq!(decoded, nibbles);
    }

    #[test]
    fn test_hex_prefix_empty_leaf() {
        let encoded = Nibbles::new().to_hex_prefix(true);
        assert_eq!(encoded, vec![0x20]);
        let (decoded, is_leaf) = Nibbles::from_hex_prefix(&encoded).unwrap();
        assert!(is_leaf);
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_hex_prefix_rejects_bad_flags() {
        assert!(matches!(
            Nibbles::from_hex_prefix(&[0x40, 0x12]),
            Err(TrieError::InvalidEncoding(_))
        ));
        // even flag with a non-zero pad nibble
        assert!(matches!(
            Nibbles::from_hex_prefix(&[0x25]),
            Err(TrieError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_common_prefix() {
        let a = Nibbles::from_raw(vec![1, 2, 3, 4, 5]);
        let b = Nibbles::from_raw(vec![1, 2, 3, 6, 7]);

        assert_eq!(a.common_prefix_len(&b), 3);
        assert!(a.starts_with(&Nibbles::from_raw(vec![1, 2])));
        assert!(!a.starts_with(&b));
    }

    #[test]
    fn test_slice_and_join() {
        let nibbles = Nibbles::from_raw(vec![1, 2, 3, 4, 5]);

        assert_eq!(nibbles.slice(2), Nibbles::from_raw(vec![3, 4, 5]));
        assert_eq!(nibbles.slice_range(1, 4), Nibbles::from_raw(vec![2, 3, 4]));
        assert_eq!(
            nibbles.slice_range(0, 2).join(&nibbles.slice(4)),
            Nibbles::from_raw(vec![1, 2, 5])
        );
    }

    proptest! {
        #[test]
        fn prop_hex_prefix_roundtrip(raw in proptest::collection::vec(0u8..16, 0..40), is_leaf: bool) {
            let path = Nibbles::from_raw(raw);
            let (decoded, leaf) = Nibbles::from_hex_prefix(&path.to_hex_prefix(is_leaf)).unwrap();
            prop_assert_eq!(decoded, path);
            prop_assert_eq!(leaf, is_leaf);
        }
    }
}

//! Sum-tree proofs
//!
//! Every node carries a hash and a value. A parent hashes its children's
//! hashes followed by the canonical string of their summed value, so a proof
//! commits to both the leaf data and the running totals.

use crate::crypto::sha3_256;
use crate::error::{Result, ScriptError};
use crate::number::Number;
use serde::{Deserialize, Serialize};

/// Hash and value of one tree node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MmrData {
    pub data: Vec<u8>,
    pub value: Number,
}

impl MmrData {
    pub fn new(data: Vec<u8>, value: Number) -> Self {
        Self { data, value }
    }

    /// Leaf node for raw data
    pub fn leaf(data: &[u8], value: Number) -> Self {
        Self { data: sha3_256(data).to_vec(), value }
    }

    pub fn parent(left: &MmrData, right: &MmrData) -> Result<MmrData> {
        let value = left.value.add(&right.value)?;
        let mut preimage = Vec::with_capacity(left.data.len() + right.data.len() + 16);
        preimage.extend_from_slice(&left.data);
        preimage.extend_from_slice(&right.data);
        preimage.extend_from_slice(value.to_string().as_bytes());
        Ok(Self { data: sha3_256(&preimage).to_vec(), value })
    }
}

/// One sibling on the path to the root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MmrProofChunk {
    /// True when the sibling sits to the left of the running node
    pub left: bool,
    pub data: MmrData,
}

/// Path from a leaf to a root
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MmrProof {
    pub chunks: Vec<MmrProofChunk>,
}

impl MmrProof {
    /// Fold the proof over `leaf`
    pub fn calculate_root(&self, leaf: MmrData) -> Result<MmrData> {
        let mut current = leaf;
        for chunk in &self.chunks {
            current = if chunk.left {
                MmrData::parent(&chunk.data, &current)?
            } else {
                MmrData::parent(&current, &chunk.data)?
            };
        }
        Ok(current)
    }

    /// Build the root of `leaves` and the proof for the leaf at `index`
    ///
    /// Nodes are paired left to right; an unpaired last node moves up unchanged.
    pub fn build(leaves: &[MmrData], index: usize) -> Result<(MmrData, MmrProof)> {
        if index >= leaves.len() {
            return Err(ScriptError::Execution(format!(
                "Leaf index {} out of range for {} leaves",
                index,
                leaves.len()
            )));
        }

        let mut level = leaves.to_vec();
        let mut position = index;
        let mut chunks = Vec::new();
        while level.len() > 1 {
            let sibling = position ^ 1;
            if sibling < level.len() {
                chunks.push(MmrProofChunk { left: sibling < position, data: level[sibling].clone() });
            }
            let mut next = Vec::with_capacity((level.len() + 1) / 2);
            for pair in level.chunks(2) {
                match pair {
                    [left, right] => next.push(MmrData::parent(left, right)?),
                    [single] => next.push(single.clone()),
                    _ => {}
                }
            }
            position /= 2;
            level = next;
        }

        Ok((level[0].clone(), MmrProof { chunks }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: usize) -> Vec<MmrData> {
        (0..n).map(|i| MmrData::leaf(&[i as u8], Number::from(i as u64 + 1))).collect()
    }

    #[test]
    fn test_every_leaf_proves_to_root() {
        let leaves = leaves(5);
        let (root, _) = MmrProof::build(&leaves, 0).unwrap();
        assert_eq!(root.value, Number::from(15u64));
        for (i, leaf) in leaves.iter().enumerate() {
            let (_, proof) = MmrProof::build(&leaves, i).unwrap();
            assert_eq!(proof.calculate_root(leaf.clone()).unwrap(), root);
        }
    }

    #[test]
    fn test_wrong_leaf_gives_other_root() {
        let leaves = leaves(4);
        let (root, proof) = MmrProof::build(&leaves, 1).unwrap();
        let forged = MmrData::leaf(&[9], Number::from(2u64));
        assert_ne!(proof.calculate_root(forged).unwrap(), root);
    }

    #[test]
    fn test_single_leaf_is_root() {
        let leaves = leaves(1);
        let (root, proof) = MmrProof::build(&leaves, 0).unwrap();
        assert!(proof.chunks.is_empty());
        assert_eq!(root, leaves[0]);
        assert!(MmrProof::build(&leaves, 1).is_err());
    }

    #[test]
    fn test_parent_commits_to_order() {
        let a = MmrData::leaf(b"a", Number::one());
        let b = MmrData::leaf(b"b", Number::one());
        assert_ne!(MmrData::parent(&a, &b).unwrap(), MmrData::parent(&b, &a).unwrap());
    }
}

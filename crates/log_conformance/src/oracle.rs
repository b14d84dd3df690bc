// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! The independent Merkle tree used as ground truth, and building it from the
//! leaves a log serves.

use crate::HarnessError;
use log_api::LogLeaf;
use merkle_oracle::{Hash, MemoryTree, MerkleError};

/// A reference Merkle tree and its proof verification routines.
pub trait MerkleOracle {
    type Error: std::error::Error;

    /// Returns the leaf hash of `data`.
    fn hash_leaf(&self, data: &[u8]) -> Vec<u8>;

    /// Appends a leaf with contents `data`.
    fn append(&mut self, data: &[u8]);

    /// Returns the number of leaves appended.
    fn size(&self) -> u64;

    /// Returns the root hash of the tree of the first `size` leaves.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` exceeds the number of leaves.
    fn root_at(&self, size: u64) -> Result<Vec<u8>, Self::Error>;

    /// Returns the hash of the leaf at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no such leaf.
    fn leaf_hash_at(&self, index: u64) -> Result<Vec<u8>, Self::Error>;

    /// Verifies an inclusion proof for `leaf_hash` at `index` in the tree of
    /// size `size` with root `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the proof does not verify.
    fn verify_inclusion(
        &self,
        index: u64,
        size: u64,
        leaf_hash: &[u8],
        proof: &[Vec<u8>],
        root: &[u8],
    ) -> Result<(), Self::Error>;

    /// Verifies a consistency proof between the trees of sizes `size1` and
    /// `size2` with roots `root1` and `root2`.
    ///
    /// # Errors
    ///
    /// Returns an error if the proof does not verify.
    fn verify_consistency(
        &self,
        size1: u64,
        size2: u64,
        proof: &[Vec<u8>],
        root1: &[u8],
        root2: &[u8],
    ) -> Result<(), Self::Error>;
}

fn to_hashes(proof: &[Vec<u8>]) -> Result<Vec<Hash>, MerkleError> {
    proof.iter().map(|h| Hash::try_from(h.as_slice())).collect()
}

impl MerkleOracle for MemoryTree {
    type Error = MerkleError;

    fn hash_leaf(&self, data: &[u8]) -> Vec<u8> {
        merkle_oracle::leaf_hash(data).0.to_vec()
    }

    fn append(&mut self, data: &[u8]) {
        MemoryTree::append(self, data);
    }

    fn size(&self) -> u64 {
        MemoryTree::size(self)
    }

    fn root_at(&self, size: u64) -> Result<Vec<u8>, MerkleError> {
        Ok(MemoryTree::root_at(self, size)?.0.to_vec())
    }

    fn leaf_hash_at(&self, index: u64) -> Result<Vec<u8>, MerkleError> {
        Ok(MemoryTree::leaf_hash_at(self, index)?.0.to_vec())
    }

    fn verify_inclusion(
        &self,
        index: u64,
        size: u64,
        leaf_hash: &[u8],
        proof: &[Vec<u8>],
        root: &[u8],
    ) -> Result<(), MerkleError> {
        merkle_oracle::verify_inclusion(
            index,
            size,
            Hash::try_from(leaf_hash)?,
            &to_hashes(proof)?,
            Hash::try_from(root)?,
        )
    }

    fn verify_consistency(
        &self,
        size1: u64,
        size2: u64,
        proof: &[Vec<u8>],
        root1: &[u8],
        root2: &[u8],
    ) -> Result<(), MerkleError> {
        merkle_oracle::verify_consistency(
            size1,
            size2,
            &to_hashes(proof)?,
            Hash::try_from(root1)?,
            Hash::try_from(root2)?,
        )
    }
}

/// Appends the values of `leaves`, in order, to the empty tree `oracle`.
///
/// # Errors
///
/// Returns an error if `oracle` already holds leaves.
pub fn build_reference_tree<O: MerkleOracle>(
    mut oracle: O,
    leaves: &[LogLeaf],
) -> Result<O, HarnessError> {
    if oracle.size() != 0 {
        return Err(HarnessError::Oracle(format!(
            "reference tree must start empty, has {} leaves",
            oracle.size()
        )));
    }
    for leaf in leaves {
        oracle.append(&leaf.leaf_value);
    }
    Ok(oracle)
}

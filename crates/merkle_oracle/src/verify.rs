// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Proof verification.
//!
//! References:
//! - [RFC 9162 section 2.1.3.2](https://www.rfc-editor.org/rfc/rfc9162#section-2.1.3.2)
//! - [RFC 9162 section 2.1.4.2](https://www.rfc-editor.org/rfc/rfc9162#section-2.1.4.2)

use crate::{node_hash, Hash, MerkleError};

/// Verifies that `proof` shows the leaf with hash `leaf` at `index` is
/// included in the tree of size `size` with root hash `root`.
///
/// # Errors
///
/// Returns an error if `index >= size` or the proof does not lead to `root`.
pub fn verify_inclusion(
    index: u64,
    size: u64,
    leaf: Hash,
    proof: &[Hash],
    root: Hash,
) -> Result<(), MerkleError> {
    if index >= size {
        return Err(MerkleError::IndexNotInTree { index, size });
    }
    if root_from_inclusion_proof(index, size, leaf, proof)? == root {
        Ok(())
    } else {
        Err(MerkleError::InvalidProof("root mismatch"))
    }
}

/// Returns the root implied by an inclusion proof for leaf `index` in a tree
/// of size `size`.
///
/// # Errors
///
/// Returns an error if the proof has the wrong number of hashes for the
/// given position.
pub fn root_from_inclusion_proof(
    index: u64,
    size: u64,
    leaf: Hash,
    proof: &[Hash],
) -> Result<Hash, MerkleError> {
    if index >= size {
        return Err(MerkleError::IndexNotInTree { index, size });
    }
    let (mut fn_, mut sn) = (index, size - 1);
    let mut r = leaf;
    for p in proof {
        if sn == 0 {
            return Err(MerkleError::InvalidProof("proof too long"));
        }
        if fn_ & 1 == 1 || fn_ == sn {
            r = node_hash(*p, r);
            while fn_ & 1 == 0 && fn_ != 0 {
                fn_ >>= 1;
                sn >>= 1;
            }
        } else {
            r = node_hash(r, *p);
        }
        fn_ >>= 1;
        sn >>= 1;
    }
    if sn != 0 {
        return Err(MerkleError::InvalidProof("proof too short"));
    }
    Ok(r)
}

/// Verifies that `proof` shows the tree of size `size2` with root `root2`
/// contains as a prefix the tree of size `size1` with root `root1`.
///
/// # Errors
///
/// Returns an error if `size1 > size2` or the proof is invalid.
pub fn verify_consistency(
    size1: u64,
    size2: u64,
    proof: &[Hash],
    root1: Hash,
    root2: Hash,
) -> Result<(), MerkleError> {
    if size1 > size2 {
        return Err(MerkleError::InvalidInput(format!(
            "size1 {size1} > size2 {size2}"
        )));
    }
    if size1 == size2 {
        if !proof.is_empty() {
            return Err(MerkleError::InvalidProof("expected empty proof"));
        }
        if root1 != root2 {
            return Err(MerkleError::InvalidProof("roots of equal trees differ"));
        }
        return Ok(());
    }
    if size1 == 0 {
        // Every tree extends the empty tree.
        if !proof.is_empty() {
            return Err(MerkleError::InvalidProof("expected empty proof"));
        }
        return Ok(());
    }
    if proof.is_empty() {
        return Err(MerkleError::InvalidProof("empty proof"));
    }

    let mut path = proof.iter();
    let seed = if size1.is_power_of_two() {
        root1
    } else {
        *path.next().ok_or(MerkleError::InvalidProof("empty proof"))?
    };

    let (mut fn_, mut sn) = (size1 - 1, size2 - 1);
    while fn_ & 1 == 1 {
        fn_ >>= 1;
        sn >>= 1;
    }

    let (mut fr, mut sr) = (seed, seed);
    for c in path {
        if sn == 0 {
            return Err(MerkleError::InvalidProof("proof too long"));
        }
        if fn_ & 1 == 1 || fn_ == sn {
            fr = node_hash(*c, fr);
            sr = node_hash(*c, sr);
            while fn_ & 1 == 0 && fn_ != 0 {
                fn_ >>= 1;
                sn >>= 1;
            }
        } else {
            sr = node_hash(sr, *c);
        }
        fn_ >>= 1;
        sn >>= 1;
    }

    if sn != 0 {
        return Err(MerkleError::InvalidProof("proof too short"));
    }
    if fr != root1 {
        return Err(MerkleError::InvalidProof("old root mismatch"));
    }
    if sr != root2 {
        return Err(MerkleError::InvalidProof("new root mismatch"));
    }
    Ok(())
}

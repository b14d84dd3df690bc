// Ported from "mod" (https://pkg.go.dev/golang.org/x/mod)
// Copyright 2009 The Go Authors
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause
//
// This ports code from the original Go project "mod" and adapts it to Rust idioms.
//
// Modifications and Rust implementation Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! An append-only Merkle tree that keeps every complete subtree hash in memory.
//!
//! Hashes are laid out in the dense "stored hash" order described in section
//! 3.3 of Crosby and Wallach's paper ["Efficient Data Structures for
//! Tamper-Evident Logging"](https://www.usenix.org/legacy/event/sec09/tech/full_papers/crosby.pdf),
//! so the hash of any tree prefix can be rebuilt from at most `1 + log₂ n`
//! stored hashes.
//!
//! The stored hash layout is ported from [tlog](https://pkg.go.dev/golang.org/x/mod/sumdb/tlog).
//!
//! References:
//! - [tlog.go](https://cs.opensource.google/go/x/mod/+/refs/tags/v0.21.0:sumdb/tlog/tlog.go)

use crate::{hash::maxpow2, leaf_hash, node_hash, Hash, MerkleError, EMPTY_HASH};

/// Maps the tree coordinates `(level, n)` to a dense linear ordering that can
/// be used for hash storage.
pub fn stored_hash_index(level: u8, n: u64) -> u64 {
    // Level L's n'th hash is written right after level L+1's 2n+1'th hash.
    // Work our way down to the level 0 ordering.
    // We'll add back the original level count at the end.
    let mut n = n;
    for _ in 0..level {
        n = 2 * n + 1;
    }

    // Level 0's n'th hash is written at n+n/2+n/4+... (eventually n/2ⁱ hits zero).
    let mut i = 0;
    while n > 0 {
        i += n;
        n >>= 1;
    }

    i + u64::from(level)
}

/// Returns the number of stored hashes that are expected for a tree with `n` leaves.
pub fn stored_hash_count(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let mut num_hash = stored_hash_index(0, n - 1) + 1;
    let mut i = n - 1;
    while i & 1 != 0 {
        num_hash += 1;
        i >>= 1;
    }
    num_hash
}

/// A `MemoryTree` is an in-memory Merkle tree over appended leaves.
#[derive(Clone, Debug, Default)]
pub struct MemoryTree {
    size: u64,
    hashes: Vec<Hash>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of leaves in the tree.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Appends a leaf with the given data, returning its index.
    pub fn append(&mut self, data: &[u8]) -> u64 {
        self.append_hash(leaf_hash(data))
    }

    /// Appends a leaf whose Merkle leaf hash has already been computed,
    /// returning its index.
    pub fn append_hash(&mut self, h: Hash) -> u64 {
        let n = self.size;
        let mut h = h;
        self.hashes.push(h);

        // Each trailing 1 bit in the binary representation of n completes a
        // subtree and consumes a hash from the adjacent subtree on its left.
        for level in 0..(n + 1).trailing_zeros() {
            let level = level as u8;
            h = node_hash(self.stored(level, (n >> level) - 1), h);
            self.hashes.push(h);
        }
        self.size += 1;
        debug_assert_eq!(self.hashes.len() as u64, stored_hash_count(self.size));
        n
    }

    /// Returns the Merkle leaf hash of the leaf at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is not in the tree.
    pub fn leaf_hash_at(&self, index: u64) -> Result<Hash, MerkleError> {
        if index >= self.size {
            return Err(MerkleError::IndexNotInTree {
                index,
                size: self.size,
            });
        }
        Ok(self.stored(0, index))
    }

    /// Returns the root hash of the current tree.
    pub fn root(&self) -> Hash {
        if self.size == 0 {
            return EMPTY_HASH;
        }
        self.subtree_hash(0, self.size)
    }

    /// Returns the root hash of the tree made of the first `size` leaves.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is larger than the tree.
    pub fn root_at(&self, size: u64) -> Result<Hash, MerkleError> {
        self.check_size(size)?;
        if size == 0 {
            return Ok(EMPTY_HASH);
        }
        Ok(self.subtree_hash(0, size))
    }

    /// Returns the audit path proving that leaf `index` is included in the
    /// tree of size `size`.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is larger than the tree or `index >= size`.
    pub fn prove_inclusion(&self, index: u64, size: u64) -> Result<Vec<Hash>, MerkleError> {
        self.check_size(size)?;
        if index >= size {
            return Err(MerkleError::IndexNotInTree { index, size });
        }
        let mut proof = Vec::new();
        self.inclusion_path(0, size, index, &mut proof);
        Ok(proof)
    }

    /// Returns the proof that the tree of size `size2` contains as a prefix
    /// all the leaves of the tree of size `size1`.
    ///
    /// # Errors
    ///
    /// Returns an error unless `1 <= size1 <= size2 <= self.size()`.
    pub fn prove_consistency(&self, size1: u64, size2: u64) -> Result<Vec<Hash>, MerkleError> {
        self.check_size(size2)?;
        if !(1..=size2).contains(&size1) {
            return Err(MerkleError::InvalidInput("1 <= size1 <= size2".into()));
        }
        let mut proof = Vec::new();
        self.consistency_path(0, size2, size1, &mut proof);
        Ok(proof)
    }

    fn check_size(&self, size: u64) -> Result<(), MerkleError> {
        if size > self.size {
            return Err(MerkleError::InvalidInput(format!(
                "tree size {size} > {}",
                self.size
            )));
        }
        Ok(())
    }

    fn stored(&self, level: u8, n: u64) -> Hash {
        self.hashes[stored_hash_index(level, n) as usize]
    }

    // Hash of the subtree over leaves [lo, hi). The range is split into a run
    // of complete subtrees of decreasing size, each of which is stored.
    fn subtree_hash(&self, lo: u64, hi: u64) -> Hash {
        let mut complete = Vec::new();
        let mut lo = lo;
        while lo < hi {
            let (k, level) = maxpow2(hi - lo + 1);
            assert!(lo & (k - 1) == 0, "bad math in subtree_hash");
            complete.push(self.stored(level, lo >> level));
            lo += k;
        }
        let mut complete = complete.into_iter().rev();
        let Some(mut h) = complete.next() else {
            return EMPTY_HASH;
        };
        for left in complete {
            h = node_hash(left, h);
        }
        h
    }

    // Appends the audit path for leaf n within [lo, hi), deepest sibling first.
    // See https://tools.ietf.org/html/rfc6962#section-2.1.1
    fn inclusion_path(&self, lo: u64, hi: u64, n: u64, proof: &mut Vec<Hash>) {
        if lo + 1 == hi {
            return;
        }
        let (k, _) = maxpow2(hi - lo);
        if n < lo + k {
            self.inclusion_path(lo, lo + k, n, proof);
            proof.push(self.subtree_hash(lo + k, hi));
        } else {
            self.inclusion_path(lo + k, hi, n, proof);
            proof.push(self.subtree_hash(lo, lo + k));
        }
    }

    // Appends the consistency sub-proof for the old tree of n leaves within
    // the subtree [lo, hi).
    // See https://tools.ietf.org/html/rfc6962#section-2.1.2
    fn consistency_path(&self, lo: u64, hi: u64, n: u64, proof: &mut Vec<Hash>) {
        if n == hi {
            // The verifier already knows the old root.
            if lo != 0 {
                proof.push(self.subtree_hash(lo, hi));
            }
            return;
        }
        let (k, _) = maxpow2(hi - lo);
        if n <= lo + k {
            self.consistency_path(lo, lo + k, n, proof);
            proof.push(self.subtree_hash(lo + k, hi));
        } else {
            self.consistency_path(lo + k, hi, n, proof);
            proof.push(self.subtree_hash(lo, lo + k));
        }
    }
}

impl<D: AsRef<[u8]>> FromIterator<D> for MemoryTree {
    fn from_iter<I: IntoIterator<Item = D>>(iter: I) -> Self {
        let mut tree = MemoryTree::new();
        for data in iter {
            tree.append(data.as_ref());
        }
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{verify_consistency, verify_inclusion};
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    // MTH from RFC 6962 section 2.1, computed straight from the definition.
    fn reference_root(leaves: &[Hash]) -> Hash {
        match leaves.len() {
            0 => EMPTY_HASH,
            1 => leaves[0],
            n => {
                let (k, _) = maxpow2(n as u64);
                let k = k as usize;
                node_hash(reference_root(&leaves[..k]), reference_root(&leaves[k..]))
            }
        }
    }

    fn leaves(n: u64) -> Vec<Vec<u8>> {
        (0..n).map(|i| format!("leaf {i}").into_bytes()).collect()
    }

    #[test]
    fn test_roots_match_definition() {
        let data = leaves(70);
        let tree: MemoryTree = data.iter().collect();
        let hashes: Vec<Hash> = data.iter().map(|d| leaf_hash(d)).collect();
        for size in 0..=70 {
            assert_eq!(
                tree.root_at(size).unwrap(),
                reference_root(&hashes[..size as usize]),
                "size {size}"
            );
        }
        assert_eq!(tree.root(), reference_root(&hashes));
        assert!(tree.root_at(71).is_err());
    }

    #[test]
    fn test_stored_hash_count() {
        let mut tree = MemoryTree::new();
        for i in 0..100 {
            assert_eq!(tree.append(format!("{i}").as_bytes()), i);
            assert_eq!(tree.hashes.len() as u64, stored_hash_count(i + 1));
        }
    }

    #[test]
    fn test_leaf_hash_at() {
        let data = leaves(13);
        let tree: MemoryTree = data.iter().collect();
        for (i, d) in data.iter().enumerate() {
            assert_eq!(tree.leaf_hash_at(i as u64).unwrap(), leaf_hash(d));
        }
        assert_eq!(
            tree.leaf_hash_at(13),
            Err(MerkleError::IndexNotInTree { index: 13, size: 13 })
        );
    }

    #[test]
    fn test_inclusion_proofs() {
        let tree: MemoryTree = leaves(40).iter().collect();
        for size in 1..=40 {
            let root = tree.root_at(size).unwrap();
            for index in 0..size {
                let leaf = tree.leaf_hash_at(index).unwrap();
                let mut proof = tree.prove_inclusion(index, size).unwrap();
                verify_inclusion(index, size, leaf, &proof, root).unwrap();

                for k in 0..proof.len() {
                    proof[k].0[0] ^= 1;
                    assert!(
                        verify_inclusion(index, size, leaf, &proof, root).is_err(),
                        "verify_inclusion({index}, {size}) succeeded with corrupt proof hash #{k}"
                    );
                    proof[k].0[0] ^= 1;
                }
            }
            assert!(tree.prove_inclusion(size, size).is_err());
        }
    }

    #[test]
    fn test_consistency_proofs() {
        let tree: MemoryTree = leaves(40).iter().collect();
        for size2 in 1..=40 {
            let root2 = tree.root_at(size2).unwrap();
            for size1 in 1..=size2 {
                let root1 = tree.root_at(size1).unwrap();
                let mut proof = tree.prove_consistency(size1, size2).unwrap();
                verify_consistency(size1, size2, &proof, root1, root2).unwrap();

                for k in 0..proof.len() {
                    proof[k].0[0] ^= 1;
                    assert!(
                        verify_consistency(size1, size2, &proof, root1, root2).is_err(),
                        "verify_consistency({size1}, {size2}) succeeded with corrupt proof hash #{k}"
                    );
                    proof[k].0[0] ^= 1;
                }
            }
        }
        assert!(tree.prove_consistency(0, 5).is_err());
        assert!(tree.prove_consistency(6, 5).is_err());
        assert!(tree.prove_consistency(5, 41).is_err());
    }

    #[test]
    fn test_random_probes_in_large_tree() {
        let mut rng = SmallRng::seed_from_u64(1);
        let tree: MemoryTree = leaves(3000).iter().collect();
        for _ in 0..200 {
            let size = rng.gen_range(1..=3000);
            let index = rng.gen_range(0..size);
            let proof = tree.prove_inclusion(index, size).unwrap();
            verify_inclusion(
                index,
                size,
                tree.leaf_hash_at(index).unwrap(),
                &proof,
                tree.root_at(size).unwrap(),
            )
            .unwrap();

            let old = rng.gen_range(1..=size);
            let proof = tree.prove_consistency(old, size).unwrap();
            verify_consistency(
                old,
                size,
                &proof,
                tree.root_at(old).unwrap(),
                tree.root_at(size).unwrap(),
            )
            .unwrap();
        }
    }
}

// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Merkle tree hashes and proofs computed directly from the recursive
//! definitions in [RFC 6962 section 2.1](https://tools.ietf.org/html/rfc6962#section-2.1).
//!
//! Nothing is cached: every call walks the leaf hashes it covers. That keeps
//! this implementation independent of the stored-hash layout clients use to
//! check it.

use sha2::{Digest, Sha256};

pub(crate) type Digest32 = [u8; 32];

pub(crate) fn leaf_hash(data: &[u8]) -> Digest32 {
    Sha256::new()
        .chain_update([0x00])
        .chain_update(data)
        .finalize()
        .into()
}

fn node_hash(left: &Digest32, right: &Digest32) -> Digest32 {
    Sha256::new()
        .chain_update([0x01])
        .chain_update(left)
        .chain_update(right)
        .finalize()
        .into()
}

// Largest power of two strictly smaller than n, for n > 1.
fn split(n: usize) -> usize {
    debug_assert!(n > 1);
    1 << (n - 1).ilog2()
}

/// MTH(D[n])
pub(crate) fn mth(leaves: &[Digest32]) -> Digest32 {
    match leaves.len() {
        0 => Sha256::digest([]).into(),
        1 => leaves[0],
        n => {
            let k = split(n);
            node_hash(&mth(&leaves[..k]), &mth(&leaves[k..]))
        }
    }
}

/// PATH(m, D[n]), the audit path for leaf m. Requires m < n.
pub(crate) fn path(m: usize, leaves: &[Digest32]) -> Vec<Digest32> {
    let n = leaves.len();
    if n <= 1 {
        return Vec::new();
    }
    let k = split(n);
    let (mut proof, sibling) = if m < k {
        (path(m, &leaves[..k]), mth(&leaves[k..]))
    } else {
        (path(m - k, &leaves[k..]), mth(&leaves[..k]))
    };
    proof.push(sibling);
    proof
}

/// PROOF(m, D[n]), the consistency proof from the tree of m leaves. Requires
/// 0 < m <= n.
pub(crate) fn proof(m: usize, leaves: &[Digest32]) -> Vec<Digest32> {
    subproof(m, leaves, true)
}

fn subproof(m: usize, leaves: &[Digest32], complete: bool) -> Vec<Digest32> {
    let n = leaves.len();
    if m == n {
        return if complete {
            Vec::new()
        } else {
            vec![mth(leaves)]
        };
    }
    let k = split(n);
    let (mut proof, sibling) = if m <= k {
        (subproof(m, &leaves[..k], complete), mth(&leaves[k..]))
    } else {
        (subproof(m - k, &leaves[k..], false), mth(&leaves[..k]))
    };
    proof.push(sibling);
    proof
}

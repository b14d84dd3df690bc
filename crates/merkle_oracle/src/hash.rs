// Ported from "mod" (https://pkg.go.dev/golang.org/x/mod)
// Copyright 2009 The Go Authors
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause
//
// This ports code from the original Go project "mod" and adapts it to Rust idioms.
//
// Modifications and Rust implementation Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! RFC 6962 hashing scheme.
//!
//! This file contains code ported from the original project [tlog](https://pkg.go.dev/golang.org/x/mod/sumdb/tlog).
//!
//! References:
//! - [tlog.go](https://cs.opensource.google/go/x/mod/+/refs/tags/v0.21.0:sumdb/tlog/tlog.go)

use crate::MerkleError;
use sha2::{Digest, Sha256};
use std::fmt;

/// `HASH_SIZE` is the size of a Hash in bytes.
pub const HASH_SIZE: usize = 32;

/// A Hash is a hash identifying a log leaf or tree root.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Hash(pub [u8; HASH_SIZE]);

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Hash {
    type Error = MerkleError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Ok(Hash(
            value
                .try_into()
                .map_err(|_| MerkleError::MalformedHash(value.len()))?,
        ))
    }
}

/// `EMPTY_HASH` is the hash of the empty tree, per RFC 6962, Section 2.1.
/// It is the hash of the empty string.
pub const EMPTY_HASH: Hash = Hash([
    0xe3, 0xb0, 0xc4, 0x42, 0x98, 0xfc, 0x1c, 0x14, 0x9a, 0xfb, 0xf4, 0xc8, 0x99, 0x6f, 0xb9, 0x24,
    0x27, 0xae, 0x41, 0xe4, 0x64, 0x9b, 0x93, 0x4c, 0xa4, 0x95, 0x99, 0x1b, 0x78, 0x52, 0xb8, 0x55,
]);

/// Returns the Merkle leaf hash for the given leaf data.
pub fn leaf_hash(data: &[u8]) -> Hash {
    // SHA256(0x00 || data)
    // https://tools.ietf.org/html/rfc6962#section-2.1
    let mut hasher = Sha256::new();
    hasher.update([0x00]);
    hasher.update(data);
    Hash(hasher.finalize().into())
}

/// Returns the hash for an interior tree node with the given left and right hashes.
pub fn node_hash(left: Hash, right: Hash) -> Hash {
    // SHA256(0x01 || left || right)
    // https://tools.ietf.org/html/rfc6962#section-2.1
    let mut hasher = Sha256::new();
    hasher.update([0x01]);
    hasher.update(left.0);
    hasher.update(right.0);
    Hash(hasher.finalize().into())
}

/// Returns k, the largest power of two strictly smaller than n, along with
/// log₂ k.
///
/// # Panics
///
/// Panics if n <= 1.
pub(crate) fn maxpow2(n: u64) -> (u64, u8) {
    assert!(n > 1, "maxpow2 of {n}");
    let l = (n - 1).ilog2() as u8;
    (1 << l, l)
}

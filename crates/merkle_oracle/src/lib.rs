// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! # merkle oracle
//!
//! An in-memory [RFC 6962](https://tools.ietf.org/html/rfc6962) Merkle tree
//! together with inclusion and consistency proof verification, following the
//! iterative algorithms of [RFC 9162](https://www.rfc-editor.org/rfc/rfc9162#section-2.1.3.2).
//!
//! The tree is meant to be rebuilt from the leaves a log serves and then used
//! as ground truth for the roots and proofs that the log publishes.

pub mod hash;
pub mod tree;
pub mod verify;

pub use hash::*;
pub use tree::*;
pub use verify::*;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MerkleError {
    #[error("invalid proof: {0}")]
    InvalidProof(&'static str),
    #[error("malformed hash: expected {HASH_SIZE} bytes, got {0}")]
    MalformedHash(usize),
    #[error("index {index} not in tree of size {size}")]
    IndexNotInTree { index: u64, size: u64 },
    #[error("unmet input condition: {0}")]
    InvalidInput(String),
}

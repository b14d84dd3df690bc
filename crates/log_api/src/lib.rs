// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! The RPC surface of a verifiable log as consumed by clients: leaves, signed
//! log roots, inclusion and consistency proofs, and the [`LogClient`] trait.

pub mod log_root;
pub mod rpc;
pub mod signer;

pub use log_root::*;
pub use rpc::*;
pub use signer::*;

// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! # log conformance
//!
//! An end-to-end check of a verifiable log. [`run_log_conformance`] writes a
//! seeded, partly duplicated workload to the log, waits for it to be
//! sequenced, reads it back, and rebuilds the tree independently with a
//! [`MerkleOracle`]. It then holds the log's published root, inclusion
//! proofs and consistency proofs against that tree, including requests the
//! log must refuse and requests beyond its published size.
//!
//! The harness talks to the log through [`log_api::LogClient`] and to time
//! through a [`Clock`], so it runs the same against a remote log under
//! [`TokioClock`] and against an in-process log under a [`ManualClock`].

pub mod backoff;
pub mod clock;
pub mod config;
pub mod consistency;
pub mod error;
pub mod inclusion;
pub mod oracle;
pub mod read;
pub mod roots;
mod runner;
pub mod sequencing;
mod session;
pub mod submit;
#[cfg(test)]
mod test_util;
pub mod workload;

pub use backoff::Backoff;
pub use clock::{with_deadline, Clock, ManualClock, TokioClock};
pub use config::{ConfigError, TestParameters};
pub use error::{HarnessError, ProofRequest, ProtocolViolation, TimeoutError};
pub use oracle::{build_reference_tree, MerkleOracle};
pub use runner::{run_log_conformance, RunSummary};
pub use session::Session;

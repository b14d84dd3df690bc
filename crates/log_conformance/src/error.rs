// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

use crate::ConfigError;
use log_api::{Code, LogRootError, RpcError};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The terminal failure of a conformance run.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{method} failed: {source}")]
    Service {
        method: &'static str,
        #[source]
        source: RpcError,
    },
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),
    #[error("timeout: {0}")]
    Timeout(#[from] TimeoutError),
    #[error("reference tree: {0}")]
    Oracle(String),
}

impl HarnessError {
    /// Classifies an error returned for `method`. A deadline expiry is a
    /// timeout, anything else a service error.
    pub(crate) fn rpc(method: &'static str, deadline: Duration, err: RpcError) -> Self {
        if err.code == Code::DeadlineExceeded {
            TimeoutError::RpcDeadline {
                method,
                deadline,
                message: err.message,
            }
            .into()
        } else {
            HarnessError::Service {
                method,
                source: err,
            }
        }
    }

    pub(crate) fn oracle(err: impl std::error::Error) -> Self {
        HarnessError::Oracle(err.to_string())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, HarnessError::Timeout(_))
    }

    pub fn protocol_violation(&self) -> Option<&ProtocolViolation> {
        match self {
            HarnessError::Protocol(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimeoutError {
    #[error("leaves not sequenced in time: tree size {tree_size} < {want} after waiting {waited:?}")]
    NotSequenced {
        want: u64,
        tree_size: u64,
        waited: Duration,
    },
    #[error("{method} did not complete within {deadline:?}: {message}")]
    RpcDeadline {
        method: &'static str,
        deadline: Duration,
        message: String,
    },
}

/// A proof request issued to the log.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProofRequest {
    Inclusion { leaf_index: i64, tree_size: i64 },
    Consistency { first: i64, second: i64 },
}

impl fmt::Display for ProofRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProofRequest::Inclusion {
                leaf_index,
                tree_size,
            } => write!(
                f,
                "GetInclusionProof(index: {leaf_index}, tree size: {tree_size})"
            ),
            ProofRequest::Consistency { first, second } => {
                write!(f, "GetConsistencyProof({first}, {second})")
            }
        }
    }
}

/// Behaviour of the log that contradicts what a verifiable log must do.
#[derive(Error, Debug)]
pub enum ProtocolViolation {
    #[error("expected an empty log, got tree size {tree_size}")]
    LogNotEmpty { tree_size: u64 },
    #[error("bad log root: {0}")]
    MalformedLogRoot(#[from] LogRootError),
    #[error("reading {want} leaves from index {start}: got {got}")]
    ShortRead { start: u64, want: u64, got: u64 },
    #[error("leaf at position {position} has index {got}, want {position}")]
    LeafIndexMismatch { position: u64, got: i64 },
    #[error("leaf {index} hash mismatch: got {}, want {}", hex::encode(.got), hex::encode(.want))]
    LeafHashMismatch {
        index: u64,
        got: Vec<u8>,
        want: Vec<u8>,
    },
    #[error("leaf {index} extra data mismatch: got {:?}, want {:?}", String::from_utf8_lossy(.got), String::from_utf8_lossy(.want))]
    ExtraDataMismatch {
        index: u64,
        got: Vec<u8>,
        want: Vec<u8>,
    },
    #[error("leaf values read back differ from those written (-want +got): {}", format_diff(.diff))]
    LeafValueMismatch { diff: Vec<(String, i64)> },
    #[error("root hash mismatch: log has {} at size {log_size}, reference tree has {} at size {tree_size}", hex::encode(.got), hex::encode(.want))]
    RootHashMismatch {
        log_size: u64,
        tree_size: u64,
        got: Vec<u8>,
        want: Vec<u8>,
    },
    #[error("log answered {request}, which it must refuse")]
    UnexpectedProof { request: ProofRequest },
    #[error("log refused {request}: {source}")]
    MissingProof {
        request: ProofRequest,
        #[source]
        source: RpcError,
    },
    #[error("log answered {request} without a proof at tree size {tree_size}")]
    EmptyProof {
        request: ProofRequest,
        tree_size: u64,
    },
    #[error("log returned {count} proof hashes for skewed {request}")]
    SkewProofReturned { request: ProofRequest, count: usize },
    #[error("log returned root at size {returned} for skewed {request}, want a smaller size")]
    SkewRootTooLarge {
        request: ProofRequest,
        returned: u64,
    },
    #[error("{request}: requested tree size {requested} > available tree size {available}")]
    TreeSizeBeyondHead {
        request: ProofRequest,
        requested: i64,
        available: u64,
    },
    #[error("proof for {request} does not verify: {reason}")]
    InvalidProof {
        request: ProofRequest,
        reason: String,
    },
}

fn format_diff(diff: &[(String, i64)]) -> String {
    diff.iter()
        .map(|(value, n)| format!("{value:?}: {n:+}"))
        .collect::<Vec<_>>()
        .join(", ")
}

// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Request and response messages of the log RPC surface, and the client trait
//! used to issue them.
//!
//! Leaf indices and tree sizes in requests are signed so that clients can
//! express (and logs must reject) negative values.

use serde::{Deserialize, Serialize};
use serde_with::base64::Base64;
use serde_with::serde_as;
use std::fmt;
use thiserror::Error;

/// Status codes a log can answer a request with.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Code {
    InvalidArgument,
    NotFound,
    OutOfRange,
    FailedPrecondition,
    DeadlineExceeded,
    Unavailable,
    ResourceExhausted,
    Aborted,
    Internal,
    Unknown,
}

impl Code {
    /// Returns whether a request that failed with this code may succeed if
    /// retried unchanged.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Code::Unavailable
                | Code::ResourceExhausted
                | Code::Aborted
                | Code::Internal
                | Code::Unknown
        )
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Code::InvalidArgument => "InvalidArgument",
            Code::NotFound => "NotFound",
            Code::OutOfRange => "OutOfRange",
            Code::FailedPrecondition => "FailedPrecondition",
            Code::DeadlineExceeded => "DeadlineExceeded",
            Code::Unavailable => "Unavailable",
            Code::ResourceExhausted => "ResourceExhausted",
            Code::Aborted => "Aborted",
            Code::Internal => "Internal",
            Code::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// An error status returned by the log, or produced locally for a call that
/// did not complete.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct RpcError {
    pub code: Code,
    pub message: String,
}

impl RpcError {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Code::InvalidArgument, message)
    }

    pub fn deadline_exceeded() -> Self {
        Self::new(Code::DeadlineExceeded, "deadline exceeded")
    }
}

/// A log leaf. `leaf_index` and `merkle_leaf_hash` are assigned by the log.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLeaf {
    #[serde_as(as = "Base64")]
    pub leaf_value: Vec<u8>,
    #[serde_as(as = "Base64")]
    pub extra_data: Vec<u8>,
    #[serde(default)]
    pub leaf_index: i64,
    #[serde_as(as = "Base64")]
    #[serde(default)]
    pub merkle_leaf_hash: Vec<u8>,
}

impl LogLeaf {
    /// Returns a leaf to be queued, with no log-assigned fields set.
    pub fn new(leaf_value: Vec<u8>, extra_data: Vec<u8>) -> Self {
        Self {
            leaf_value,
            extra_data,
            ..Default::default()
        }
    }
}

/// An encoded [`LogRootV1`](crate::LogRootV1) and the log's signature over it.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedLogRoot {
    #[serde_as(as = "Base64")]
    pub log_root: Vec<u8>,
    #[serde_as(as = "Base64")]
    pub log_root_signature: Vec<u8>,
}

/// Proof hashes, ordered from the leaf (or old tree) towards the root.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub leaf_index: i64,
    #[serde_as(as = "Vec<Base64>")]
    pub hashes: Vec<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetLatestSignedLogRootRequest {
    pub log_id: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetLatestSignedLogRootResponse {
    pub signed_log_root: SignedLogRoot,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueLeafRequest {
    pub log_id: i64,
    pub leaf: LogLeaf,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueLeafResponse {
    pub queued_leaf: LogLeaf,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetLeavesByRangeRequest {
    pub log_id: i64,
    pub start_index: i64,
    pub count: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetLeavesByRangeResponse {
    pub leaves: Vec<LogLeaf>,
    pub signed_log_root: SignedLogRoot,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetInclusionProofRequest {
    pub log_id: i64,
    pub leaf_index: i64,
    pub tree_size: i64,
}

/// `proof` is absent when the log answers a request for a tree size it has
/// not yet published; `signed_log_root` then describes its actual state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetInclusionProofResponse {
    pub proof: Option<Proof>,
    pub signed_log_root: SignedLogRoot,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetConsistencyProofRequest {
    pub log_id: i64,
    pub first_tree_size: i64,
    pub second_tree_size: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetConsistencyProofResponse {
    pub proof: Option<Proof>,
    pub signed_log_root: SignedLogRoot,
}

/// A client for a verifiable log service.
pub trait LogClient {
    /// Returns the most recently published log root.
    ///
    /// # Errors
    ///
    /// Returns the status the log answered with.
    #[allow(async_fn_in_trait)]
    async fn get_latest_signed_log_root(
        &self,
        req: GetLatestSignedLogRootRequest,
    ) -> Result<GetLatestSignedLogRootResponse, RpcError>;

    /// Submits a leaf for sequencing.
    ///
    /// # Errors
    ///
    /// Returns the status the log answered with.
    #[allow(async_fn_in_trait)]
    async fn queue_leaf(&self, req: QueueLeafRequest) -> Result<QueueLeafResponse, RpcError>;

    /// Returns up to `count` sequenced leaves starting at `start_index`.
    ///
    /// # Errors
    ///
    /// Returns the status the log answered with.
    #[allow(async_fn_in_trait)]
    async fn get_leaves_by_range(
        &self,
        req: GetLeavesByRangeRequest,
    ) -> Result<GetLeavesByRangeResponse, RpcError>;

    /// Returns an inclusion proof for a leaf index at a tree size.
    ///
    /// # Errors
    ///
    /// Returns the status the log answered with.
    #[allow(async_fn_in_trait)]
    async fn get_inclusion_proof(
        &self,
        req: GetInclusionProofRequest,
    ) -> Result<GetInclusionProofResponse, RpcError>;

    /// Returns a consistency proof between two tree sizes.
    ///
    /// # Errors
    ///
    /// Returns the status the log answered with.
    #[allow(async_fn_in_trait)]
    async fn get_consistency_proof(
        &self,
        req: GetConsistencyProofRequest,
    ) -> Result<GetConsistencyProofResponse, RpcError>;
}

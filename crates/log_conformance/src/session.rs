// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

use crate::{
    clock::{with_deadline, Clock},
    HarnessError, ProofRequest, ProtocolViolation, TestParameters,
};
use log_api::{
    GetLatestSignedLogRootRequest, LogClient, LogRootV1, RootVerifier, RpcError, SignedLogRoot,
};
use std::future::Future;

pub(crate) const GET_LATEST_SIGNED_LOG_ROOT: &str = "GetLatestSignedLogRoot";
pub(crate) const QUEUE_LEAF: &str = "QueueLeaf";
pub(crate) const GET_LEAVES_BY_RANGE: &str = "GetLeavesByRange";
pub(crate) const GET_INCLUSION_PROOF: &str = "GetInclusionProof";
pub(crate) const GET_CONSISTENCY_PROOF: &str = "GetConsistencyProof";

/// The log under test together with the capabilities and parameters a run
/// uses to talk to it.
pub struct Session<'a, C, K> {
    pub(crate) client: &'a C,
    pub(crate) clock: &'a K,
    pub(crate) params: &'a TestParameters,
    verifier: Option<RootVerifier>,
}

impl<'a, C: LogClient, K: Clock> Session<'a, C, K> {
    /// Creates a session after validating `params`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the parameters are inconsistent.
    pub fn new(
        client: &'a C,
        clock: &'a K,
        params: &'a TestParameters,
    ) -> Result<Self, HarnessError> {
        params.validate()?;
        Ok(Self {
            client,
            clock,
            params,
            verifier: params.root_verifier()?,
        })
    }

    pub fn params(&self) -> &TestParameters {
        self.params
    }

    pub(crate) fn tree_id(&self) -> i64 {
        self.params.tree_id
    }

    /// Runs one request under the per-call deadline, without classifying its
    /// failure.
    pub(crate) async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, RpcError>>,
    ) -> Result<T, RpcError> {
        with_deadline(self.clock, self.params.rpc_request_deadline, fut).await
    }

    /// Runs one request under the per-call deadline.
    pub(crate) async fn rpc<T>(
        &self,
        method: &'static str,
        fut: impl Future<Output = Result<T, RpcError>>,
    ) -> Result<T, HarnessError> {
        self.call(fut).await.map_err(|e| self.rpc_error(method, e))
    }

    pub(crate) fn rpc_error(&self, method: &'static str, err: RpcError) -> HarnessError {
        HarnessError::rpc(method, self.params.rpc_request_deadline, err)
    }

    /// Classifies the result of a proof request the log must answer. A
    /// refusal is a protocol violation, a deadline expiry a timeout.
    pub(crate) fn require_answer<T>(
        &self,
        method: &'static str,
        request: ProofRequest,
        result: Result<T, RpcError>,
    ) -> Result<T, HarnessError> {
        result.map_err(|e| match self.rpc_error(method, e) {
            HarnessError::Service { source, .. } => {
                ProtocolViolation::MissingProof { request, source }.into()
            }
            other => other,
        })
    }

    /// Checks the signature on `signed`, if a log key is configured, and
    /// decodes the root.
    pub(crate) fn decode_root(
        &self,
        signed: &SignedLogRoot,
    ) -> Result<LogRootV1, ProtocolViolation> {
        let root = match &self.verifier {
            Some(verifier) => verifier.verify(signed)?,
            None => LogRootV1::from_bytes(&signed.log_root)?,
        };
        Ok(root)
    }

    /// Fetches and decodes the latest log root.
    pub(crate) async fn latest_root(&self) -> Result<LogRootV1, HarnessError> {
        let resp = self
            .rpc(
                GET_LATEST_SIGNED_LOG_ROOT,
                self.client
                    .get_latest_signed_log_root(GetLatestSignedLogRootRequest {
                        log_id: self.tree_id(),
                    }),
            )
            .await?;
        Ok(self.decode_root(&resp.signed_log_root)?)
    }
}

/// Converts a count or index to the signed form used in requests, saturating
/// at `i64::MAX`.
pub(crate) fn to_request(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

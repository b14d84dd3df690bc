// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! A log that passes every request to a [`MemoryLog`] and lets tests rewrite
//! the proof answers.

use log_api::{
    GetConsistencyProofRequest, GetConsistencyProofResponse, GetInclusionProofRequest,
    GetInclusionProofResponse, GetLatestSignedLogRootRequest, GetLatestSignedLogRootResponse,
    GetLeavesByRangeRequest, GetLeavesByRangeResponse, LogClient, QueueLeafRequest,
    QueueLeafResponse, RpcError, SignedLogRoot,
};
use memory_log::MemoryLog;

type Rewrite<Req, Resp> =
    fn(&Req, Result<Resp, RpcError>, SignedLogRoot) -> Result<Resp, RpcError>;

pub(crate) struct RewritingLog {
    pub inner: MemoryLog,
    pub inclusion: Rewrite<GetInclusionProofRequest, GetInclusionProofResponse>,
    pub consistency: Rewrite<GetConsistencyProofRequest, GetConsistencyProofResponse>,
}

impl RewritingLog {
    pub fn new(inner: MemoryLog) -> Self {
        Self {
            inner,
            inclusion: |_, resp, _| resp,
            consistency: |_, resp, _| resp,
        }
    }

    async fn published(&self, log_id: i64) -> Result<SignedLogRoot, RpcError> {
        Ok(self
            .inner
            .get_latest_signed_log_root(GetLatestSignedLogRootRequest { log_id })
            .await?
            .signed_log_root)
    }
}

impl LogClient for RewritingLog {
    async fn get_latest_signed_log_root(
        &self,
        req: GetLatestSignedLogRootRequest,
    ) -> Result<GetLatestSignedLogRootResponse, RpcError> {
        self.inner.get_latest_signed_log_root(req).await
    }

    async fn queue_leaf(&self, req: QueueLeafRequest) -> Result<QueueLeafResponse, RpcError> {
        self.inner.queue_leaf(req).await
    }

    async fn get_leaves_by_range(
        &self,
        req: GetLeavesByRangeRequest,
    ) -> Result<GetLeavesByRangeResponse, RpcError> {
        self.inner.get_leaves_by_range(req).await
    }

    async fn get_inclusion_proof(
        &self,
        req: GetInclusionProofRequest,
    ) -> Result<GetInclusionProofResponse, RpcError> {
        let root = self.published(req.log_id).await?;
        let resp = self.inner.get_inclusion_proof(req.clone()).await;
        (self.inclusion)(&req, resp, root)
    }

    async fn get_consistency_proof(
        &self,
        req: GetConsistencyProofRequest,
    ) -> Result<GetConsistencyProofResponse, RpcError> {
        let root = self.published(req.log_id).await?;
        let resp = self.inner.get_consistency_proof(req.clone()).await;
        (self.consistency)(&req, resp, root)
    }
}

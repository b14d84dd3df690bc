// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! A log client that wraps a [`MemoryLog`] and misbehaves in one chosen way.

use log_api::{
    Code, GetConsistencyProofRequest, GetConsistencyProofResponse, GetInclusionProofRequest,
    GetInclusionProofResponse, GetLatestSignedLogRootRequest, GetLatestSignedLogRootResponse,
    GetLeavesByRangeRequest, GetLeavesByRangeResponse, LogClient, LogRootV1, Proof,
    QueueLeafRequest, QueueLeafResponse, RpcError, SignedLogRoot,
};
use log_conformance::{workload::extra_data_for, TestParameters};
use memory_log::{MemoryLog, MemoryLogConfig};

pub const LOG_ID: i64 = 77;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tamper {
    None,
    /// Drop the last leaf of the final window of a read.
    DropLastLeaf,
    FlipLeafHash(i64),
    WrongExtraData(i64),
    /// Replace a leaf's value, with a matching hash and extra data.
    ReplaceLeafValue(i64),
    /// Corrupt the root hash of every non-empty published root.
    WrongRootHash,
    /// Answer inclusion requests with `index >= tree_size`.
    ServeOutOfRangeInclusion,
    /// Refuse inclusion requests beyond the published size.
    RefuseSkewedInclusion,
    /// Include proof hashes in answers beyond the published size.
    ProofForSkewedInclusion,
    /// Report the requested size in answers beyond the published size.
    InflateSkewedRoot,
    CorruptInclusionProof,
    /// Answer consistency requests between equal sizes, even zero.
    ServeEqualSizeConsistency,
    CorruptConsistencyProof,
    /// Never answer leaf reads.
    HangLeafReads,
}

pub struct TamperingLog {
    pub inner: MemoryLog,
    tamper: Tamper,
}

impl TamperingLog {
    pub fn new(sequencer_batch_size: usize, tamper: Tamper) -> Self {
        Self {
            inner: MemoryLog::new(MemoryLogConfig {
                sequencer_batch_size,
                ..MemoryLogConfig::new(LOG_ID)
            }),
            tamper,
        }
    }
}

fn rewrite_root(signed: &SignedLogRoot, f: impl FnOnce(&mut LogRootV1)) -> SignedLogRoot {
    let mut root = LogRootV1::from_bytes(&signed.log_root).unwrap();
    f(&mut root);
    SignedLogRoot {
        log_root: root.to_bytes().unwrap(),
        log_root_signature: signed.log_root_signature.clone(),
    }
}

fn flip_first_hash(proof: &mut Option<Proof>) {
    if let Some(h) = proof.as_mut().and_then(|p| p.hashes.first_mut()) {
        h[0] ^= 1;
    }
}

impl LogClient for TamperingLog {
    async fn get_latest_signed_log_root(
        &self,
        req: GetLatestSignedLogRootRequest,
    ) -> Result<GetLatestSignedLogRootResponse, RpcError> {
        let mut resp = self.inner.get_latest_signed_log_root(req).await?;
        if self.tamper == Tamper::WrongRootHash && self.inner.published_size() > 0 {
            resp.signed_log_root = rewrite_root(&resp.signed_log_root, |r| r.root_hash[0] ^= 1);
        }
        Ok(resp)
    }

    async fn queue_leaf(&self, req: QueueLeafRequest) -> Result<QueueLeafResponse, RpcError> {
        self.inner.queue_leaf(req).await
    }

    async fn get_leaves_by_range(
        &self,
        req: GetLeavesByRangeRequest,
    ) -> Result<GetLeavesByRangeResponse, RpcError> {
        if self.tamper == Tamper::HangLeafReads {
            return std::future::pending().await;
        }
        let mut resp = self.inner.get_leaves_by_range(req).await?;
        let published = self.inner.published_size() as i64;
        for leaf in &mut resp.leaves {
            match self.tamper {
                Tamper::FlipLeafHash(i) if leaf.leaf_index == i => leaf.merkle_leaf_hash[0] ^= 1,
                Tamper::WrongExtraData(i) if leaf.leaf_index == i => {
                    leaf.extra_data = b"Wrong".to_vec();
                }
                Tamper::ReplaceLeafValue(i) if leaf.leaf_index == i => {
                    leaf.leaf_value = b"Leaf 999999".to_vec();
                    leaf.extra_data = extra_data_for(&leaf.leaf_value);
                    leaf.merkle_leaf_hash = merkle_oracle::leaf_hash(&leaf.leaf_value).0.to_vec();
                }
                _ => {}
            }
        }
        if self.tamper == Tamper::DropLastLeaf
            && resp.leaves.last().map(|l| l.leaf_index) == Some(published - 1)
        {
            resp.leaves.pop();
        }
        Ok(resp)
    }

    async fn get_inclusion_proof(
        &self,
        req: GetInclusionProofRequest,
    ) -> Result<GetInclusionProofResponse, RpcError> {
        let published = self.inner.published_size() as i64;
        let skewed = req.tree_size > published;
        match self.tamper {
            Tamper::ServeOutOfRangeInclusion
                if req.tree_size > 0 && req.leaf_index >= req.tree_size && !skewed =>
            {
                let resp = self
                    .inner
                    .get_latest_signed_log_root(GetLatestSignedLogRootRequest {
                        log_id: req.log_id,
                    })
                    .await?;
                return Ok(GetInclusionProofResponse {
                    proof: Some(Proof {
                        leaf_index: req.leaf_index,
                        hashes: Vec::new(),
                    }),
                    signed_log_root: resp.signed_log_root,
                });
            }
            Tamper::RefuseSkewedInclusion if skewed => {
                return Err(RpcError::new(Code::OutOfRange, "tree size beyond head"));
            }
            _ => {}
        }
        let tree_size = req.tree_size;
        let mut resp = self.inner.get_inclusion_proof(req).await?;
        match self.tamper {
            Tamper::ProofForSkewedInclusion if skewed => {
                resp.proof = Some(Proof {
                    leaf_index: 0,
                    hashes: vec![vec![0; 32]],
                });
            }
            Tamper::InflateSkewedRoot if skewed => {
                resp.signed_log_root =
                    rewrite_root(&resp.signed_log_root, |r| r.tree_size = tree_size as u64);
            }
            Tamper::CorruptInclusionProof => flip_first_hash(&mut resp.proof),
            _ => {}
        }
        Ok(resp)
    }

    async fn get_consistency_proof(
        &self,
        req: GetConsistencyProofRequest,
    ) -> Result<GetConsistencyProofResponse, RpcError> {
        if self.tamper == Tamper::ServeEqualSizeConsistency
            && req.first_tree_size == req.second_tree_size
            && req.first_tree_size >= 0
        {
            let resp = self
                .inner
                .get_latest_signed_log_root(GetLatestSignedLogRootRequest {
                    log_id: req.log_id,
                })
                .await?;
            return Ok(GetConsistencyProofResponse {
                proof: Some(Proof::default()),
                signed_log_root: resp.signed_log_root,
            });
        }
        let mut resp = self.inner.get_consistency_proof(req).await?;
        if self.tamper == Tamper::CorruptConsistencyProof {
            flip_first_hash(&mut resp.proof);
        }
        Ok(resp)
    }
}

/// Parameters for a run small enough to repeat for every kind of tampering.
pub fn small_params() -> TestParameters {
    TestParameters {
        leaf_count: 200,
        unique_leaves: 0,
        queue_batch_size: 20,
        sequencer_batch_size: 50,
        read_batch_size: 25,
        permutation_seed: Some(7),
        ..TestParameters::new(LOG_ID)
    }
}

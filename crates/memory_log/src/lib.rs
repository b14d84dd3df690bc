// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! An in-process verifiable log.
//!
//! Leaves are queued into a pending pool and integrated by a sequencer in
//! batches of at most `sequencer_batch_size`, with a new signed log root
//! published after every batch. Reads and proofs are served against the
//! published tree only, so requests for larger tree sizes are answered with
//! the log's actual state (skew) rather than an error.

mod merkle;

use ed25519_dalek::SigningKey;
use log::debug;
use log_api::{
    Code, GetConsistencyProofRequest, GetConsistencyProofResponse, GetInclusionProofRequest,
    GetInclusionProofResponse, GetLatestSignedLogRootRequest, GetLatestSignedLogRootResponse,
    GetLeavesByRangeRequest, GetLeavesByRangeResponse, LogClient, LogLeaf, LogRootV1, Proof,
    QueueLeafRequest, QueueLeafResponse, RootSigner, RootVerifier, RpcError, SignedLogRoot,
};
use merkle::Digest32;
use rand::rngs::OsRng;
use std::{
    cell::RefCell,
    collections::VecDeque,
    time::{SystemTime, UNIX_EPOCH},
};

/// When the sequencer runs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SequencingMode {
    /// One sequencing pass before answering each latest-root request, so a
    /// polling client sees the log grow one batch at a time.
    OnRootFetch,
    /// Only when [`MemoryLog::sequence`] is called.
    Manual,
}

/// Configuration for a [`MemoryLog`].
#[derive(Clone, Debug)]
pub struct MemoryLogConfig {
    pub log_id: i64,
    pub sequencer_batch_size: usize,
    pub sequencing_mode: SequencingMode,
}

impl MemoryLogConfig {
    pub fn new(log_id: i64) -> Self {
        Self {
            log_id,
            sequencer_batch_size: 100,
            sequencing_mode: SequencingMode::OnRootFetch,
        }
    }
}

#[derive(Default)]
struct LogState {
    pending: VecDeque<LogLeaf>,
    leaves: Vec<LogLeaf>,
    leaf_hashes: Vec<Digest32>,
    published: SignedLogRoot,
    revision: u64,
    queue_failures: Option<(usize, Code)>,
}

/// A verifiable log held entirely in memory.
pub struct MemoryLog {
    config: MemoryLogConfig,
    signer: RootSigner,
    state: RefCell<LogState>,
}

impl MemoryLog {
    /// Creates an empty log signing its roots with a freshly generated key.
    ///
    /// # Panics
    ///
    /// Panics if `sequencer_batch_size` is zero.
    pub fn new(config: MemoryLogConfig) -> Self {
        Self::with_key(config, SigningKey::generate(&mut OsRng))
    }

    /// Creates an empty log signing its roots with `key`.
    ///
    /// # Panics
    ///
    /// Panics if `sequencer_batch_size` is zero.
    pub fn with_key(config: MemoryLogConfig, key: SigningKey) -> Self {
        assert!(config.sequencer_batch_size > 0, "zero sequencer batch size");
        let log = Self {
            config,
            signer: RootSigner::new(key),
            state: RefCell::new(LogState::default()),
        };
        log.publish(&mut log.state.borrow_mut());
        log
    }

    /// Returns a verifier for the log's root signatures.
    pub fn verifier(&self) -> RootVerifier {
        self.signer.verifier()
    }

    /// Returns the size of the most recently published tree.
    pub fn published_size(&self) -> u64 {
        self.state.borrow().leaves.len() as u64
    }

    /// Returns the number of queued leaves not yet sequenced.
    pub fn pending_len(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Makes the next `n` queue requests fail with `code`.
    pub fn fail_next_queue_calls(&self, n: usize, code: Code) {
        self.state.borrow_mut().queue_failures = (n > 0).then_some((n, code));
    }

    /// Integrates up to one batch of pending leaves and publishes a new log
    /// root if any were integrated. Returns the number of leaves sequenced.
    ///
    /// # Panics
    ///
    /// Panics if the new root cannot be encoded, which cannot happen for a
    /// root with a 32-byte hash and no metadata.
    pub fn sequence(&self) -> usize {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let count = state.pending.len().min(self.config.sequencer_batch_size);
        if count == 0 {
            return 0;
        }
        let batch: Vec<LogLeaf> = state.pending.drain(..count).collect();
        for mut leaf in batch {
            let hash = merkle::leaf_hash(&leaf.leaf_value);
            leaf.leaf_index = state.leaves.len() as i64;
            leaf.merkle_leaf_hash = hash.to_vec();
            state.leaves.push(leaf);
            state.leaf_hashes.push(hash);
        }
        self.publish(state);
        debug!(
            "{}: Sequenced {count} leaves, tree size {}",
            self.config.log_id,
            state.leaves.len()
        );
        count
    }

    /// Sequences until the pending pool is empty.
    pub fn sequence_all(&self) {
        while self.sequence() > 0 {}
    }

    fn publish(&self, state: &mut LogState) {
        state.revision += 1;
        let root = LogRootV1 {
            tree_size: state.leaves.len() as u64,
            root_hash: merkle::mth(&state.leaf_hashes).to_vec(),
            timestamp_nanos: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)),
            revision: state.revision,
            metadata: Vec::new(),
        };
        state.published = self
            .signer
            .sign(&root)
            .expect("root with a 32-byte hash and no metadata must encode");
    }

    fn check_log_id(&self, log_id: i64) -> Result<(), RpcError> {
        if log_id == self.config.log_id {
            Ok(())
        } else {
            Err(RpcError::new(Code::NotFound, format!("log {log_id} not found")))
        }
    }
}

impl LogClient for MemoryLog {
    async fn get_latest_signed_log_root(
        &self,
        req: GetLatestSignedLogRootRequest,
    ) -> Result<GetLatestSignedLogRootResponse, RpcError> {
        self.check_log_id(req.log_id)?;
        if self.config.sequencing_mode == SequencingMode::OnRootFetch {
            self.sequence();
        }
        Ok(GetLatestSignedLogRootResponse {
            signed_log_root: self.state.borrow().published.clone(),
        })
    }

    async fn queue_leaf(&self, req: QueueLeafRequest) -> Result<QueueLeafResponse, RpcError> {
        self.check_log_id(req.log_id)?;
        let mut state = self.state.borrow_mut();
        if let Some((remaining, code)) = state.queue_failures.take() {
            if remaining > 1 {
                state.queue_failures = Some((remaining - 1, code));
            }
            return Err(RpcError::new(code, "injected queue failure"));
        }
        if req.leaf.leaf_value.is_empty() {
            return Err(RpcError::invalid_argument("empty leaf value"));
        }
        let mut leaf = req.leaf;
        leaf.merkle_leaf_hash = merkle::leaf_hash(&leaf.leaf_value).to_vec();
        state.pending.push_back(leaf.clone());
        Ok(QueueLeafResponse { queued_leaf: leaf })
    }

    async fn get_leaves_by_range(
        &self,
        req: GetLeavesByRangeRequest,
    ) -> Result<GetLeavesByRangeResponse, RpcError> {
        self.check_log_id(req.log_id)?;
        if req.start_index < 0 || req.count <= 0 {
            return Err(RpcError::invalid_argument(format!(
                "start_index {} and count {} must be non-negative and positive",
                req.start_index, req.count
            )));
        }
        let state = self.state.borrow();
        let size = state.leaves.len() as u64;
        let start = req.start_index as u64;
        if start >= size {
            return Err(RpcError::new(
                Code::OutOfRange,
                format!("start_index {start} beyond tree size {size}"),
            ));
        }
        let end = size.min(start.saturating_add(req.count as u64));
        debug!(
            "{}: Serving leaves [{start}, {end}) of {size}",
            self.config.log_id
        );
        Ok(GetLeavesByRangeResponse {
            leaves: state.leaves[start as usize..end as usize].to_vec(),
            signed_log_root: state.published.clone(),
        })
    }

    async fn get_inclusion_proof(
        &self,
        req: GetInclusionProofRequest,
    ) -> Result<GetInclusionProofResponse, RpcError> {
        self.check_log_id(req.log_id)?;
        if req.leaf_index < 0 || req.tree_size <= 0 || req.leaf_index >= req.tree_size {
            return Err(RpcError::invalid_argument(format!(
                "no proof for leaf index {} at tree size {}",
                req.leaf_index, req.tree_size
            )));
        }
        let state = self.state.borrow();
        let size = state.leaves.len();
        let (index, tree_size) = (req.leaf_index as usize, req.tree_size as usize);
        let proof = if tree_size > size {
            debug!(
                "{}: Inclusion proof requested at tree size {tree_size} > {size}",
                self.config.log_id
            );
            None
        } else {
            Some(Proof {
                leaf_index: req.leaf_index,
                hashes: to_vecs(merkle::path(index, &state.leaf_hashes[..tree_size])),
            })
        };
        Ok(GetInclusionProofResponse {
            proof,
            signed_log_root: state.published.clone(),
        })
    }

    async fn get_consistency_proof(
        &self,
        req: GetConsistencyProofRequest,
    ) -> Result<GetConsistencyProofResponse, RpcError> {
        self.check_log_id(req.log_id)?;
        let (first, second) = (req.first_tree_size, req.second_tree_size);
        if first <= 0 || second <= 0 || second < first {
            return Err(RpcError::invalid_argument(format!(
                "no consistency proof between tree sizes {first} and {second}"
            )));
        }
        let state = self.state.borrow();
        let size = state.leaves.len();
        let (first, second) = (first as usize, second as usize);
        let proof = if second > size {
            debug!(
                "{}: Consistency proof requested at tree size {second} > {size}",
                self.config.log_id
            );
            None
        } else {
            Some(Proof {
                leaf_index: 0,
                hashes: to_vecs(merkle::proof(first, &state.leaf_hashes[..second])),
            })
        };
        Ok(GetConsistencyProofResponse {
            proof,
            signed_log_root: state.published.clone(),
        })
    }
}

fn to_vecs(hashes: Vec<Digest32>) -> Vec<Vec<u8>> {
    hashes.into_iter().map(|h| h.to_vec()).collect()
}

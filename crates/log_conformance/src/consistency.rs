// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Consistency proof checks.

use crate::{
    clock::Clock,
    oracle::MerkleOracle,
    session::{Session, GET_CONSISTENCY_PROOF},
    HarnessError, ProofRequest, ProtocolViolation,
};
use log::debug;
use log_api::{GetConsistencyProofRequest, LogClient};

/// A pair of tree sizes, in units of a batch size.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ConsistencyProofParams {
    pub size1: i64,
    pub size2: i64,
}

const fn pair(size1: i64, size2: i64) -> ConsistencyProofParams {
    ConsistencyProofParams { size1, size2 }
}

/// Size pairs the log must prove consistent.
pub const CONSISTENCY_PROOF_TEST_PARAMS: [ConsistencyProofParams; 4] =
    [pair(1, 2), pair(2, 3), pair(1, 3), pair(2, 4)];

/// Size pairs the log must refuse, whatever the batch size.
pub const CONSISTENCY_PROOF_BAD_TEST_PARAMS: [ConsistencyProofParams; 3] =
    [pair(0, 0), pair(-1, 0), pair(10_000_000, 10_000_000)];

/// Requests the consistency proof between `params.size1 * batch_size` and
/// `params.size2 * batch_size`, and verifies it against the roots of `tree`
/// at those sizes.
///
/// # Errors
///
/// Returns a protocol violation if the log refuses, answers for a size
/// beyond its head, or the proof does not verify.
pub async fn check_consistency_proof<C: LogClient, K: Clock, O: MerkleOracle>(
    session: &Session<'_, C, K>,
    params: ConsistencyProofParams,
    tree: &O,
    batch_size: i64,
) -> Result<(), HarnessError> {
    let first = params.size1.saturating_mul(batch_size);
    let second = params.size2.saturating_mul(batch_size);
    let req = ProofRequest::Consistency { first, second };
    let result = session
        .call(
            session
                .client
                .get_consistency_proof(GetConsistencyProofRequest {
                    log_id: session.tree_id(),
                    first_tree_size: first,
                    second_tree_size: second,
                }),
        )
        .await;
    let resp = session.require_answer(GET_CONSISTENCY_PROOF, req, result)?;

    let root = session.decode_root(&resp.signed_log_root)?;
    if u64::try_from(second).map_or(true, |s| s > root.tree_size) {
        return Err(ProtocolViolation::TreeSizeBeyondHead {
            request: req,
            requested: second,
            available: root.tree_size,
        }
        .into());
    }
    let Some(proof) = resp.proof else {
        return Err(ProtocolViolation::EmptyProof {
            request: req,
            tree_size: root.tree_size,
        }
        .into());
    };
    let invalid = |reason: String| ProtocolViolation::InvalidProof {
        request: req,
        reason,
    };
    let size1 = u64::try_from(first).map_err(|_| invalid("negative tree size".into()))?;
    let size2 = u64::try_from(second).map_err(|_| invalid("negative tree size".into()))?;
    let root1 = tree.root_at(size1).map_err(HarnessError::oracle)?;
    let root2 = tree.root_at(size2).map_err(HarnessError::oracle)?;
    tree.verify_consistency(size1, size2, &proof.hashes, &root1, &root2)
        .map_err(|e| invalid(e.to_string()))?;
    Ok(())
}

/// Checks that the log refuses the consistency proof for `params`. Any
/// failure of [`check_consistency_proof`] other than a timeout counts as a
/// refusal.
///
/// # Errors
///
/// Returns a protocol violation if the log produces a proof that verifies.
pub async fn check_consistency_proof_refused<C: LogClient, K: Clock, O: MerkleOracle>(
    session: &Session<'_, C, K>,
    params: ConsistencyProofParams,
    tree: &O,
    batch_size: i64,
) -> Result<(), HarnessError> {
    match check_consistency_proof(session, params, tree, batch_size).await {
        Ok(()) => Err(ProtocolViolation::UnexpectedProof {
            request: ProofRequest::Consistency {
                first: params.size1.saturating_mul(batch_size),
                second: params.size2.saturating_mul(batch_size),
            },
        }
        .into()),
        Err(e) if e.is_timeout() => Err(e),
        Err(e) => {
            debug!("{}: Refused as expected: {e}", session.tree_id());
            Ok(())
        }
    }
}

/// Returns the batch sizes the positive consistency checks are scaled by:
/// the queue batch size and, if different, half of it.
pub fn consistency_batch_sizes(queue_batch_size: u64) -> Vec<i64> {
    let full = i64::try_from(queue_batch_size).unwrap_or(i64::MAX);
    if full > 1 {
        vec![full, full / 2]
    } else {
        vec![full]
    }
}

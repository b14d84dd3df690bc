// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Inclusion proof checks.

use crate::{
    clock::Clock,
    oracle::MerkleOracle,
    session::{to_request, Session, GET_INCLUSION_PROOF},
    HarnessError, ProofRequest, ProtocolViolation,
};
use log::{debug, info};
use log_api::{Code, GetInclusionProofRequest, GetInclusionProofResponse, LogClient, RpcError};

/// Leaf indices probed at every tree size of the grid.
pub const INCLUSION_PROOF_TEST_INDICES: [u64; 5] = [5, 27, 31, 80, 91];

async fn request<C: LogClient, K: Clock>(
    session: &Session<'_, C, K>,
    leaf_index: i64,
    tree_size: i64,
) -> Result<GetInclusionProofResponse, RpcError> {
    session
        .call(session.client.get_inclusion_proof(GetInclusionProofRequest {
            log_id: session.tree_id(),
            leaf_index,
            tree_size,
        }))
        .await
}

/// Asks for a proof of leaf `leaf_count + 1` in the tree of `leaf_count`
/// leaves, which the log must refuse.
///
/// # Errors
///
/// Returns a protocol violation if the log answers.
pub async fn check_inclusion_proof_leaf_out_of_range<C: LogClient, K: Clock>(
    session: &Session<'_, C, K>,
) -> Result<(), HarnessError> {
    let leaf_count = to_request(session.params.leaf_count);
    let (leaf_index, tree_size) = (leaf_count.saturating_add(1), leaf_count);
    expect_refusal(session, leaf_index, tree_size).await
}

async fn expect_refusal<C: LogClient, K: Clock>(
    session: &Session<'_, C, K>,
    leaf_index: i64,
    tree_size: i64,
) -> Result<(), HarnessError> {
    let req = ProofRequest::Inclusion {
        leaf_index,
        tree_size,
    };
    match request(session, leaf_index, tree_size).await {
        Ok(_) => Err(ProtocolViolation::UnexpectedProof { request: req }.into()),
        Err(e) if e.code == Code::DeadlineExceeded => {
            Err(session.rpc_error(GET_INCLUSION_PROOF, e))
        }
        Err(e) => {
            debug!("{}: {req} refused as expected: {e}", session.tree_id());
            Ok(())
        }
    }
}

/// Asks for a proof at a tree size beyond anything the log has published.
/// The log must answer without error and without proof hashes, with a root
/// for its actual, smaller size.
///
/// # Errors
///
/// Returns a protocol violation if the answer breaks that contract.
pub async fn check_inclusion_proof_tree_size_out_of_range<C: LogClient, K: Clock>(
    session: &Session<'_, C, K>,
) -> Result<(), HarnessError> {
    let params = session.params;
    let leaf_index = to_request(params.sequencer_batch_size);
    let tree_size = to_request(params.leaf_count + params.sequencer_batch_size);
    let req = ProofRequest::Inclusion {
        leaf_index,
        tree_size,
    };
    let resp = session.require_answer(
        GET_INCLUSION_PROOF,
        req,
        request(session, leaf_index, tree_size).await,
    )?;
    let count = resp.proof.as_ref().map_or(0, |p| p.hashes.len());
    if count != 0 {
        return Err(ProtocolViolation::SkewProofReturned {
            request: req,
            count,
        }
        .into());
    }
    let root = session.decode_root(&resp.signed_log_root)?;
    if to_request(root.tree_size) >= tree_size {
        return Err(ProtocolViolation::SkewRootTooLarge {
            request: req,
            returned: root.tree_size,
        }
        .into());
    }
    debug!(
        "{}: {req} answered with root at size {}",
        session.tree_id(),
        root.tree_size
    );
    Ok(())
}

/// Asks for proofs of leaf `index` at every tree size below
/// `min(leaf_count, 2 * sequencer_batch_size)`. The log must answer exactly
/// when `index < tree_size`, with a proof that verifies against `tree`.
/// Returns the number of requests made.
///
/// # Errors
///
/// Returns a protocol violation on the first wrong answer.
pub async fn check_inclusion_proofs_at_index<C: LogClient, K: Clock, O: MerkleOracle>(
    session: &Session<'_, C, K>,
    index: u64,
    tree: &O,
) -> Result<u64, HarnessError> {
    let params = session.params;
    let max_size = params
        .leaf_count
        .min(params.sequencer_batch_size.saturating_mul(2));
    info!(
        "{}: Checking inclusion proofs for leaf {index} at tree sizes [0, {max_size})",
        session.tree_id()
    );
    for tree_size in 0..max_size {
        if index < tree_size {
            check_inclusion_proof(session, index, tree_size, tree).await?;
        } else {
            expect_refusal(session, to_request(index), to_request(tree_size)).await?;
        }
    }
    Ok(max_size)
}

async fn check_inclusion_proof<C: LogClient, K: Clock, O: MerkleOracle>(
    session: &Session<'_, C, K>,
    index: u64,
    tree_size: u64,
    tree: &O,
) -> Result<(), HarnessError> {
    let (leaf_index, size) = (to_request(index), to_request(tree_size));
    let req = ProofRequest::Inclusion {
        leaf_index,
        tree_size: size,
    };
    let resp = session.require_answer(
        GET_INCLUSION_PROOF,
        req,
        request(session, leaf_index, size).await,
    )?;
    let Some(proof) = resp.proof else {
        let root = session.decode_root(&resp.signed_log_root)?;
        return Err(ProtocolViolation::EmptyProof {
            request: req,
            tree_size: root.tree_size,
        }
        .into());
    };
    let root = tree.root_at(tree_size).map_err(HarnessError::oracle)?;
    let leaf_hash = tree.leaf_hash_at(index).map_err(HarnessError::oracle)?;
    tree.verify_inclusion(index, tree_size, &leaf_hash, &proof.hashes, &root)
        .map_err(|e| ProtocolViolation::InvalidProof {
            request: req,
            reason: e.to_string(),
        })?;
    Ok(())
}

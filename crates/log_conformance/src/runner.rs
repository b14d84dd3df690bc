// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

use crate::{
    backoff::Backoff,
    clock::Clock,
    consistency::{
        check_consistency_proof, check_consistency_proof_refused, consistency_batch_sizes,
        CONSISTENCY_PROOF_BAD_TEST_PARAMS, CONSISTENCY_PROOF_TEST_PARAMS,
    },
    inclusion::{
        check_inclusion_proof_leaf_out_of_range, check_inclusion_proof_tree_size_out_of_range,
        check_inclusion_proofs_at_index, INCLUSION_PROOF_TEST_INDICES,
    },
    oracle::{build_reference_tree, MerkleOracle},
    read::{read_leaves, verify_leaves},
    roots::{check_log_empty, check_log_root_matches},
    sequencing::wait_for_sequencing,
    session::{to_request, Session},
    submit::queue_leaves,
    workload::generate_leaves,
    HarnessError, TestParameters,
};
use log::info;
use log_api::LogClient;

/// What a successful run did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub permutation_seed: u64,
    pub leaves_queued: u64,
    pub leaves_read: u64,
    /// Size of the reference tree built from the leaves read.
    pub tree_size: u64,
    pub inclusion_probes: u64,
    pub consistency_probes: u64,
}

/// Runs the full conformance scenario against the log behind `client`:
/// check that it is empty, queue a generated workload, wait for it to be
/// sequenced, read it back, rebuild the tree in `oracle`, and compare roots,
/// inclusion proofs and consistency proofs with it.
///
/// `oracle` must be empty. The run stops at the first failure.
///
/// # Errors
///
/// Returns the first configuration error, service error, protocol violation
/// or timeout encountered.
pub async fn run_log_conformance<C, K, O>(
    client: &C,
    clock: &K,
    oracle: O,
    params: &TestParameters,
) -> Result<RunSummary, HarnessError>
where
    C: LogClient,
    K: Clock,
    O: MerkleOracle,
{
    let session = Session::new(client, clock, params)?;
    let tree_id = params.tree_id;
    let seed = params
        .permutation_seed
        .unwrap_or_else(|| clock.wall_time_nanos());
    info!("{tree_id}: Starting conformance run, permutation seed {seed}");

    if params.check_log_empty {
        info!("{tree_id}: Checking log is empty");
        check_log_empty(&session).await?;
    }

    let leaves = generate_leaves(params, seed);
    let mut leaves_queued = 0;
    if params.queue_leaves {
        queue_leaves(&session, &Backoff::default(), &leaves).await?;
        leaves_queued = leaves.len() as u64;
    }

    if params.await_sequencing {
        wait_for_sequencing(&session).await?;
    }

    let read = read_leaves(&session).await?;
    verify_leaves(&oracle, &leaves, &read)?;
    info!("{tree_id}: Read back {} leaves and verified them", read.len());

    let tree = build_reference_tree(oracle, &read)?;
    check_log_root_matches(&session, &tree).await?;

    info!("{tree_id}: Checking inclusion proofs");
    check_inclusion_proof_leaf_out_of_range(&session).await?;
    check_inclusion_proof_tree_size_out_of_range(&session).await?;
    let mut inclusion_probes = 2;
    for index in INCLUSION_PROOF_TEST_INDICES {
        inclusion_probes += check_inclusion_proofs_at_index(&session, index, &tree).await?;
    }

    info!("{tree_id}: Checking consistency proofs");
    let batch_sizes = consistency_batch_sizes(params.queue_batch_size);
    let mut consistency_probes = 0;
    for p in CONSISTENCY_PROOF_BAD_TEST_PARAMS {
        check_consistency_proof_refused(&session, p, &tree, to_request(params.queue_batch_size))
            .await?;
        consistency_probes += 1;
    }
    // Each pair at the queue batch size, then at half of it.
    for p in CONSISTENCY_PROOF_TEST_PARAMS {
        for &batch_size in &batch_sizes {
            check_consistency_proof(&session, p, &tree, batch_size).await?;
            consistency_probes += 1;
        }
    }

    let summary = RunSummary {
        permutation_seed: seed,
        leaves_queued,
        leaves_read: read.len() as u64,
        tree_size: tree.size(),
        inclusion_probes,
        consistency_probes,
    };
    info!("{tree_id}: Conformance run passed: {summary:?}");
    Ok(summary)
}

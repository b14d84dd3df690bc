// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

use crate::{
    backoff::Backoff,
    clock::Clock,
    session::{Session, QUEUE_LEAF},
    HarnessError,
};
use log::{debug, info};
use log_api::{LogClient, LogLeaf, QueueLeafRequest};

/// Queues `leaves` one at a time, retrying transient failures with `backoff`
/// until the per-call deadline for that leaf elapses.
///
/// # Errors
///
/// Returns the first error that could not be retried away.
pub async fn queue_leaves<C: LogClient, K: Clock>(
    session: &Session<'_, C, K>,
    backoff: &Backoff,
    leaves: &[LogLeaf],
) -> Result<(), HarnessError> {
    let tree_id = session.tree_id();
    let deadline = session.params.rpc_request_deadline;
    let progress_every = usize::try_from(session.params.queue_batch_size).unwrap_or(usize::MAX);
    info!("{tree_id}: Queueing {} leaves", leaves.len());

    for (i, leaf) in leaves.iter().enumerate() {
        backoff
            .retry(session.clock, deadline, || {
                session.client.queue_leaf(QueueLeafRequest {
                    log_id: tree_id,
                    leaf: leaf.clone(),
                })
            })
            .await
            .map_err(|e| session.rpc_error(QUEUE_LEAF, e))?;
        if (i + 1) % progress_every == 0 {
            debug!("{tree_id}: Queued {}/{} leaves", i + 1, leaves.len());
        }
    }
    info!("{tree_id}: Queued {} leaves", leaves.len());
    Ok(())
}

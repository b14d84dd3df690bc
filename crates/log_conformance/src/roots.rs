// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

use crate::{clock::Clock, oracle::MerkleOracle, session::Session, HarnessError, ProtocolViolation};
use log::info;
use log_api::LogClient;

/// Checks that the log has no sequenced leaves.
///
/// # Errors
///
/// Returns a protocol violation if the latest root has a non-zero size.
pub async fn check_log_empty<C: LogClient, K: Clock>(
    session: &Session<'_, C, K>,
) -> Result<(), HarnessError> {
    let root = session.latest_root().await?;
    if root.tree_size > 0 {
        return Err(ProtocolViolation::LogNotEmpty {
            tree_size: root.tree_size,
        }
        .into());
    }
    info!("{}: Log is empty", session.tree_id());
    Ok(())
}

/// Checks that the latest root published by the log matches the root of the
/// reference tree.
///
/// # Errors
///
/// Returns a protocol violation if the root hashes differ.
pub async fn check_log_root_matches<C: LogClient, K: Clock, O: MerkleOracle>(
    session: &Session<'_, C, K>,
    tree: &O,
) -> Result<(), HarnessError> {
    let root = session.latest_root().await?;
    let want = tree.root_at(tree.size()).map_err(HarnessError::oracle)?;
    if root.root_hash != want {
        return Err(ProtocolViolation::RootHashMismatch {
            log_size: root.tree_size,
            tree_size: tree.size(),
            got: root.root_hash,
            want,
        }
        .into());
    }
    info!(
        "{}: Log root matches reference tree at size {}",
        session.tree_id(),
        root.tree_size
    );
    Ok(())
}

// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Reading back the sequenced leaves and checking them against what was
//! written.

use crate::{
    clock::Clock,
    oracle::MerkleOracle,
    session::{to_request, Session, GET_LEAVES_BY_RANGE},
    workload::extra_data_for,
    ConfigError, HarnessError, ProtocolViolation,
};
use log::{debug, info};
use log_api::{GetLeavesByRangeRequest, LogClient, LogLeaf};
use std::collections::BTreeMap;

/// Reads leaves `0..leaf_count` in windows of at most `read_batch_size`.
/// Every window must come back complete and in place.
///
/// # Errors
///
/// Returns a configuration error if `start_leaf` is not zero, and a protocol
/// violation on a short read or a leaf reported at the wrong index.
pub async fn read_leaves<C: LogClient, K: Clock>(
    session: &Session<'_, C, K>,
) -> Result<Vec<LogLeaf>, HarnessError> {
    let params = session.params;
    if params.start_leaf != 0 {
        return Err(ConfigError::NonZeroStartLeaf(params.start_leaf).into());
    }
    let tree_id = session.tree_id();
    info!("{tree_id}: Reading back {} leaves", params.leaf_count);

    let mut leaves = Vec::with_capacity(usize::try_from(params.leaf_count).unwrap_or(0));
    let mut start = 0;
    while start < params.leaf_count {
        let want = params.read_batch_size.min(params.leaf_count - start);
        let resp = session
            .rpc(
                GET_LEAVES_BY_RANGE,
                session.client.get_leaves_by_range(GetLeavesByRangeRequest {
                    log_id: tree_id,
                    start_index: to_request(start),
                    count: to_request(want),
                }),
            )
            .await?;
        let got = resp.leaves.len() as u64;
        if got != want {
            return Err(ProtocolViolation::ShortRead { start, want, got }.into());
        }
        for (position, leaf) in (start..).zip(&resp.leaves) {
            if leaf.leaf_index != to_request(position) {
                return Err(ProtocolViolation::LeafIndexMismatch {
                    position,
                    got: leaf.leaf_index,
                }
                .into());
            }
        }
        debug!("{tree_id}: Read leaves [{start}, {})", start + got);
        leaves.extend(resp.leaves);
        start += want;
    }
    Ok(leaves)
}

/// Checks the leaves read back against those written: every leaf hash must be
/// the oracle's hash of its value, every extra data must be derived from its
/// value, and the values must be the written values with the same
/// multiplicity.
///
/// # Errors
///
/// Returns the first discrepancy found.
pub fn verify_leaves<O: MerkleOracle>(
    oracle: &O,
    written: &[LogLeaf],
    read: &[LogLeaf],
) -> Result<(), ProtocolViolation> {
    let mut counts: BTreeMap<&[u8], i64> = BTreeMap::new();
    for (index, leaf) in (0u64..).zip(read) {
        let want = oracle.hash_leaf(&leaf.leaf_value);
        if leaf.merkle_leaf_hash != want {
            return Err(ProtocolViolation::LeafHashMismatch {
                index,
                got: leaf.merkle_leaf_hash.clone(),
                want,
            });
        }
        let want = extra_data_for(&leaf.leaf_value);
        if leaf.extra_data != want {
            return Err(ProtocolViolation::ExtraDataMismatch {
                index,
                got: leaf.extra_data.clone(),
                want,
            });
        }
        *counts.entry(leaf.leaf_value.as_slice()).or_default() += 1;
    }
    for leaf in written {
        *counts.entry(leaf.leaf_value.as_slice()).or_default() -= 1;
    }
    let diff: Vec<(String, i64)> = counts
        .into_iter()
        .filter(|&(_, n)| n != 0)
        .map(|(value, n)| (String::from_utf8_lossy(value).into_owned(), n))
        .collect();
    if diff.is_empty() {
        Ok(())
    } else {
        Err(ProtocolViolation::LeafValueMismatch { diff })
    }
}

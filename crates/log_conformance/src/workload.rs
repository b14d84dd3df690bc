// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Generation of the leaves a run writes to the log.
//!
//! Each distinct leaf encodes its index in its value, and its extra data is
//! derived from the value. The written sequence draws from the distinct
//! leaves through a seeded permutation, so that most runs contain
//! duplicates and any run can be replayed from its seed.

use crate::TestParameters;
use log::info;
use log_api::LogLeaf;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

const VALUE_TAG: &[u8] = b"Leaf";
const EXTRA_TAG: &[u8] = b"Extra";

/// Returns the value of the distinct leaf with logical index `index`.
pub fn leaf_value(prefix: &str, index: u64) -> Vec<u8> {
    format!("{prefix}Leaf {index}").into_bytes()
}

/// Returns the extra data expected alongside the leaf value `value`: the
/// value with its first `Leaf` replaced by `Extra`.
pub fn extra_data_for(value: &[u8]) -> Vec<u8> {
    match value.windows(VALUE_TAG.len()).position(|w| w == VALUE_TAG) {
        Some(pos) => [&value[..pos], EXTRA_TAG, &value[pos + VALUE_TAG.len()..]].concat(),
        None => value.to_vec(),
    }
}

/// Returns the distinct leaves of the workload, with logical indices
/// `start_leaf..start_leaf + unique`.
pub fn unique_leaves(params: &TestParameters) -> Vec<LogLeaf> {
    let start = params.start_leaf;
    (start..start + params.effective_unique_leaves())
        .map(|index| {
            let value = leaf_value(&params.custom_leaf_prefix, index);
            let extra = extra_data_for(&value);
            LogLeaf::new(value, extra)
        })
        .collect()
}

/// Returns the `leaf_count` leaves to write, drawn from the distinct leaves by
/// a permutation seeded with `seed`.
pub fn generate_leaves(params: &TestParameters, seed: u64) -> Vec<LogLeaf> {
    info!(
        "{}: Generating {} leaves, {} unique, permutation seed {seed}",
        params.tree_id,
        params.leaf_count,
        params.effective_unique_leaves()
    );
    let unique = unique_leaves(params);
    let count = usize::try_from(params.leaf_count).unwrap_or(usize::MAX);
    let mut order: Vec<usize> = (0..unique.len()).cycle().take(count).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));
    order.into_iter().map(|i| unique[i].clone()).collect()
}

// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

#![no_main]

use libfuzzer_sys::fuzz_target;
use log_api::LogRootV1;

fuzz_target!(|data: &[u8]| {
    if let Ok(root) = LogRootV1::from_bytes(data) {
        // Anything that parses must encode back to the same bytes.
        assert_eq!(root.to_bytes().ok().as_deref(), Some(data));
    }
});

// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Full conformance runs against an in-process log, well-behaved and not.

mod common;

use anyhow::{ensure, Result};
use common::{small_params, Tamper, TamperingLog, LOG_ID};
use futures_executor::block_on;
use log_api::{Code, LogClient, QueueLeafRequest};
use log_conformance::{
    run_log_conformance, workload::generate_leaves, ConfigError, HarnessError, ManualClock,
    ProofRequest, ProtocolViolation, RunSummary, TestParameters, TimeoutError, TokioClock,
};
use memory_log::{MemoryLog, MemoryLogConfig, SequencingMode};
use merkle_oracle::MemoryTree;
use std::time::Duration;

fn run(log: &impl LogClient, params: &TestParameters) -> Result<RunSummary, HarnessError> {
    let clock = ManualClock::new(1_700_000_000_000_000_000);
    block_on(run_log_conformance(log, &clock, MemoryTree::new(), params))
}

fn violation(tamper: Tamper) -> ProtocolViolation {
    let log = TamperingLog::new(50, tamper);
    match run(&log, &small_params()) {
        Err(HarnessError::Protocol(v)) => v,
        other => panic!("{tamper:?}: expected a protocol violation, got {other:?}"),
    }
}

#[test]
fn test_default_parameters() -> Result<()> {
    let log = MemoryLog::new(MemoryLogConfig::new(LOG_ID));
    let params = TestParameters {
        permutation_seed: Some(1234),
        log_public_key: Some(log.verifier().to_base64()),
        ..TestParameters::new(LOG_ID)
    };
    let summary = run(&log, &params)?;
    ensure!(
        summary
            == RunSummary {
                permutation_seed: 1234,
                leaves_queued: 1000,
                leaves_read: 1000,
                tree_size: 1000,
                // Two boundary requests, then 200 tree sizes per index.
                inclusion_probes: 2 + 5 * 200,
                consistency_probes: 3 + 2 * 4,
            },
        "unexpected summary {summary:?}"
    );
    ensure!(log.published_size() == 1000);
    Ok(())
}

#[test]
fn test_duplicate_leaves() -> Result<()> {
    let log = TamperingLog::new(50, Tamper::None);
    let params = TestParameters {
        leaf_count: 300,
        unique_leaves: 40,
        read_batch_size: 32,
        ..small_params()
    };
    let summary = run(&log, &params)?;
    ensure!(summary.leaves_read == 300 && summary.tree_size == 300);
    Ok(())
}

#[test]
fn test_batch_size_one() -> Result<()> {
    let log = TamperingLog::new(1, Tamper::None);
    let params = TestParameters {
        leaf_count: 12,
        queue_batch_size: 1,
        sequencer_batch_size: 1,
        read_batch_size: 5,
        ..small_params()
    };
    let summary = run(&log, &params)?;
    ensure!(summary.consistency_probes == 3 + 4);
    ensure!(summary.inclusion_probes == 2 + 5 * 2);
    Ok(())
}

#[test]
fn test_seed_from_clock() -> Result<()> {
    let log = TamperingLog::new(50, Tamper::None);
    let params = TestParameters {
        permutation_seed: None,
        ..small_params()
    };
    let summary = run(&log, &params)?;
    ensure!(summary.permutation_seed == 1_700_000_000_000_000_000);
    Ok(())
}

#[test]
fn test_prepopulated_log() -> Result<()> {
    let log = MemoryLog::new(MemoryLogConfig {
        sequencing_mode: SequencingMode::Manual,
        sequencer_batch_size: 50,
        ..MemoryLogConfig::new(LOG_ID)
    });
    let params = TestParameters {
        check_log_empty: false,
        queue_leaves: false,
        ..small_params()
    };
    for leaf in generate_leaves(&params, 99) {
        block_on(log.queue_leaf(QueueLeafRequest {
            log_id: LOG_ID,
            leaf,
        }))?;
    }
    log.sequence_all();

    // The seed only decides the order of the leaves, not which leaves exist.
    let summary = run(&log, &params)?;
    ensure!(summary.leaves_queued == 0 && summary.leaves_read == 200);
    Ok(())
}

#[test]
fn test_log_not_empty() {
    let log = TamperingLog::new(50, Tamper::None);
    block_on(log.queue_leaf(QueueLeafRequest {
        log_id: LOG_ID,
        leaf: log_api::LogLeaf::new(b"stray".to_vec(), Vec::new()),
    }))
    .unwrap();
    let err = run(&log, &small_params()).unwrap_err();
    assert!(matches!(
        err,
        HarnessError::Protocol(ProtocolViolation::LogNotEmpty { tree_size: 1 })
    ));
}

#[test]
fn test_unknown_tree() {
    let log = TamperingLog::new(50, Tamper::None);
    let params = TestParameters {
        tree_id: LOG_ID + 1,
        ..small_params()
    };
    let err = run(&log, &params).unwrap_err();
    assert!(matches!(
        err,
        HarnessError::Service {
            method: "GetLatestSignedLogRoot",
            ..
        }
    ));
}

#[test]
fn test_transient_queue_failures() -> Result<()> {
    let log = TamperingLog::new(50, Tamper::None);
    log.inner.fail_next_queue_calls(4, Code::Unavailable);
    run(&log, &small_params())?;
    Ok(())
}

#[test]
fn test_queue_rejected() {
    let log = TamperingLog::new(50, Tamper::None);
    log.inner.fail_next_queue_calls(1, Code::InvalidArgument);
    let err = run(&log, &small_params()).unwrap_err();
    assert!(matches!(
        err,
        HarnessError::Service {
            method: "QueueLeaf",
            ..
        }
    ));
}

#[test]
fn test_not_sequenced_in_time() {
    let log = MemoryLog::new(MemoryLogConfig {
        sequencing_mode: SequencingMode::Manual,
        ..MemoryLogConfig::new(LOG_ID)
    });
    let params = TestParameters {
        sequencing_wait_total: Duration::from_secs(30),
        sequencing_poll_wait: Duration::from_secs(4),
        ..small_params()
    };
    let err = run(&log, &params).unwrap_err();
    assert!(err.is_timeout());
    assert!(matches!(
        err,
        HarnessError::Timeout(TimeoutError::NotSequenced {
            want: 200,
            tree_size: 0,
            waited,
        }) if waited == Duration::from_secs(30)
    ));
    assert_eq!(log.pending_len(), 200);
}

#[test]
fn test_nonzero_start_leaf() {
    let log = TamperingLog::new(50, Tamper::None);
    let params = TestParameters {
        start_leaf: 10,
        await_sequencing: false,
        ..small_params()
    };
    let err = run(&log, &params).unwrap_err();
    assert!(matches!(
        err,
        HarnessError::Config(ConfigError::NonZeroStartLeaf(10))
    ));
}

#[test]
fn test_invalid_parameters() {
    let log = TamperingLog::new(50, Tamper::None);
    let params = TestParameters {
        unique_leaves: 201,
        ..small_params()
    };
    assert!(matches!(
        run(&log, &params),
        Err(HarnessError::Config(ConfigError::TooManyUniqueLeaves { .. }))
    ));
    assert_eq!(log.inner.pending_len(), 0);
}

#[test]
fn test_wrong_log_key() {
    let log = TamperingLog::new(50, Tamper::None);
    let other = MemoryLog::new(MemoryLogConfig::new(LOG_ID));
    let params = TestParameters {
        log_public_key: Some(other.verifier().to_base64()),
        ..small_params()
    };
    assert!(matches!(
        run(&log, &params),
        Err(HarnessError::Protocol(ProtocolViolation::MalformedLogRoot(_)))
    ));
}

#[test]
fn test_hung_reads_time_out() {
    let log = TamperingLog::new(50, Tamper::HangLeafReads);
    let err = run(&log, &small_params()).unwrap_err();
    assert!(matches!(
        err,
        HarnessError::Timeout(TimeoutError::RpcDeadline {
            method: "GetLeavesByRange",
            ..
        })
    ));
}

#[test]
fn test_short_read() {
    assert!(matches!(
        violation(Tamper::DropLastLeaf),
        ProtocolViolation::ShortRead {
            start: 175,
            want: 25,
            got: 24
        }
    ));
}

#[test]
fn test_corrupted_leaves() {
    assert!(matches!(
        violation(Tamper::FlipLeafHash(17)),
        ProtocolViolation::LeafHashMismatch { index: 17, .. }
    ));
    assert!(matches!(
        violation(Tamper::WrongExtraData(17)),
        ProtocolViolation::ExtraDataMismatch { index: 17, .. }
    ));

    let ProtocolViolation::LeafValueMismatch { diff } = violation(Tamper::ReplaceLeafValue(17))
    else {
        panic!("expected a leaf value mismatch");
    };
    assert_eq!(diff.len(), 2);
    assert!(diff.contains(&("Leaf 999999".to_string(), 1)));
    assert!(diff.iter().any(|(_, n)| *n == -1));
}

#[test]
fn test_wrong_root_hash() {
    assert!(matches!(
        violation(Tamper::WrongRootHash),
        ProtocolViolation::RootHashMismatch {
            log_size: 200,
            tree_size: 200,
            ..
        }
    ));
}

#[test]
fn test_inclusion_boundaries() {
    assert!(matches!(
        violation(Tamper::ServeOutOfRangeInclusion),
        ProtocolViolation::UnexpectedProof {
            request: ProofRequest::Inclusion {
                leaf_index: 201,
                tree_size: 200
            }
        }
    ));
    assert!(matches!(
        violation(Tamper::RefuseSkewedInclusion),
        ProtocolViolation::MissingProof {
            request: ProofRequest::Inclusion {
                leaf_index: 50,
                tree_size: 250
            },
            ..
        }
    ));
    assert!(matches!(
        violation(Tamper::ProofForSkewedInclusion),
        ProtocolViolation::SkewProofReturned { count: 1, .. }
    ));
    assert!(matches!(
        violation(Tamper::InflateSkewedRoot),
        ProtocolViolation::SkewRootTooLarge { returned: 250, .. }
    ));
}

#[test]
fn test_corrupted_inclusion_proof() {
    assert!(matches!(
        violation(Tamper::CorruptInclusionProof),
        ProtocolViolation::InvalidProof {
            request: ProofRequest::Inclusion {
                leaf_index: 5,
                tree_size: 6
            },
            ..
        }
    ));
}

#[test]
fn test_consistency_violations() {
    assert!(matches!(
        violation(Tamper::ServeEqualSizeConsistency),
        ProtocolViolation::UnexpectedProof {
            request: ProofRequest::Consistency {
                first: 0,
                second: 0
            }
        }
    ));
    assert!(matches!(
        violation(Tamper::CorruptConsistencyProof),
        ProtocolViolation::InvalidProof {
            request: ProofRequest::Consistency {
                first: 20,
                second: 40
            },
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_tokio_clock() -> Result<()> {
    let log = TamperingLog::new(50, Tamper::None);
    let summary =
        run_log_conformance(&log, &TokioClock, MemoryTree::new(), &small_params()).await?;
    ensure!(summary.tree_size == 200);
    Ok(())
}

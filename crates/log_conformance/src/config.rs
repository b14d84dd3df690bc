// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Parameters of a conformance run.

use log_api::{KeyError, RootVerifier};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::time::Duration;
use thiserror::Error;

const SCHEMA: &str = include_str!("../config.schema.json");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("non-zero start leaf {0} is not supported when reading back leaves")]
    NonZeroStartLeaf(u64),
    #[error("{0} must be positive")]
    NotPositive(&'static str),
    #[error("unique leaves {unique} > leaf count {count}")]
    TooManyUniqueLeaves { unique: u64, count: u64 },
    #[error("{0} does not fit in a log request")]
    TooLarge(&'static str),
    #[error("invalid log public key: {0}")]
    PublicKey(#[from] KeyError),
    #[error("parameters do not match schema: {0}")]
    Schema(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Parameters for one run against one log. Durations are (de)serialized as
/// milliseconds.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestParameters {
    pub tree_id: i64,
    pub check_log_empty: bool,
    pub queue_leaves: bool,
    pub await_sequencing: bool,
    pub start_leaf: u64,
    pub leaf_count: u64,
    /// Zero means every generated leaf is distinct.
    pub unique_leaves: u64,
    pub queue_batch_size: u64,
    pub sequencer_batch_size: u64,
    pub read_batch_size: u64,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub sequencing_wait_total: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub sequencing_poll_wait: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub rpc_request_deadline: Duration,
    pub custom_leaf_prefix: String,
    /// Seed for the leaf permutation. Derived from the clock if absent.
    pub permutation_seed: Option<u64>,
    /// Base64 Ed25519 key checked against every log root signature.
    pub log_public_key: Option<String>,
}

impl Default for TestParameters {
    fn default() -> Self {
        Self::new(0)
    }
}

impl TestParameters {
    /// Returns the default parameters for the log `tree_id`.
    pub fn new(tree_id: i64) -> Self {
        Self {
            tree_id,
            check_log_empty: true,
            queue_leaves: true,
            await_sequencing: true,
            start_leaf: 0,
            leaf_count: 1000,
            unique_leaves: 1000,
            queue_batch_size: 50,
            sequencer_batch_size: 100,
            read_batch_size: 50,
            sequencing_wait_total: Duration::from_secs(10 * 60),
            sequencing_poll_wait: Duration::from_secs(5),
            rpc_request_deadline: Duration::from_secs(30),
            custom_leaf_prefix: String::new(),
            permutation_seed: None,
            log_public_key: None,
        }
    }

    /// Parses parameters from JSON after checking them against the embedded
    /// schema. Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not JSON, does not match the schema,
    /// or does not pass [`TestParameters::validate`].
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let json: serde_json::Value = serde_json::from_str(s)?;
        let schema: serde_json::Value = serde_json::from_str(SCHEMA)?;
        jsonschema::validate(&schema, &json).map_err(|e| ConfigError::Schema(e.to_string()))?;
        let params: Self = serde_json::from_value(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Checks the parameters for consistency.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("leaf count", self.leaf_count),
            ("queue batch size", self.queue_batch_size),
            ("sequencer batch size", self.sequencer_batch_size),
            ("read batch size", self.read_batch_size),
        ] {
            if value == 0 {
                return Err(ConfigError::NotPositive(name));
            }
            if i64::try_from(value).is_err() {
                return Err(ConfigError::TooLarge(name));
            }
        }
        if self.sequencing_poll_wait.is_zero() {
            return Err(ConfigError::NotPositive("sequencing poll wait"));
        }
        if self.rpc_request_deadline.is_zero() {
            return Err(ConfigError::NotPositive("RPC request deadline"));
        }
        if self.unique_leaves > self.leaf_count {
            return Err(ConfigError::TooManyUniqueLeaves {
                unique: self.unique_leaves,
                count: self.leaf_count,
            });
        }
        if self
            .start_leaf
            .checked_add(self.leaf_count)
            .and_then(|end| i64::try_from(end).ok())
            .is_none()
        {
            return Err(ConfigError::TooLarge("start leaf + leaf count"));
        }
        self.root_verifier()?;
        Ok(())
    }

    /// Returns the number of distinct leaves to generate.
    pub fn effective_unique_leaves(&self) -> u64 {
        if self.unique_leaves == 0 {
            self.leaf_count
        } else {
            self.unique_leaves
        }
    }

    /// Returns a verifier for `log_public_key`, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be parsed.
    pub fn root_verifier(&self) -> Result<Option<RootVerifier>, ConfigError> {
        self.log_public_key
            .as_deref()
            .map(RootVerifier::from_base64)
            .transpose()
            .map_err(ConfigError::from)
    }
}

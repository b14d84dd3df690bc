// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Exponential backoff for retrying requests that failed transiently.

use crate::clock::{with_deadline, Clock};
use log::debug;
use log_api::{Code, RpcError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub struct Backoff {
    pub min: Duration,
    pub max: Duration,
    pub factor: f64,
    /// Add a random pause of up to the base delay to each delay.
    pub jitter: bool,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(100),
            max: Duration::from_secs(10),
            factor: 2.0,
            jitter: true,
        }
    }
}

impl Backoff {
    /// Returns the base delay before retry number `attempt` (starting at
    /// zero): `min * factor^attempt`, capped at `max`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.min.as_secs_f64() * self.factor.powi(exp);
        if secs.is_finite() && secs < self.max.as_secs_f64() {
            Duration::from_secs_f64(secs).max(self.min)
        } else {
            self.max
        }
    }

    /// Returns the pause before retry number `attempt`, including jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter && !base.is_zero() {
            base + rand::thread_rng().gen_range(Duration::ZERO..base)
        } else {
            base
        }
    }

    /// Calls `op` until it succeeds, fails with a non-transient error, or
    /// `deadline` elapses. Each attempt is bounded by the time remaining.
    ///
    /// # Errors
    ///
    /// Returns the first non-transient error, or a `DeadlineExceeded` error
    /// mentioning the last transient failure.
    pub async fn retry<K, T, F, Fut>(
        &self,
        clock: &K,
        deadline: Duration,
        mut op: F,
    ) -> Result<T, RpcError>
    where
        K: Clock,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RpcError>>,
    {
        let end = clock.now() + deadline;
        let mut last_err = None;
        for attempt in 0.. {
            let remaining = end.saturating_duration_since(clock.now());
            if remaining.is_zero() {
                break;
            }
            match with_deadline(clock, remaining, op()).await {
                Ok(v) => return Ok(v),
                Err(e) if e.code.is_transient() => {
                    let pause = self
                        .delay(attempt)
                        .min(end.saturating_duration_since(clock.now()));
                    debug!("Attempt {attempt} failed with {e}, retrying in {pause:?}");
                    last_err = Some(e);
                    clock.sleep(pause).await;
                }
                Err(e) => return Err(e),
            }
        }
        Err(match last_err {
            Some(e) => RpcError::new(
                Code::DeadlineExceeded,
                format!("deadline exceeded while retrying, last error: {e}"),
            ),
            None => RpcError::deadline_exceeded(),
        })
    }
}

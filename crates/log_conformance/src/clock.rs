// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Time as seen by the harness. Every wait and deadline goes through a
//! [`Clock`], so runs can be driven in virtual time.

use futures_util::future::{select, Either};
use log_api::RpcError;
use std::cell::Cell;
use std::future::Future;
use std::pin::pin;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub trait Clock {
    /// Monotonic time, used for deadlines.
    fn now(&self) -> Instant;

    /// Wall-clock time in nanoseconds since the Unix epoch.
    fn wall_time_nanos(&self) -> u64;

    /// Completes once `duration` has elapsed.
    #[allow(async_fn_in_trait)]
    async fn sleep(&self, duration: Duration);
}

/// A [`Clock`] backed by the tokio timer. Must be used from within a tokio
/// runtime with the timer enabled.
#[derive(Copy, Clone, Debug, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn wall_time_nanos(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A [`Clock`] whose sleeps return immediately after advancing virtual time.
/// Useful for driving a run deterministically with any executor.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Cell<Duration>,
    wall_origin_nanos: u64,
    sleeps: Cell<u64>,
}

impl ManualClock {
    pub fn new(wall_origin_nanos: u64) -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Cell::new(Duration::ZERO),
            wall_origin_nanos,
            sleeps: Cell::new(0),
        }
    }

    /// Total virtual time slept so far.
    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }

    /// Number of completed sleeps.
    pub fn sleeps(&self) -> u64 {
        self.sleeps.get()
    }

    pub fn advance(&self, duration: Duration) {
        self.elapsed.set(self.elapsed.get() + duration);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed.get()
    }

    fn wall_time_nanos(&self) -> u64 {
        let elapsed = u64::try_from(self.elapsed.get().as_nanos()).unwrap_or(u64::MAX);
        self.wall_origin_nanos.saturating_add(elapsed)
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
        self.sleeps.set(self.sleeps.get() + 1);
    }
}

/// Runs `call` until it completes or `deadline` elapses on `clock`,
/// whichever comes first.
///
/// # Errors
///
/// Returns the call's error, or a `DeadlineExceeded` error if the deadline
/// elapsed first.
pub async fn with_deadline<K, T, F>(clock: &K, deadline: Duration, call: F) -> Result<T, RpcError>
where
    K: Clock,
    F: Future<Output = Result<T, RpcError>>,
{
    let call = pin!(call);
    let timer = pin!(clock.sleep(deadline));
    match select(call, timer).await {
        Either::Left((result, _)) => result,
        Either::Right(((), _)) => Err(RpcError::deadline_exceeded()),
    }
}

// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Waiting for queued leaves to be sequenced.
//!
//! The wait is a small state machine driven by [`SequencingWaiter::step`]:
//! each step checks the total deadline, polls the latest log root once, and
//! sleeps until the next poll if the log is still short.

use crate::{clock::Clock, session::Session, HarnessError, TimeoutError};
use log::info;
use log_api::LogClient;
use std::time::Instant;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SequencingState {
    /// Still waiting. `tree_size` is the size seen at the last poll.
    Polling { polls: u64, tree_size: u64 },
    Sequenced { tree_size: u64 },
    TimedOut { tree_size: u64 },
}

pub struct SequencingWaiter<'s, 'a, C, K> {
    session: &'s Session<'a, C, K>,
    target: u64,
    started: Instant,
    deadline: Instant,
    state: SequencingState,
}

impl<'s, 'a, C: LogClient, K: Clock> SequencingWaiter<'s, 'a, C, K> {
    /// Returns a waiter for the log to reach `target` leaves, with the total
    /// wait budget starting now.
    pub fn new(session: &'s Session<'a, C, K>, target: u64) -> Self {
        let started = session.clock.now();
        Self {
            session,
            target,
            started,
            deadline: started + session.params.sequencing_wait_total,
            state: SequencingState::Polling {
                polls: 0,
                tree_size: 0,
            },
        }
    }

    pub fn state(&self) -> SequencingState {
        self.state
    }

    /// Advances the wait by one poll. Terminal states are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the poll itself fails.
    pub async fn step(&mut self) -> Result<SequencingState, HarnessError> {
        let SequencingState::Polling { polls, tree_size } = self.state else {
            return Ok(self.state);
        };
        let tree_id = self.session.tree_id();
        let clock = self.session.clock;
        if clock.now() >= self.deadline {
            self.state = SequencingState::TimedOut { tree_size };
            return Ok(self.state);
        }

        let root = self.session.latest_root().await?;
        info!("{tree_id}: Leaf count: {}", root.tree_size);
        if root.tree_size >= self.target {
            self.state = SequencingState::Sequenced {
                tree_size: root.tree_size,
            };
            return Ok(self.state);
        }

        self.state = SequencingState::Polling {
            polls: polls + 1,
            tree_size: root.tree_size,
        };
        let pause = self
            .session
            .params
            .sequencing_poll_wait
            .min(self.deadline.saturating_duration_since(clock.now()));
        info!(
            "{tree_id}: Leaves sequenced: {}. Still waiting for {}, next poll in {pause:?}",
            root.tree_size,
            self.target - root.tree_size
        );
        clock.sleep(pause).await;
        Ok(self.state)
    }

    /// Steps until the log is sequenced or the budget is spent, returning the
    /// final tree size.
    ///
    /// # Errors
    ///
    /// Returns a timeout if the budget is spent first, or the error of a
    /// failed poll.
    pub async fn wait(mut self) -> Result<u64, HarnessError> {
        loop {
            match self.step().await? {
                SequencingState::Polling { .. } => {}
                SequencingState::Sequenced { tree_size } => return Ok(tree_size),
                SequencingState::TimedOut { tree_size } => {
                    return Err(TimeoutError::NotSequenced {
                        want: self.target,
                        tree_size,
                        waited: self.session.clock.now() - self.started,
                    }
                    .into())
                }
            }
        }
    }
}

/// Waits for the log to hold `start_leaf + leaf_count` leaves.
///
/// # Errors
///
/// Returns a timeout if `sequencing_wait_total` elapses first.
pub async fn wait_for_sequencing<C: LogClient, K: Clock>(
    session: &Session<'_, C, K>,
) -> Result<u64, HarnessError> {
    let params = session.params;
    info!(
        "{}: Waiting for sequencing, up to {:?}",
        params.tree_id, params.sequencing_wait_total
    );
    SequencingWaiter::new(session, params.start_leaf + params.leaf_count)
        .wait()
        .await
}

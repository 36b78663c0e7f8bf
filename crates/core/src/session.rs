use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::show::model::{Routine, ShowState, ShowStateUpdate};
use crate::show::replicator::{ReplicateError, StateReplicator};

/// The single shared decision that starts a synchronized playback session:
/// the server-committed start instant plus a full snapshot of the routine,
/// so a client needs no further state lookups to begin rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStart {
    /// Server-clock epoch millisecond at which every client begins playback.
    pub target_time: u64,
    pub routine: Routine,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerError {
    /// `activeRoutineIndex` does not resolve to an existing routine, so
    /// there is nothing defined to play.
    #[error("no routine at active index {index} (have {routine_count})")]
    NoActiveRoutine { index: usize, routine_count: usize },
}

/// Owns the canonical show state and commits the clock-relative decisions.
///
/// Exactly one controller exists per server process. The *server* commits to
/// the shared target time rather than letting clients negotiate one, which
/// keeps a single writer for every authoritative decision and avoids any
/// distributed-consensus machinery.
#[derive(Debug, Default)]
pub struct SessionController {
    replicator: StateReplicator,
}

impl SessionController {
    pub fn new(initial: ShowState) -> Self {
        Self {
            replicator: StateReplicator::new(initial),
        }
    }

    pub fn state(&self) -> &ShowState {
        self.replicator.state()
    }

    /// Whole-state replacement from the privileged writer. See
    /// [`StateReplicator::replace`].
    pub fn replace(&mut self, candidate: ShowStateUpdate) -> Result<&ShowState, ReplicateError> {
        self.replicator.replace(candidate)
    }

    /// Begin a synchronized session.
    ///
    /// The effective delay is the explicit request when present, otherwise
    /// the show's configured `synchroDelay`. `server_now_ms` is passed in so
    /// the computation stays deterministic under test.
    pub fn trigger(
        &mut self,
        requested_delay_ms: Option<u64>,
        server_now_ms: u64,
    ) -> Result<SessionStart, TriggerError> {
        let state = self.replicator.state();
        let delay_ms = requested_delay_ms
            .unwrap_or_else(|| (state.synchro_delay.max(0.0) * 1000.0) as u64);
        // delay comes off the wire; an absurd value must clamp, not wrap.
        let target_time = server_now_ms.saturating_add(delay_ms);

        let index = state.active_routine_index;
        let routine_count = state.routines.len();
        let state = self.replicator.state_mut();
        let routine = state
            .active_routine_mut()
            .ok_or(TriggerError::NoActiveRoutine {
                index,
                routine_count,
            })?;

        routine.trigger_time = Some(target_time);
        let snapshot = routine.clone();
        log::info!(
            "triggered routine '{}' for target time {target_time} (+{delay_ms}ms)",
            snapshot.name
        );

        Ok(SessionStart {
            target_time,
            routine: snapshot,
        })
    }

    /// Abandon any in-progress session. Clears recorded trigger times; the
    /// caller broadcasts the payload-free reset signal.
    pub fn reset(&mut self) {
        for routine in &mut self.replicator.state_mut().routines {
            routine.trigger_time = None;
        }
        log::info!("session reset, all trigger times cleared");
    }
}

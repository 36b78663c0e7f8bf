use thiserror::Error;

use super::model::{ShowState, ShowStateUpdate};

/// Why a replacement candidate was rejected. The prior state is kept
/// untouched in every rejection case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplicateError {
    /// The candidate carried no routines, or an empty routine list. Either
    /// would leave the show with nothing to play, so the whole candidate is
    /// discarded.
    #[error("rejected state candidate with missing or empty routine list")]
    NoRoutines,
}

/// Server-side authority over the one canonical [`ShowState`].
///
/// Mutation happens only through [`StateReplicator::replace`]: a whole-object
/// candidate is validated, then shallow-merged over the previous state.
/// Concurrent writers are not distinguished; deliveries are serialized by the
/// caller and the later full write wins.
#[derive(Debug, Default)]
pub struct StateReplicator {
    state: ShowState,
}

impl StateReplicator {
    pub fn new(initial: ShowState) -> Self {
        Self { state: initial }
    }

    pub fn state(&self) -> &ShowState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ShowState {
        &mut self.state
    }

    /// Validate and commit a replacement candidate.
    ///
    /// Returns the committed state so the caller can broadcast it
    /// synchronously with the commit. On rejection the previous state is
    /// retained and nothing should be broadcast.
    pub fn replace(&mut self, candidate: ShowStateUpdate) -> Result<&ShowState, ReplicateError> {
        match &candidate.routines {
            Some(routines) if !routines.is_empty() => {}
            _ => return Err(ReplicateError::NoRoutines),
        }

        candidate.merge_into(&mut self.state);
        log::info!(
            "show state replaced, active routine index {}",
            self.state.active_routine_index
        );
        Ok(&self.state)
    }
}

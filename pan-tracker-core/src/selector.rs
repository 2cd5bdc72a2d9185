//! Target selection
//!
//! Keeps track of which subject the motor follows. Each incoming batch either
//! confirms the current target or, when it has disappeared, re-acquires the
//! subject whose bearing is closest to straight ahead.

use crate::types::{SubjectId, TrackedBatch};

/// Id held before any target has been confirmed
pub const SENTINEL_TARGET_ID: SubjectId = 0;

/// Seed of the running-minimum bearing reduction, in degrees
pub const FALLBACK_THRESHOLD_DEG: f64 = 180.0;

/// Selection state, owned by a single [`TargetSelector`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorState {
    pub current_target_id: SubjectId,
    /// True once a target was reacquired or an override was applied
    pub initialized: bool,
}

impl Default for SelectorState {
    fn default() -> Self {
        Self {
            current_target_id: SENTINEL_TARGET_ID,
            initialized: false,
        }
    }
}

/// Result of resolving one batch against the current target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// The current target is present in the batch
    Confirmed(SubjectId),
    /// The current target was absent; a new one was picked from the batch
    Reacquired(SubjectId),
    /// The current target was absent and nothing qualified as a replacement
    NoMatch,
}

impl SelectionOutcome {
    /// Id of the target after resolution, if the batch produced one
    pub fn target(&self) -> Option<SubjectId> {
        match self {
            SelectionOutcome::Confirmed(id) | SelectionOutcome::Reacquired(id) => Some(*id),
            SelectionOutcome::NoMatch => None,
        }
    }
}

/// Stateful target selector
#[derive(Debug, Default)]
pub struct TargetSelector {
    state: SelectorState,
}

impl TargetSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a specific target id, as if it had been set by an override
    pub fn with_target(id: SubjectId) -> Self {
        Self {
            state: SelectorState {
                current_target_id: id,
                initialized: true,
            },
        }
    }

    pub fn state(&self) -> SelectorState {
        self.state
    }

    pub fn current_target(&self) -> SubjectId {
        self.state.current_target_id
    }

    /// Resolve a batch against the current target
    ///
    /// State only changes on `Reacquired`.
    pub fn resolve(&mut self, batch: &TrackedBatch) -> SelectionOutcome {
        let current = self.state.current_target_id;
        if batch.find(current).is_some() {
            return SelectionOutcome::Confirmed(current);
        }

        log::warn!("Could not match on ID {}; will find closest to current bearing!", current);

        match closest_to_ahead(batch) {
            Some(id) => {
                self.state.current_target_id = id;
                self.state.initialized = true;
                log::debug!("Using closest ID {} instead of requested {}", id, current);
                SelectionOutcome::Reacquired(id)
            }
            None => {
                log::debug!("Could not find any close match among {} subjects", batch.len());
                SelectionOutcome::NoMatch
            }
        }
    }

    /// Force the target to `id`
    ///
    /// No validation against tracked subjects is performed. Returns `true`
    /// when the state changed.
    pub fn override_target(&mut self, id: SubjectId) -> bool {
        if id == self.state.current_target_id {
            return false;
        }
        log::info!("Setting new target ID: {}", id);
        self.state.current_target_id = id;
        self.state.initialized = true;
        true
    }
}

/// Pick the fallback target from a batch
///
/// Running minimum over raw (signed) bearings seeded with
/// [`FALLBACK_THRESHOLD_DEG`]. A subject replaces the best so far when its
/// bearing is `<=` the best bearing, so later subjects win ties. This favours
/// the most negative bearing rather than the one nearest zero; NaN bearings
/// never qualify.
pub fn closest_to_ahead(batch: &TrackedBatch) -> Option<SubjectId> {
    let mut best_id = None;
    let mut best_deviation = FALLBACK_THRESHOLD_DEG;

    for subject in batch {
        if subject.bearing <= best_deviation {
            best_id = Some(subject.id);
            best_deviation = subject.bearing;
        }
    }

    best_id
}

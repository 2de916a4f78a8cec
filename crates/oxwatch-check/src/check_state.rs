use chrono::{DateTime, Utc};
use oxwatch_common::types::{ObjectState, StateType};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of results kept for flap detection.
pub const HISTORY_SIZE: usize = 21;

/// What changed when a result was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    /// The state differs from the previous result.
    pub state_changed: bool,
    pub state_type: StateType,
    /// The result moved the object to a different hard state.
    pub hard_state_changed: bool,
}

/// Runtime record of the check results of one object.
///
/// Only [`record_result`](Self::record_result) and
/// [`add_historical_state`](Self::add_historical_state) mutate it;
/// neither touches acknowledgements, downtimes or notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckState<S> {
    pub current_state: S,
    pub last_state: S,
    pub last_hard_state: S,
    pub state_type: StateType,
    pub current_attempt: u32,
    pub max_attempts: u32,
    pub last_check: Option<DateTime<Utc>>,
    pub last_state_change: Option<DateTime<Utc>>,
    pub last_hard_state_change: Option<DateTime<Utc>>,
    pub is_flapping: bool,
    pub historical_states: VecDeque<S>,
}

impl<S: ObjectState> CheckState<S> {
    /// A fresh object in its OK/UP hard state.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            current_state: S::default(),
            last_state: S::default(),
            last_hard_state: S::default(),
            state_type: StateType::Hard,
            current_attempt: 1,
            max_attempts: max_attempts.max(1),
            last_check: None,
            last_state_change: None,
            last_hard_state_change: None,
            is_flapping: false,
            historical_states: VecDeque::with_capacity(HISTORY_SIZE),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.current_state.is_ok()
    }

    /// Stores a result whose state type is already known.
    pub fn record_result(
        &mut self,
        state: S,
        state_type: StateType,
        now: DateTime<Utc>,
    ) -> StateTransition {
        self.last_state = self.current_state;
        self.current_state = state;
        self.state_type = state_type;
        self.last_check = Some(now);

        let state_changed = self.current_state != self.last_state;
        if state_changed {
            self.last_state_change = Some(now);
        }

        let hard_state_changed =
            state_type == StateType::Hard && self.current_state != self.last_hard_state;
        if hard_state_changed {
            self.last_hard_state = self.current_state;
            self.last_hard_state_change = Some(now);
        }

        self.add_historical_state(state);

        StateTransition {
            state_changed,
            state_type,
            hard_state_changed,
        }
    }

    /// Derives attempt and state type from `max_attempts`, then records.
    ///
    /// A problem turns HARD on the `max_attempts`-th consecutive non-OK
    /// result and stays HARD until recovery. A recovery is HARD when it
    /// ends a HARD problem and SOFT otherwise.
    pub fn apply_result(&mut self, state: S, now: DateTime<Utc>) -> StateTransition {
        let was_ok = self.current_state.is_ok();
        let was_hard = self.state_type == StateType::Hard;

        let state_type = if state.is_ok() {
            self.current_attempt = 1;
            if was_ok || was_hard {
                StateType::Hard
            } else {
                StateType::Soft
            }
        } else if was_ok {
            self.current_attempt = 1;
            if self.max_attempts <= 1 {
                StateType::Hard
            } else {
                StateType::Soft
            }
        } else if was_hard {
            StateType::Hard
        } else {
            self.current_attempt = (self.current_attempt + 1).min(self.max_attempts);
            if self.current_attempt >= self.max_attempts {
                StateType::Hard
            } else {
                StateType::Soft
            }
        };

        self.record_result(state, state_type, now)
    }

    /// Appends to the history ring, dropping the oldest entry when full.
    pub fn add_historical_state(&mut self, state: S) {
        if self.historical_states.len() == HISTORY_SIZE {
            self.historical_states.pop_front();
        }
        self.historical_states.push_back(state);
    }

    /// Percentage of state changes between consecutive history entries.
    pub fn percent_state_change(&self) -> f64 {
        if self.historical_states.len() < 2 {
            return 0.0;
        }
        let changes = self
            .historical_states
            .iter()
            .zip(self.historical_states.iter().skip(1))
            .filter(|(a, b)| a != b)
            .count();
        changes as f64 * 100.0 / (self.historical_states.len() - 1) as f64
    }
}

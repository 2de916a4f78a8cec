//! Scheduled downtimes: suppression windows attached to one monitored object.
//!
//! The [`manager::DowntimeManager`] is the single owner of the live downtime
//! table. It allocates ids, registers start/expire timers with the external
//! scheduler and keeps each target's [`DowntimeDepth`] in step with the
//! downtimes that are in effect. [`finder::DowntimeFinder`] answers read-only
//! queries against the same table.

pub mod downtime;
pub mod error;
pub mod finder;
pub mod manager;

#[cfg(test)]
mod tests;

use oxwatch_common::types::ObjectKey;
use oxwatch_common::Checkable;
use serde::{Deserialize, Serialize};

/// Downtime counters kept on every monitored object.
///
/// An object is in downtime iff `scheduled_downtime_depth > 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DowntimeDepth {
    /// Number of downtimes currently in effect on the object.
    pub scheduled_downtime_depth: u32,
    /// Number of flexible downtimes scheduled but not yet started.
    pub pending_flex_downtime: u32,
}

impl DowntimeDepth {
    pub fn in_downtime(&self) -> bool {
        self.scheduled_downtime_depth > 0
    }

    pub(crate) fn enter(&mut self) {
        self.scheduled_downtime_depth += 1;
    }

    pub(crate) fn leave(&mut self) {
        debug_assert!(
            self.scheduled_downtime_depth > 0,
            "scheduled downtime depth would go negative"
        );
        if self.scheduled_downtime_depth == 0 {
            tracing::error!("scheduled downtime depth already zero, not decrementing");
            return;
        }
        self.scheduled_downtime_depth -= 1;
    }

    pub(crate) fn add_pending_flex(&mut self) {
        self.pending_flex_downtime += 1;
    }

    pub(crate) fn remove_pending_flex(&mut self) {
        self.pending_flex_downtime = self.pending_flex_downtime.saturating_sub(1);
    }
}

/// An object that downtimes can be scheduled against.
pub trait DowntimeTarget: Checkable {
    fn downtime_depth(&self) -> &DowntimeDepth;

    fn downtime_depth_mut(&mut self) -> &mut DowntimeDepth;
}

/// Resolves a downtime's parent key to the live object.
///
/// Downtimes only hold the key of their parent; the objects themselves are
/// owned by whoever built the object graph.
pub trait DowntimeTargets {
    fn target_mut(&mut self, key: &ObjectKey) -> Option<&mut dyn DowntimeTarget>;
}

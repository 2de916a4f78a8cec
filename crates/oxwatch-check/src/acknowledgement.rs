use chrono::{DateTime, Utc};
use oxwatch_common::time::add_secs;
use oxwatch_common::traits::{CommentStore, Scheduler, TimerEvent};
use oxwatch_common::types::{AckType, ObjectKey, ObjectState};
use serde::{Deserialize, Serialize};

/// Acknowledgement of a problem on one object.
///
/// `Normal` clears on any state change, `Sticky` only on a return to OK/UP.
/// With a non-zero timeout an expiry timer is requested when acknowledging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub kind: AckType,
    pub last_acknowledgement_time: Option<DateTime<Utc>>,
    /// Seconds until the acknowledgement expires; 0 never expires.
    pub timeout_secs: u64,
}

impl Acknowledgement {
    pub fn is_acknowledged(&self) -> bool {
        self.kind != AckType::None
    }

    pub fn acknowledge(
        &mut self,
        target: &ObjectKey,
        kind: AckType,
        timeout_secs: u64,
        now: DateTime<Utc>,
        scheduler: &mut dyn Scheduler,
    ) {
        self.kind = kind;
        self.last_acknowledgement_time = Some(now);
        self.timeout_secs = timeout_secs;

        if kind != AckType::None && timeout_secs > 0 {
            scheduler.schedule_at(
                add_secs(now, timeout_secs),
                TimerEvent::ExpireAcknowledgement {
                    target: target.clone(),
                    acknowledged_at: now,
                },
            );
        }
        tracing::info!(object = %target, ?kind, timeout_secs, "Problem acknowledged");
    }

    /// Reconciles the acknowledgement with a freshly recorded result.
    ///
    /// Returns `true` if it was cleared.
    pub fn update_on_state_change<S: ObjectState>(
        &mut self,
        target: &ObjectKey,
        current_state: S,
        last_state: S,
        comments: &mut dyn CommentStore,
    ) -> bool {
        let clear = match self.kind {
            AckType::None => false,
            AckType::Normal => current_state != last_state,
            AckType::Sticky => current_state.is_ok(),
        };
        if clear {
            self.clear(target, comments);
        }
        clear
    }

    /// Handles an expiry timer.
    ///
    /// Ignored unless the object still carries the acknowledgement the timer
    /// was requested for and its timeout has elapsed.
    pub fn expire(
        &mut self,
        target: &ObjectKey,
        acknowledged_at: DateTime<Utc>,
        now: DateTime<Utc>,
        comments: &mut dyn CommentStore,
    ) -> bool {
        if !self.is_acknowledged() || self.last_acknowledgement_time != Some(acknowledged_at) {
            return false;
        }
        if self.timeout_secs == 0 || add_secs(acknowledged_at, self.timeout_secs) > now {
            return false;
        }
        self.clear(target, comments);
        true
    }

    /// Removes the acknowledgement by request.
    pub fn remove(&mut self, target: &ObjectKey, comments: &mut dyn CommentStore) -> bool {
        if !self.is_acknowledged() {
            return false;
        }
        self.clear(target, comments);
        true
    }

    fn clear(&mut self, target: &ObjectKey, comments: &mut dyn CommentStore) {
        self.kind = AckType::None;
        comments.delete_acknowledgement_comments(target);
        tracing::info!(object = %target, "Acknowledgement cleared");
    }
}

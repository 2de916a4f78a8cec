//! Contracts the engine expects from the collaborators around it.
//!
//! The engine never blocks and never owns a clock: timers are requested
//! from a [`Scheduler`], comments are kept by a [`CommentStore`], and
//! notification windows are answered by [`TimePeriods`].

use crate::types::ObjectKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    StartDowntime,
    ExpireDowntime,
    ExpireAcknowledgement,
}

/// A one-shot callback requested from the external scheduler.
///
/// Timers are fire-and-forget. The receiver must check liveness of the
/// referenced downtime or acknowledgement when the timer fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerEvent {
    StartDowntime(u64),
    ExpireDowntime(u64),
    ExpireAcknowledgement {
        target: ObjectKey,
        acknowledged_at: DateTime<Utc>,
    },
}

impl TimerEvent {
    pub fn kind(&self) -> TimerKind {
        match self {
            TimerEvent::StartDowntime(_) => TimerKind::StartDowntime,
            TimerEvent::ExpireDowntime(_) => TimerKind::ExpireDowntime,
            TimerEvent::ExpireAcknowledgement { .. } => TimerKind::ExpireAcknowledgement,
        }
    }
}

pub trait Scheduler {
    /// Requests `event` to be delivered back to the engine at `at`.
    fn schedule_at(&mut self, at: DateTime<Utc>, event: TimerEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentKind {
    User,
    Downtime,
    Acknowledgement,
    Flapping,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub target: ObjectKey,
    pub kind: CommentKind,
    pub entry_time: DateTime<Utc>,
    pub author: String,
    pub text: String,
    pub persistent: bool,
}

pub trait CommentStore {
    /// Stores a comment and returns its id.
    fn add(&mut self, comment: NewComment) -> u64;

    /// Deletes a comment. Unknown ids are ignored.
    fn delete(&mut self, comment_id: u64);

    /// Deletes every non-persistent acknowledgement comment on `target`.
    fn delete_acknowledgement_comments(&mut self, target: &ObjectKey);
}

/// Lookup of named notification time periods.
pub trait TimePeriods {
    /// Whether `t` falls inside `period`.
    fn check_time(&self, period: &str, t: DateTime<Utc>) -> bool;

    /// The earliest instant at or after `t` inside `period`, or `None`
    /// when the period has no valid time at all.
    fn next_valid_time(&self, period: &str, t: DateTime<Utc>) -> Option<DateTime<Utc>>;
}

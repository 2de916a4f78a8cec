//! Notification decisions for monitored objects.
//!
//! Every `notify` call runs in two stages. The viability filter
//! ([`filters`]) decides go/no-go from the object's check state,
//! acknowledgement, downtime depth and notification timers, using one
//! predicate per [`NotificationType`]. On go, the [`notifier::Notifier`]
//! resolves contacts, hands one command per contact to the
//! [`CommandRunner`] and updates the object's counters and timers.

pub mod contact;
pub mod error;
pub mod filters;
pub mod notifier;
pub mod state;


use chrono::{DateTime, Utc};
use contact::Contact;
use oxwatch_common::types::{NotificationOptions, NotificationType, NotifyOn, ObjectKey, StateType};
use oxwatch_common::Checkable;
use state::NotificationState;

/// What the notification engine needs to know about a monitored object.
pub trait Notifiable: Checkable {
    fn state_type(&self) -> StateType;

    /// The [`NotifyOn`] bit of the current state.
    fn state_flag(&self) -> NotifyOn;

    /// Current state as text, e.g. `"WARNING"`.
    fn state_label(&self) -> String;

    fn last_hard_state_change(&self) -> Option<DateTime<Utc>>;

    fn is_acknowledged(&self) -> bool;

    fn is_flapping(&self) -> bool;

    fn scheduled_downtime_depth(&self) -> u32;

    /// Volatile services re-notify on every hard problem result.
    fn is_volatile(&self) -> bool {
        false
    }

    fn notification_state(&self) -> &NotificationState;

    fn notification_state_mut(&mut self) -> &mut NotificationState;

    fn notify_on(&self, flag: NotifyOn) -> bool {
        self.notification_state().notified_states.contains(flag)
    }
}

/// Snapshot of one notification, handed to telemetry and command runners.
#[derive(Debug, Clone)]
pub struct NotificationEvent<'a> {
    pub notification_id: u64,
    pub kind: NotificationType,
    pub object: &'a ObjectKey,
    pub state: String,
    pub author: &'a str,
    pub comment: &'a str,
    pub options: NotificationOptions,
    pub escalated: bool,
    pub notification_number: u32,
    pub time: DateTime<Utc>,
}

/// Answer of a telemetry sink to a starting notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerVerdict {
    Proceed,
    /// Drop this notification.
    Cancel,
    /// The sink handled delivery itself.
    Override,
}

/// Fire-and-forget event sink around notification dispatch.
pub trait Telemetry {
    fn notification_start(&mut self, event: &NotificationEvent<'_>) -> BrokerVerdict;

    fn notification_end(&mut self, event: &NotificationEvent<'_>, contacts_notified: usize);
}

/// One command invocation for one contact.
#[derive(Debug, Clone)]
pub struct ContactNotification<'a> {
    pub event: &'a NotificationEvent<'a>,
    pub contact: &'a Contact,
    pub command: &'a str,
}

/// Runs a contact's notification command.
pub trait CommandRunner {
    /// # Errors
    ///
    /// Returns an error if the command is unknown or did not run cleanly.
    /// The notifier logs it and continues with the next command.
    fn run(&mut self, notification: &ContactNotification<'_>) -> error::Result<()>;
}

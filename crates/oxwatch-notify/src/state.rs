use crate::contact::{Contact, ContactGroup};
use chrono::{DateTime, Utc};
use oxwatch_common::time::add_secs;
use oxwatch_common::types::{NotificationFlags, NotificationType, NotifyOn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Notification timers and counters of one object.
///
/// Everything here is replayed verbatim by retention on restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRuntime {
    pub current_notification_number: u32,
    pub current_notification_id: u64,
    pub first_notification_time: Option<DateTime<Utc>>,
    pub last_notification_time: Option<DateTime<Utc>>,
    pub next_notification_time: Option<DateTime<Utc>>,
    /// Set after a problem notification when the interval is 0.
    pub no_more_notifications: bool,
    /// Notification types currently active on the object.
    pub current_notifications_flag: NotificationFlags,
}

impl NotificationRuntime {
    /// Marks `kind` active, clearing the types it supersedes.
    pub fn set_active(&mut self, kind: NotificationType) {
        let flags = &mut self.current_notifications_flag;
        match kind {
            NotificationType::Problem => flags.remove(NotificationFlags::RECOVERY),
            NotificationType::Recovery => flags.remove(NotificationFlags::PROBLEM),
            NotificationType::FlappingStart => flags.remove(
                NotificationFlags::FLAPPINGSTOP | NotificationFlags::FLAPPINGDISABLED,
            ),
            NotificationType::FlappingStop | NotificationType::FlappingDisabled => {
                flags.remove(NotificationFlags::FLAPPINGSTART)
            }
            _ => {}
        }
        flags.insert(kind.flag());
    }

    pub fn is_active(&self, kind: NotificationType) -> bool {
        self.current_notifications_flag.contains(kind.flag())
    }
}

/// Per-object notification configuration plus its [`NotificationRuntime`].
#[derive(Debug, Clone)]
pub struct NotificationState {
    pub contacts: BTreeMap<String, Arc<Contact>>,
    pub contact_groups: BTreeMap<String, Arc<ContactGroup>>,
    pub notified_states: NotifyOn,
    pub notifications_enabled: bool,
    /// Seconds between re-notifications; 0 notifies once per problem.
    pub notification_interval: u64,
    pub notification_period: Option<String>,
    pub first_notification_delay: u64,
    pub recovery_notification_delay: u64,
    pub runtime: NotificationRuntime,
}

impl Default for NotificationState {
    fn default() -> Self {
        Self {
            contacts: BTreeMap::new(),
            contact_groups: BTreeMap::new(),
            notified_states: NotifyOn::all(),
            notifications_enabled: true,
            notification_interval: 1800,
            notification_period: None,
            first_notification_delay: 0,
            recovery_notification_delay: 0,
            runtime: NotificationRuntime::default(),
        }
    }
}

impl NotificationState {
    pub fn add_contact(&mut self, contact: Arc<Contact>) {
        self.contacts.insert(contact.name.clone(), contact);
    }

    pub fn add_contact_group(&mut self, group: Arc<ContactGroup>) {
        self.contact_groups.insert(group.name.clone(), group);
    }

    /// Direct contacts plus every group member, de-duplicated by name.
    pub fn flatten_contacts(&self) -> BTreeMap<String, Arc<Contact>> {
        let mut recipients = self.contacts.clone();
        for group in self.contact_groups.values() {
            for member in &group.members {
                recipients
                    .entry(member.name.clone())
                    .or_insert_with(|| Arc::clone(member));
            }
        }
        recipients
    }

    pub fn first_notification_delay_elapsed(
        &self,
        last_hard_state_change: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        match last_hard_state_change {
            Some(changed) => add_secs(changed, self.first_notification_delay) <= now,
            None => true,
        }
    }

    pub fn recovery_delay_elapsed(&self, now: DateTime<Utc>) -> bool {
        match self.runtime.first_notification_time {
            Some(first) => add_secs(first, self.recovery_notification_delay) <= now,
            None => true,
        }
    }

    /// Forgets the current problem once the object has recovered.
    pub fn reset_problem_cycle(&mut self) {
        let rt = &mut self.runtime;
        rt.current_notification_number = 0;
        rt.first_notification_time = None;
        rt.next_notification_time = None;
        rt.no_more_notifications = false;
        rt.current_notifications_flag
            .remove(NotificationFlags::PROBLEM);
    }
}

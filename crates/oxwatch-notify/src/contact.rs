use crate::Notifiable;
use chrono::{DateTime, Utc};
use oxwatch_common::traits::TimePeriods;
use oxwatch_common::types::{NotificationOptions, NotificationType, NotifyOn};
use oxwatch_common::Checkable;
use std::sync::Arc;

/// A notification recipient.
///
/// Contacts are owned by the configuration graph; objects hold shared
/// references for lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub host_notifications_enabled: bool,
    pub service_notifications_enabled: bool,
    pub host_notification_options: NotifyOn,
    pub service_notification_options: NotifyOn,
    pub host_notification_commands: Vec<String>,
    pub service_notification_commands: Vec<String>,
    pub notification_period: Option<String>,
}

impl Contact {
    /// A contact that accepts everything and has no commands yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host_notifications_enabled: true,
            service_notifications_enabled: true,
            host_notification_options: NotifyOn::all(),
            service_notification_options: NotifyOn::all(),
            host_notification_commands: Vec::new(),
            service_notification_commands: Vec::new(),
            notification_period: None,
        }
    }

    pub fn commands_for(&self, is_host: bool) -> &[String] {
        if is_host {
            &self.host_notification_commands
        } else {
            &self.service_notification_commands
        }
    }

    /// Contact-level filter, applied after the object-level one.
    pub fn is_viable(
        &self,
        object: &dyn Notifiable,
        kind: NotificationType,
        options: NotificationOptions,
        now: DateTime<Utc>,
        periods: &dyn TimePeriods,
    ) -> bool {
        if options.contains(NotificationOptions::FORCED) {
            return true;
        }

        let (enabled, accepted) = if object.is_host() {
            (self.host_notifications_enabled, self.host_notification_options)
        } else {
            (
                self.service_notifications_enabled,
                self.service_notification_options,
            )
        };
        if !enabled {
            return false;
        }

        if let Some(period) = &self.notification_period {
            if !periods.check_time(period, now) {
                return false;
            }
        }

        match kind {
            NotificationType::Problem | NotificationType::Recovery => {
                accepted.contains(object.state_flag())
            }
            k if k.is_flapping() => accepted.contains(NotifyOn::FLAPPING),
            k if k.is_downtime() => accepted.contains(NotifyOn::DOWNTIME),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactGroup {
    pub name: String,
    pub members: Vec<Arc<Contact>>,
}

impl ContactGroup {
    pub fn new(name: impl Into<String>, members: Vec<Arc<Contact>>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }
}

use chrono::{DateTime, Utc};
use oxwatch_common::types::{NotificationType, ObjectKey};
use oxwatch_notify::{BrokerVerdict, NotificationEvent, Telemetry};
use std::collections::VecDeque;

const HISTORY_LIMIT: usize = 256;

/// A finished notification, as remembered by the [`TracingBroker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRecord {
    pub notification_id: u64,
    pub kind: NotificationType,
    pub object: ObjectKey,
    pub notification_number: u32,
    pub contacts_notified: usize,
    pub time: DateTime<Utc>,
}

/// Telemetry sink that logs every notification and keeps the most recent
/// ones in memory.
#[derive(Debug, Default)]
pub struct TracingBroker {
    history: VecDeque<NotificationRecord>,
}

impl TracingBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> impl Iterator<Item = &NotificationRecord> {
        self.history.iter()
    }

    pub fn last(&self) -> Option<&NotificationRecord> {
        self.history.back()
    }
}

impl Telemetry for TracingBroker {
    fn notification_start(&mut self, event: &NotificationEvent<'_>) -> BrokerVerdict {
        tracing::debug!(
            notification_id = event.notification_id,
            object = %event.object,
            kind = %event.kind,
            state = %event.state,
            number = event.notification_number,
            escalated = event.escalated,
            "Notification starting"
        );
        BrokerVerdict::Proceed
    }

    fn notification_end(&mut self, event: &NotificationEvent<'_>, contacts_notified: usize) {
        tracing::info!(
            notification_id = event.notification_id,
            object = %event.object,
            kind = %event.kind,
            contacts_notified,
            "Notification finished"
        );
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(NotificationRecord {
            notification_id: event.notification_id,
            kind: event.kind,
            object: event.object.clone(),
            notification_number: event.notification_number,
            contacts_notified,
            time: event.time,
        });
    }
}

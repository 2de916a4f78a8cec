use crate::broker::TracingBroker;
use crate::period::TimePeriodTable;
use chrono::{DateTime, Utc};
use oxwatch_common::types::{NotificationOptions, NotificationType};
use oxwatch_notify::notifier::{Collaborators, Notifier, NotifyOutcome};
use oxwatch_notify::{CommandRunner, Notifiable};

/// The notifier together with the collaborators it dispatches through.
pub struct Dispatcher {
    pub notifier: Notifier,
    pub periods: TimePeriodTable,
    pub broker: TracingBroker,
    pub runner: Box<dyn CommandRunner>,
}

impl Dispatcher {
    pub fn new(notifier: Notifier, periods: TimePeriodTable, runner: Box<dyn CommandRunner>) -> Self {
        Self {
            notifier,
            periods,
            broker: TracingBroker::new(),
            runner,
        }
    }

    pub fn notify(
        &mut self,
        object: &mut dyn Notifiable,
        kind: NotificationType,
        author: &str,
        comment: &str,
        options: NotificationOptions,
        now: DateTime<Utc>,
    ) -> NotifyOutcome {
        let collab = Collaborators {
            periods: &self.periods,
            telemetry: &mut self.broker,
            runner: self.runner.as_mut(),
        };
        self.notifier
            .notify(object, kind, author, comment, options, now, collab)
    }
}

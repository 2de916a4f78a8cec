use crate::filters::{filter_for, FilterContext, NotViable};
use crate::{
    BrokerVerdict, CommandRunner, ContactNotification, Notifiable, NotificationEvent, Telemetry,
};
use chrono::{DateTime, Utc};
use oxwatch_common::time::add_secs;
use oxwatch_common::traits::TimePeriods;
use oxwatch_common::types::{NotificationOptions, NotificationType};
use oxwatch_common::Checkable;

/// Fallback used when a notification period has no valid time left.
const NO_VALID_TIME_SECS: u64 = 365 * 24 * 60 * 60;

/// External services a dispatch talks to.
pub struct Collaborators<'a> {
    pub periods: &'a dyn TimePeriods,
    pub telemetry: &'a mut dyn Telemetry,
    pub runner: &'a mut dyn CommandRunner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    NotViable(NotViable),
    /// Telemetry cancelled or took over delivery.
    Cancelled,
    Dispatched {
        notification_id: u64,
        contacts_notified: usize,
    },
}

impl NotifyOutcome {
    pub fn contacts_notified(&self) -> usize {
        match self {
            NotifyOutcome::Dispatched {
                contacts_notified, ..
            } => *contacts_notified,
            _ => 0,
        }
    }
}

/// Process-wide notification switch and id allocator.
#[derive(Debug, Clone)]
pub struct Notifier {
    pub enabled: bool,
    next_notification_id: u64,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Notifier {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            next_notification_id: 1,
        }
    }

    /// Next id that will be handed out.
    pub fn peek_notification_id(&self) -> u64 {
        self.next_notification_id
    }

    /// Resumes allocation after ids restored from retention.
    pub fn restore_notification_id(&mut self, next: u64) {
        self.next_notification_id = self.next_notification_id.max(next);
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_notification_id;
        self.next_notification_id += 1;
        id
    }

    /// Escalations are not modelled; every notification goes to the
    /// object's own contacts.
    pub fn should_be_escalated(&self, _object: &dyn Notifiable) -> bool {
        false
    }

    /// Runs the outer gates and the per-type filter.
    ///
    /// Outside the notification period a PROBLEM or RECOVERY caches the next
    /// valid period time in `next_notification_time`.
    pub fn is_notification_viable(
        &self,
        object: &mut dyn Notifiable,
        kind: NotificationType,
        options: NotificationOptions,
        now: DateTime<Utc>,
        periods: &dyn TimePeriods,
    ) -> Result<(), NotViable> {
        if options.contains(NotificationOptions::FORCED) {
            return Ok(());
        }
        if !self.enabled {
            return Err(NotViable::GloballyDisabled);
        }

        if let Some(period) = object.notification_state().notification_period.clone() {
            if !periods.check_time(&period, now) {
                if kind.is_normal() {
                    let next = periods
                        .next_valid_time(&period, now)
                        .unwrap_or_else(|| add_secs(now, NO_VALID_TIME_SECS));
                    object
                        .notification_state_mut()
                        .runtime
                        .next_notification_time = Some(next);
                }
                return Err(NotViable::OutsidePeriod);
            }
        }

        if !object.notification_state().notifications_enabled {
            return Err(NotViable::ObjectDisabled);
        }

        let filter = filter_for(kind);
        filter(&*object, &FilterContext { kind, now })
    }

    /// Filters and, when viable, dispatches one notification.
    #[allow(clippy::too_many_arguments)]
    pub fn notify(
        &mut self,
        object: &mut dyn Notifiable,
        kind: NotificationType,
        author: &str,
        comment: &str,
        options: NotificationOptions,
        now: DateTime<Utc>,
        collab: Collaborators<'_>,
    ) -> NotifyOutcome {
        if let Err(reason) = self.is_notification_viable(object, kind, options, now, collab.periods)
        {
            tracing::debug!(
                object = %object.key(),
                kind = %kind,
                reason = %reason,
                "Notification not viable"
            );
            return NotifyOutcome::NotViable(reason);
        }

        let increment = kind.is_normal() || options.contains(NotificationOptions::INCREMENT);
        let notification_id = self.allocate_id();
        let escalated = self.should_be_escalated(&*object);

        let saved = object.notification_state().runtime.clone();
        {
            let rt = &mut object.notification_state_mut().runtime;
            if increment {
                rt.current_notification_number += 1;
            }
            rt.current_notification_id = notification_id;
        }

        let recipients = object.notification_state().flatten_contacts();
        let key = object.key().clone();
        let event = NotificationEvent {
            notification_id,
            kind,
            object: &key,
            state: object.state_label(),
            author,
            comment,
            options,
            escalated,
            notification_number: object.notification_state().runtime.current_notification_number,
            time: now,
        };

        match collab.telemetry.notification_start(&event) {
            BrokerVerdict::Proceed => {}
            verdict => {
                object.notification_state_mut().runtime = saved;
                tracing::info!(
                    object = %key,
                    kind = %kind,
                    ?verdict,
                    "Notification stopped by telemetry"
                );
                return NotifyOutcome::Cancelled;
            }
        }

        if kind == NotificationType::Problem {
            let rt = &mut object.notification_state_mut().runtime;
            if rt.first_notification_time.is_none() {
                rt.first_notification_time = Some(now);
            }
        }

        let mut contacts_notified = 0;
        let skip_contacts = kind == NotificationType::Recovery
            && !object.notification_state().recovery_delay_elapsed(now);
        if !skip_contacts {
            for contact in recipients.values() {
                if !contact.is_viable(&*object, kind, options, now, collab.periods) {
                    continue;
                }
                let commands = contact.commands_for(key.is_host());
                if commands.is_empty() {
                    continue;
                }
                for command in commands {
                    let notification = ContactNotification {
                        event: &event,
                        contact: contact.as_ref(),
                        command,
                    };
                    if let Err(e) = collab.runner.run(&notification) {
                        tracing::warn!(
                            contact = %contact.name,
                            command = %command,
                            "Notification command failed: {e}"
                        );
                    }
                }
                contacts_notified += 1;
            }
        }

        let state = object.notification_state_mut();
        if kind.is_normal() {
            if contacts_notified > 0 {
                if state.notification_interval == 0 {
                    state.runtime.no_more_notifications = true;
                } else {
                    let mut next = add_secs(now, state.notification_interval);
                    if let Some(period) = &state.notification_period {
                        if let Some(valid) = collab.periods.next_valid_time(period, next) {
                            next = valid;
                        }
                    }
                    state.runtime.next_notification_time = Some(next);
                }
            } else if increment {
                state.runtime.current_notification_number =
                    state.runtime.current_notification_number.saturating_sub(1);
            }
        } else if increment && contacts_notified == 0 {
            state.runtime.current_notification_number =
                state.runtime.current_notification_number.saturating_sub(1);
        }

        if contacts_notified > 0 {
            state.runtime.set_active(kind);
        }

        collab.telemetry.notification_end(&event, contacts_notified);

        // Written on every dispatched call, even when no contact was reached.
        state.runtime.last_notification_time = Some(now);

        tracing::info!(
            object = %key,
            kind = %kind,
            notification_id,
            contacts_notified,
            "Notification dispatched"
        );

        NotifyOutcome::Dispatched {
            notification_id,
            contacts_notified,
        }
    }
}

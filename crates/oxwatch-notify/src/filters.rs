//! Per-type viability predicates.
//!
//! [`filter_for`] maps each [`NotificationType`] to the predicate deciding
//! whether it may be sent right now. The predicates only read the object;
//! the global gates (forced, enabled, period) run before them in
//! [`Notifier::is_notification_viable`](crate::notifier::Notifier::is_notification_viable).

use crate::Notifiable;
use chrono::{DateTime, Utc};
use oxwatch_common::types::{NotificationType, NotifyOn, StateType};
use oxwatch_common::Checkable;

/// Why a notification was filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NotViable {
    #[error("notifications are disabled globally")]
    GloballyDisabled,
    #[error("outside the notification period")]
    OutsidePeriod,
    #[error("notifications are disabled for this object")]
    ObjectDisabled,
    #[error("object is in scheduled downtime")]
    InDowntime,
    #[error("object is in an OK state")]
    StateIsOk,
    #[error("object has not recovered")]
    StateNotOk,
    #[error("notification option for this state or event is not set")]
    OptionNotSet,
    #[error("state is soft")]
    SoftState,
    #[error("problem is acknowledged")]
    Acknowledged,
    #[error("first notification delay has not elapsed")]
    FirstDelayPending,
    #[error("recovery notification delay has not elapsed")]
    RecoveryDelayPending,
    #[error("object is flapping")]
    Flapping,
    #[error("no problem notification was sent before")]
    NoPriorProblem,
    #[error("no more notifications for this problem")]
    NoMoreNotifications,
    #[error("not enough time since the last notification")]
    TooSoon,
}

#[derive(Debug, Clone, Copy)]
pub struct FilterContext {
    pub kind: NotificationType,
    pub now: DateTime<Utc>,
}

pub type ViabilityFilter = fn(&dyn Notifiable, &FilterContext) -> Result<(), NotViable>;

pub fn filter_for(kind: NotificationType) -> ViabilityFilter {
    match kind {
        NotificationType::Custom => custom_viable,
        NotificationType::Acknowledgement => acknowledgement_viable,
        NotificationType::FlappingStart
        | NotificationType::FlappingStop
        | NotificationType::FlappingDisabled => flapping_viable,
        NotificationType::DowntimeStart
        | NotificationType::DowntimeStop
        | NotificationType::DowntimeCancelled => downtime_viable,
        NotificationType::Problem | NotificationType::Recovery => normal_viable,
    }
}

fn not_in_downtime(object: &dyn Notifiable) -> Result<(), NotViable> {
    if object.scheduled_downtime_depth() > 0 {
        return Err(NotViable::InDowntime);
    }
    Ok(())
}

fn custom_viable(object: &dyn Notifiable, _ctx: &FilterContext) -> Result<(), NotViable> {
    not_in_downtime(object)
}

fn acknowledgement_viable(object: &dyn Notifiable, _ctx: &FilterContext) -> Result<(), NotViable> {
    if object.is_ok() {
        return Err(NotViable::StateIsOk);
    }
    Ok(())
}

fn flapping_viable(object: &dyn Notifiable, _ctx: &FilterContext) -> Result<(), NotViable> {
    if !object.notify_on(NotifyOn::FLAPPING) {
        return Err(NotViable::OptionNotSet);
    }
    not_in_downtime(object)
}

fn downtime_viable(object: &dyn Notifiable, _ctx: &FilterContext) -> Result<(), NotViable> {
    if !object.notify_on(NotifyOn::DOWNTIME) {
        return Err(NotViable::OptionNotSet);
    }
    not_in_downtime(object)
}

/// PROBLEM and RECOVERY.
fn normal_viable(object: &dyn Notifiable, ctx: &FilterContext) -> Result<(), NotViable> {
    let recovery = ctx.kind == NotificationType::Recovery;
    let state = object.notification_state();
    let rt = &state.runtime;

    if object.state_type() != StateType::Hard {
        return Err(NotViable::SoftState);
    }
    if object.is_acknowledged() {
        return Err(NotViable::Acknowledged);
    }
    match (recovery, object.is_ok()) {
        (false, true) => return Err(NotViable::StateIsOk),
        (true, false) => return Err(NotViable::StateNotOk),
        _ => {}
    }
    if !object.notify_on(object.state_flag()) {
        return Err(NotViable::OptionNotSet);
    }
    if !recovery
        && rt.current_notification_number == 0
        && !state.first_notification_delay_elapsed(object.last_hard_state_change(), ctx.now)
    {
        return Err(NotViable::FirstDelayPending);
    }
    if recovery && !state.recovery_delay_elapsed(ctx.now) {
        return Err(NotViable::RecoveryDelayPending);
    }
    if object.is_flapping() {
        return Err(NotViable::Flapping);
    }
    not_in_downtime(object)?;

    if recovery {
        if rt.current_notification_number == 0 || !rt.is_active(NotificationType::Problem) {
            return Err(NotViable::NoPriorProblem);
        }
        // Recoveries are not throttled by the re-notification interval.
        return Ok(());
    }

    if rt.no_more_notifications {
        return Err(NotViable::NoMoreNotifications);
    }
    if !object.is_volatile() {
        if let Some(next) = rt.next_notification_time {
            if ctx.now < next {
                return Err(NotViable::TooSoon);
            }
        }
    }
    Ok(())
}

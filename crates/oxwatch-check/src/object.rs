use crate::acknowledgement::Acknowledgement;
use crate::check_state::CheckState;
use chrono::{DateTime, Utc};
use oxwatch_common::types::{HostState, NotifyOn, ObjectKey, ObjectState, ServiceState, StateType};
use oxwatch_common::Checkable;
use oxwatch_downtime::{DowntimeDepth, DowntimeTarget};
use oxwatch_notify::state::NotificationState;
use oxwatch_notify::Notifiable;

/// A monitored object composed of its check, acknowledgement, downtime and
/// notification state.
#[derive(Debug, Clone)]
pub struct Monitored<S> {
    pub key: ObjectKey,
    pub check: CheckState<S>,
    pub acknowledgement: Acknowledgement,
    pub downtime: DowntimeDepth,
    pub notifications: NotificationState,
    /// Re-notify on every hard problem result regardless of the interval.
    pub volatile: bool,
}

pub type Host = Monitored<HostState>;
pub type Service = Monitored<ServiceState>;

impl<S: ObjectState> Monitored<S> {
    fn with_key(key: ObjectKey, max_attempts: u32) -> Self {
        Self {
            key,
            check: CheckState::new(max_attempts),
            acknowledgement: Acknowledgement::default(),
            downtime: DowntimeDepth::default(),
            notifications: NotificationState::default(),
            volatile: false,
        }
    }
}

impl Monitored<HostState> {
    pub fn new(name: impl Into<String>, max_attempts: u32) -> Self {
        Self::with_key(ObjectKey::host(name), max_attempts)
    }
}

impl Monitored<ServiceState> {
    pub fn new(host: impl Into<String>, service: impl Into<String>, max_attempts: u32) -> Self {
        Self::with_key(ObjectKey::service(host, service), max_attempts)
    }
}

impl<S: ObjectState> Checkable for Monitored<S> {
    fn key(&self) -> &ObjectKey {
        &self.key
    }

    fn is_ok(&self) -> bool {
        self.check.is_ok()
    }
}

impl<S: ObjectState> DowntimeTarget for Monitored<S> {
    fn downtime_depth(&self) -> &DowntimeDepth {
        &self.downtime
    }

    fn downtime_depth_mut(&mut self) -> &mut DowntimeDepth {
        &mut self.downtime
    }
}

impl<S: ObjectState> Notifiable for Monitored<S> {
    fn state_type(&self) -> StateType {
        self.check.state_type
    }

    fn state_flag(&self) -> NotifyOn {
        self.check.current_state.notify_flag()
    }

    fn state_label(&self) -> String {
        self.check.current_state.to_string()
    }

    fn last_hard_state_change(&self) -> Option<DateTime<Utc>> {
        self.check.last_hard_state_change
    }

    fn is_acknowledged(&self) -> bool {
        self.acknowledgement.is_acknowledged()
    }

    fn is_flapping(&self) -> bool {
        self.check.is_flapping
    }

    fn scheduled_downtime_depth(&self) -> u32 {
        self.downtime.scheduled_downtime_depth
    }

    fn is_volatile(&self) -> bool {
        self.volatile
    }

    fn notification_state(&self) -> &NotificationState {
        &self.notifications
    }

    fn notification_state_mut(&mut self) -> &mut NotificationState {
        &mut self.notifications
    }
}

/// A host or a service, as stored in the [`ObjectRegistry`](crate::registry::ObjectRegistry).
#[derive(Debug, Clone)]
pub enum MonitoredObject {
    Host(Host),
    Service(Service),
}

impl MonitoredObject {
    pub fn key(&self) -> &ObjectKey {
        match self {
            MonitoredObject::Host(h) => &h.key,
            MonitoredObject::Service(s) => &s.key,
        }
    }

    pub fn is_ok(&self) -> bool {
        match self {
            MonitoredObject::Host(h) => h.check.is_ok(),
            MonitoredObject::Service(s) => s.check.is_ok(),
        }
    }

    pub fn is_flapping(&self) -> bool {
        match self {
            MonitoredObject::Host(h) => h.check.is_flapping,
            MonitoredObject::Service(s) => s.check.is_flapping,
        }
    }

    pub fn set_flapping(&mut self, flapping: bool) {
        match self {
            MonitoredObject::Host(h) => h.check.is_flapping = flapping,
            MonitoredObject::Service(s) => s.check.is_flapping = flapping,
        }
    }

    pub fn acknowledgement(&self) -> &Acknowledgement {
        match self {
            MonitoredObject::Host(h) => &h.acknowledgement,
            MonitoredObject::Service(s) => &s.acknowledgement,
        }
    }

    pub fn acknowledgement_mut(&mut self) -> &mut Acknowledgement {
        match self {
            MonitoredObject::Host(h) => &mut h.acknowledgement,
            MonitoredObject::Service(s) => &mut s.acknowledgement,
        }
    }

    pub fn as_notifiable(&self) -> &dyn Notifiable {
        match self {
            MonitoredObject::Host(h) => h,
            MonitoredObject::Service(s) => s,
        }
    }

    pub fn as_notifiable_mut(&mut self) -> &mut dyn Notifiable {
        match self {
            MonitoredObject::Host(h) => h,
            MonitoredObject::Service(s) => s,
        }
    }

    pub fn as_downtime_target_mut(&mut self) -> &mut dyn DowntimeTarget {
        match self {
            MonitoredObject::Host(h) => h,
            MonitoredObject::Service(s) => s,
        }
    }

    pub fn as_host(&self) -> Option<&Host> {
        match self {
            MonitoredObject::Host(h) => Some(h),
            MonitoredObject::Service(_) => None,
        }
    }

    pub fn as_service(&self) -> Option<&Service> {
        match self {
            MonitoredObject::Service(s) => Some(s),
            MonitoredObject::Host(_) => None,
        }
    }
}

impl From<Host> for MonitoredObject {
    fn from(host: Host) -> Self {
        MonitoredObject::Host(host)
    }
}

impl From<Service> for MonitoredObject {
    fn from(service: Service) -> Self {
        MonitoredObject::Service(service)
    }
}

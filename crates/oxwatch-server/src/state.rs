use crate::comments::CommentBook;
use crate::dispatch::Dispatcher;
use crate::error::{EngineError, Result};
use crate::timers::TimerQueue;
use chrono::{DateTime, Utc};
use oxwatch_check::{MonitoredObject, ObjectRegistry, StateTransition};
use oxwatch_common::traits::{CommentKind, CommentStore, NewComment, TimerEvent};
use oxwatch_common::types::{
    AckType, HostState, NotificationOptions, NotificationType, ObjectKey, ServiceState, StateType,
};
use oxwatch_downtime::downtime::{Downtime, DowntimeRequest};
use oxwatch_downtime::finder::DowntimeFinder;
use oxwatch_downtime::manager::{DowntimeManager, ExpireOutcome};
use oxwatch_notify::notifier::NotifyOutcome;

/// Parameters of an acknowledgement request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcknowledgeRequest {
    pub kind: AckType,
    pub author: String,
    pub comment: String,
    /// Send an ACKNOWLEDGEMENT notification.
    pub notify: bool,
    /// Keep the comment after the acknowledgement is cleared.
    pub persistent: bool,
    /// 0 never expires.
    pub timeout_secs: u64,
}

/// The engine hub: monitored objects, the downtime table and the
/// collaborators they talk to.
///
/// Single-threaded. Every operation takes the current time explicitly and
/// runs to completion before the next one starts.
pub struct Engine {
    pub objects: ObjectRegistry,
    pub downtimes: DowntimeManager,
    pub timers: TimerQueue,
    pub comments: CommentBook,
    pub dispatcher: Dispatcher,
}

impl Engine {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            objects: ObjectRegistry::new(),
            downtimes: DowntimeManager::new(),
            timers: TimerQueue::new(),
            comments: CommentBook::new(),
            dispatcher,
        }
    }

    pub fn add_object(&mut self, object: impl Into<MonitoredObject>) -> Result<()> {
        let object = object.into();
        let key = object.key().to_string();
        if !self.objects.insert(object) {
            return Err(EngineError::DuplicateObject(key));
        }
        Ok(())
    }

    pub fn object(&self, key: &ObjectKey) -> Option<&MonitoredObject> {
        self.objects.get(key)
    }

    pub fn finder(&self) -> DowntimeFinder<'_> {
        DowntimeFinder::new(&self.downtimes)
    }

    /// Downtime ids matching every `(key, value)` criterion.
    pub fn find_downtimes(&self, pairs: &[(&str, &str)]) -> Vec<u64> {
        self.finder().find_matching_pairs(pairs)
    }

    // ---- Check results ----

    pub fn process_host_result(
        &mut self,
        host: &str,
        state: HostState,
        now: DateTime<Utc>,
    ) -> Result<StateTransition> {
        let key = ObjectKey::host(host);
        let Some(MonitoredObject::Host(object)) = self.objects.get_mut(&key) else {
            return Err(EngineError::UnknownObject(key.to_string()));
        };
        let transition = object.check.apply_result(state, now);
        object.acknowledgement.update_on_state_change(
            &key,
            object.check.current_state,
            object.check.last_state,
            &mut self.comments,
        );
        self.after_result(&key, transition, now);
        Ok(transition)
    }

    pub fn process_service_result(
        &mut self,
        host: &str,
        service: &str,
        state: ServiceState,
        now: DateTime<Utc>,
    ) -> Result<StateTransition> {
        let key = ObjectKey::service(host, service);
        let Some(MonitoredObject::Service(object)) = self.objects.get_mut(&key) else {
            return Err(EngineError::UnknownObject(key.to_string()));
        };
        let transition = object.check.apply_result(state, now);
        object.acknowledgement.update_on_state_change(
            &key,
            object.check.current_state,
            object.check.last_state,
            &mut self.comments,
        );
        self.after_result(&key, transition, now);
        Ok(transition)
    }

    /// Processes a result given as a raw state code.
    pub fn process_result(
        &mut self,
        key: &ObjectKey,
        code: u8,
        now: DateTime<Utc>,
    ) -> Result<StateTransition> {
        match key.service_name() {
            None => {
                let state = HostState::try_from(code).map_err(EngineError::InvalidState)?;
                self.process_host_result(key.host_name(), state, now)
            }
            Some(service) => {
                let state = ServiceState::try_from(code).map_err(EngineError::InvalidState)?;
                self.process_service_result(key.host_name(), service, state, now)
            }
        }
    }

    /// Flexible downtime activation and PROBLEM/RECOVERY notification for a
    /// result that was just recorded and reconciled with the acknowledgement.
    fn after_result(&mut self, key: &ObjectKey, transition: StateTransition, now: DateTime<Utc>) {
        let Some(object) = self.objects.get_mut(key) else {
            return;
        };

        if !object.is_ok() {
            let due = self
                .downtimes
                .flex_candidates(object.as_downtime_target_mut(), now);
            for id in &due {
                if let Some(downtime) = self.downtimes.get(*id) {
                    self.dispatcher.notify(
                        object.as_notifiable_mut(),
                        NotificationType::DowntimeStart,
                        &downtime.author,
                        &downtime.comment,
                        NotificationOptions::empty(),
                        now,
                    );
                }
            }
            if !due.is_empty() {
                self.downtimes.check_pending_flex_downtime(
                    object.as_downtime_target_mut(),
                    now,
                    &mut self.timers,
                    &mut self.comments,
                );
            }
        }

        if transition.state_type != StateType::Hard {
            return;
        }
        let ok = object.is_ok();
        let notifiable = object.as_notifiable_mut();
        if !ok {
            self.dispatcher.notify(
                notifiable,
                NotificationType::Problem,
                "",
                "",
                NotificationOptions::empty(),
                now,
            );
        } else if transition.hard_state_changed {
            self.dispatcher.notify(
                notifiable,
                NotificationType::Recovery,
                "",
                "",
                NotificationOptions::empty(),
                now,
            );
            notifiable.notification_state_mut().reset_problem_cycle();
        }
    }

    // ---- Acknowledgements ----

    pub fn acknowledge(
        &mut self,
        key: &ObjectKey,
        request: AcknowledgeRequest,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if request.kind == AckType::None {
            return self.remove_acknowledgement(key).map(|_| ());
        }
        let object = self
            .objects
            .get_mut(key)
            .ok_or_else(|| EngineError::UnknownObject(key.to_string()))?;
        if object.is_ok() {
            return Err(EngineError::NotInProblemState(key.to_string()));
        }

        object.acknowledgement_mut().acknowledge(
            key,
            request.kind,
            request.timeout_secs,
            now,
            &mut self.timers,
        );
        self.comments.add(NewComment {
            target: key.clone(),
            kind: CommentKind::Acknowledgement,
            entry_time: now,
            author: request.author.clone(),
            text: request.comment.clone(),
            persistent: request.persistent,
        });

        if request.notify {
            self.dispatcher.notify(
                object.as_notifiable_mut(),
                NotificationType::Acknowledgement,
                &request.author,
                &request.comment,
                NotificationOptions::empty(),
                now,
            );
        }
        Ok(())
    }

    /// Returns whether an acknowledgement was removed.
    pub fn remove_acknowledgement(&mut self, key: &ObjectKey) -> Result<bool> {
        let object = self
            .objects
            .get_mut(key)
            .ok_or_else(|| EngineError::UnknownObject(key.to_string()))?;
        Ok(object.acknowledgement_mut().remove(key, &mut self.comments))
    }

    // ---- Downtimes ----

    /// Schedules a downtime on `key`; `0` if the request was refused.
    pub fn schedule_downtime(
        &mut self,
        key: &ObjectKey,
        request: DowntimeRequest,
        now: DateTime<Utc>,
    ) -> u64 {
        match self.try_schedule_downtime(key, request, now) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(target = %key, error = %e, "Downtime request refused");
                0
            }
        }
    }

    pub fn try_schedule_downtime(
        &mut self,
        key: &ObjectKey,
        request: DowntimeRequest,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let object = self
            .objects
            .get_mut(key)
            .ok_or_else(|| EngineError::UnknownObject(key.to_string()))?;
        let id = self.downtimes.try_schedule(
            object.as_downtime_target_mut(),
            request,
            now,
            &mut self.timers,
            &mut self.comments,
        )?;
        Ok(id)
    }

    /// Cancels a downtime. Unknown ids are ignored.
    pub fn unschedule_downtime(&mut self, id: u64, now: DateTime<Utc>) -> Option<Downtime> {
        let removed = self
            .downtimes
            .unschedule(id, &mut self.objects, &mut self.comments)?;
        if removed.in_effect {
            if let Some(object) = self.objects.get_mut(&removed.parent) {
                self.dispatcher.notify(
                    object.as_notifiable_mut(),
                    NotificationType::DowntimeCancelled,
                    &removed.author,
                    &removed.comment,
                    NotificationOptions::empty(),
                    now,
                );
            }
        }
        Some(removed)
    }

    // ---- Timers ----

    /// Fires every timer due at `now`. Returns how many fired.
    pub fn fire_due_timers(&mut self, now: DateTime<Utc>) -> usize {
        let mut fired = 0;
        while let Some((due, event)) = self.timers.pop_due(now) {
            fired += 1;
            tracing::debug!(due = %due, kind = ?event.kind(), "Timer fired");
            match event {
                TimerEvent::StartDowntime(id) => self.start_downtime(id, now),
                TimerEvent::ExpireDowntime(id) => self.expire_downtime(id, now),
                TimerEvent::ExpireAcknowledgement {
                    target,
                    acknowledged_at,
                } => {
                    if let Some(object) = self.objects.get_mut(&target) {
                        object.acknowledgement_mut().expire(
                            &target,
                            acknowledged_at,
                            now,
                            &mut self.comments,
                        );
                    }
                }
            }
        }
        fired
    }

    fn start_downtime(&mut self, id: u64, now: DateTime<Utc>) {
        let Some(downtime) = self.downtimes.get(id) else {
            tracing::debug!(downtime_id = id, "Start timer for a removed downtime");
            return;
        };
        if downtime.in_effect {
            return;
        }
        if let Some(object) = self.objects.get_mut(&downtime.parent) {
            self.dispatcher.notify(
                object.as_notifiable_mut(),
                NotificationType::DowntimeStart,
                &downtime.author,
                &downtime.comment,
                NotificationOptions::empty(),
                now,
            );
        }
        self.downtimes
            .start(id, &mut self.objects, now, &mut self.timers, &mut self.comments);
    }

    fn expire_downtime(&mut self, id: u64, now: DateTime<Utc>) {
        let outcome = self
            .downtimes
            .expire(id, &mut self.objects, &mut self.comments, now);
        if let ExpireOutcome::Stopped(downtime) = outcome {
            if !downtime.in_effect {
                return;
            }
            if let Some(object) = self.objects.get_mut(&downtime.parent) {
                self.dispatcher.notify(
                    object.as_notifiable_mut(),
                    NotificationType::DowntimeStop,
                    &downtime.author,
                    &downtime.comment,
                    NotificationOptions::empty(),
                    now,
                );
            }
        }
    }

    // ---- Flapping and custom notifications ----

    /// Records a flap-detection verdict. Returns whether the flag changed.
    pub fn set_flapping(&mut self, key: &ObjectKey, flapping: bool, now: DateTime<Utc>) -> Result<bool> {
        let object = self
            .objects
            .get_mut(key)
            .ok_or_else(|| EngineError::UnknownObject(key.to_string()))?;
        if object.is_flapping() == flapping {
            return Ok(false);
        }
        object.set_flapping(flapping);
        let kind = if flapping {
            NotificationType::FlappingStart
        } else {
            NotificationType::FlappingStop
        };
        tracing::info!(object = %key, flapping, "Flapping state changed");
        self.dispatcher.notify(
            object.as_notifiable_mut(),
            kind,
            "",
            "",
            NotificationOptions::empty(),
            now,
        );
        Ok(true)
    }

    /// Turns flap detection off for `key`, ending any flapping episode.
    pub fn disable_flap_detection(&mut self, key: &ObjectKey, now: DateTime<Utc>) -> Result<bool> {
        let object = self
            .objects
            .get_mut(key)
            .ok_or_else(|| EngineError::UnknownObject(key.to_string()))?;
        if !object.is_flapping() {
            return Ok(false);
        }
        object.set_flapping(false);
        self.dispatcher.notify(
            object.as_notifiable_mut(),
            NotificationType::FlappingDisabled,
            "",
            "",
            NotificationOptions::empty(),
            now,
        );
        Ok(true)
    }

    pub fn send_custom_notification(
        &mut self,
        key: &ObjectKey,
        author: &str,
        comment: &str,
        options: NotificationOptions,
        now: DateTime<Utc>,
    ) -> Result<NotifyOutcome> {
        let object = self
            .objects
            .get_mut(key)
            .ok_or_else(|| EngineError::UnknownObject(key.to_string()))?;
        Ok(self.dispatcher.notify(
            object.as_notifiable_mut(),
            NotificationType::Custom,
            author,
            comment,
            options,
            now,
        ))
    }
}

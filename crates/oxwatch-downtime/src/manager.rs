use crate::downtime::{Downtime, DowntimeRequest};
use crate::error::{DowntimeError, Result};
use crate::{DowntimeTarget, DowntimeTargets};
use chrono::{DateTime, Utc};
use oxwatch_common::traits::{CommentKind, CommentStore, NewComment, Scheduler, TimerEvent};
use oxwatch_common::types::ObjectKey;
use oxwatch_common::time::add_secs;
use oxwatch_common::Checkable;
use std::collections::HashMap;

/// What happened when an expire timer fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpireOutcome {
    /// The downtime was already gone.
    Missing,
    /// A running flexible downtime still has time left; kept.
    Deferred,
    /// The downtime was removed. Carries the removed entry.
    Stopped(Downtime),
}

/// Owner of the live downtime table.
///
/// Ids are allocated from 1 upwards and never reused for the lifetime of
/// the manager.
pub struct DowntimeManager {
    downtimes: HashMap<u64, Downtime>,
    next_id: u64,
}

impl Default for DowntimeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DowntimeManager {
    pub fn new() -> Self {
        Self {
            downtimes: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn get(&self, id: u64) -> Option<&Downtime> {
        self.downtimes.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Downtime> {
        self.downtimes.values()
    }

    pub fn len(&self) -> usize {
        self.downtimes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.downtimes.is_empty()
    }

    /// Downtimes attached to `key`, ordered by id.
    pub fn downtimes_for(&self, key: &ObjectKey) -> Vec<&Downtime> {
        let mut found: Vec<&Downtime> = self
            .downtimes
            .values()
            .filter(|dt| &dt.parent == key)
            .collect();
        found.sort_by_key(|dt| dt.id);
        found
    }

    /// Puts back a downtime retained from an earlier run.
    ///
    /// Timers, comments and the target's [`DowntimeDepth`](crate::DowntimeDepth)
    /// are retained alongside and are not touched. Later ids are allocated
    /// above the restored one.
    pub fn restore(&mut self, downtime: Downtime) {
        let id = downtime.id;
        self.next_id = self.next_id.max(id.saturating_add(1));
        tracing::debug!(downtime_id = id, target = %downtime.parent, "Downtime restored");
        if self.downtimes.insert(id, downtime).is_some() {
            tracing::warn!(downtime_id = id, "Restored downtime replaced an existing entry");
        }
    }

    /// Schedules a downtime, returning its id or `0` if the request was refused.
    pub fn schedule(
        &mut self,
        target: &mut dyn DowntimeTarget,
        request: DowntimeRequest,
        now: DateTime<Utc>,
        scheduler: &mut dyn Scheduler,
        comments: &mut dyn CommentStore,
    ) -> u64 {
        let target_key = target.key().clone();
        match self.try_schedule(target, request, now, scheduler, comments) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(target = %target_key, error = %e, "Downtime not scheduled");
                0
            }
        }
    }

    /// Validates and schedules a downtime.
    ///
    /// On success the downtime is in the table, its explanatory comment is
    /// attached to the target, and an expire timer (plus a start timer for
    /// fixed, untriggered downtimes) has been requested.
    ///
    /// # Errors
    ///
    /// Returns a [`DowntimeError`] and leaves everything untouched if the
    /// window already ended, is inverted, a flexible downtime has no
    /// duration, or `triggered_by` names an unknown downtime.
    pub fn try_schedule(
        &mut self,
        target: &mut dyn DowntimeTarget,
        request: DowntimeRequest,
        now: DateTime<Utc>,
        scheduler: &mut dyn Scheduler,
        comments: &mut dyn CommentStore,
    ) -> Result<u64> {
        if request.end_time < now {
            return Err(DowntimeError::EndInPast);
        }
        if request.end_time < request.start_time {
            return Err(DowntimeError::InvertedWindow);
        }
        if !request.fixed && request.duration == 0 {
            return Err(DowntimeError::ZeroFlexibleDuration);
        }
        if request.triggered_by != 0 && !self.downtimes.contains_key(&request.triggered_by) {
            return Err(DowntimeError::UnknownTrigger(request.triggered_by));
        }

        let id = self.next_id;
        self.next_id += 1;

        let mut downtime = Downtime::from_request(id, target.key().clone(), request);
        let comment_id = comments.add(NewComment {
            target: downtime.parent.clone(),
            kind: CommentKind::Downtime,
            entry_time: downtime.entry_time,
            author: downtime.author.clone(),
            text: downtime.schedule_comment_text(),
            persistent: false,
        });
        downtime.comment_id = Some(comment_id);

        scheduler.schedule_at(downtime.end_time, TimerEvent::ExpireDowntime(id));
        if downtime.fixed && downtime.triggered_by == 0 {
            scheduler.schedule_at(downtime.start_time, TimerEvent::StartDowntime(id));
        }
        if !downtime.fixed {
            target.downtime_depth_mut().add_pending_flex();
        }

        tracing::info!(
            downtime_id = id,
            target = %downtime.parent,
            fixed = downtime.fixed,
            start = %downtime.start_time,
            end = %downtime.end_time,
            duration = downtime.duration,
            triggered_by = downtime.triggered_by,
            "Downtime scheduled"
        );
        self.downtimes.insert(id, downtime);
        Ok(id)
    }

    /// Puts a downtime into effect. Returns `true` if it started now.
    ///
    /// Unknown ids and downtimes already in effect are no-ops.
    pub fn start(
        &mut self,
        id: u64,
        targets: &mut dyn DowntimeTargets,
        now: DateTime<Utc>,
        scheduler: &mut dyn Scheduler,
        comments: &mut dyn CommentStore,
    ) -> bool {
        let Some(parent) = self.downtimes.get(&id).map(|dt| dt.parent.clone()) else {
            tracing::debug!(downtime_id = id, "Start requested for unknown downtime");
            return false;
        };
        let Some(target) = targets.target_mut(&parent) else {
            tracing::warn!(downtime_id = id, target = %parent, "Downtime parent no longer exists");
            return false;
        };
        self.activate(id, target, now, scheduler, comments)
    }

    fn activate(
        &mut self,
        id: u64,
        target: &mut dyn DowntimeTarget,
        now: DateTime<Utc>,
        scheduler: &mut dyn Scheduler,
        comments: &mut dyn CommentStore,
    ) -> bool {
        let Some(downtime) = self.downtimes.get_mut(&id) else {
            return false;
        };
        if downtime.in_effect {
            return false;
        }

        downtime.in_effect = true;
        let depth = target.downtime_depth_mut();
        depth.enter();
        if !downtime.fixed {
            depth.remove_pending_flex();
            downtime.flex_downtime_start = Some(now);
            scheduler.schedule_at(
                add_secs(now, downtime.duration),
                TimerEvent::ExpireDowntime(id),
            );
        }

        let comment_id = comments.add(NewComment {
            target: downtime.parent.clone(),
            kind: CommentKind::Downtime,
            entry_time: now,
            author: downtime.author.clone(),
            text: downtime.start_comment_text(),
            persistent: false,
        });
        downtime.start_comment_id = Some(comment_id);

        tracing::info!(
            downtime_id = id,
            target = %downtime.parent,
            depth = target.downtime_depth().scheduled_downtime_depth,
            "Downtime started"
        );
        true
    }

    /// Ends a downtime that ran its course. Unknown ids are ignored.
    pub fn stop(
        &mut self,
        id: u64,
        targets: &mut dyn DowntimeTargets,
        comments: &mut dyn CommentStore,
    ) -> Option<Downtime> {
        let removed = self.remove(id, targets, comments)?;
        tracing::info!(downtime_id = id, target = %removed.parent, "Downtime stopped");
        Some(removed)
    }

    /// Cancels a downtime on request. Unknown ids are ignored.
    pub fn unschedule(
        &mut self,
        id: u64,
        targets: &mut dyn DowntimeTargets,
        comments: &mut dyn CommentStore,
    ) -> Option<Downtime> {
        let removed = self.remove(id, targets, comments)?;
        tracing::info!(
            downtime_id = id,
            target = %removed.parent,
            was_in_effect = removed.in_effect,
            "Downtime cancelled"
        );
        Some(removed)
    }

    /// Cancels every downtime attached to `key`.
    pub fn unschedule_all_for(
        &mut self,
        key: &ObjectKey,
        targets: &mut dyn DowntimeTargets,
        comments: &mut dyn CommentStore,
    ) -> Vec<Downtime> {
        let ids: Vec<u64> = self.downtimes_for(key).iter().map(|dt| dt.id).collect();
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(downtime) = self.unschedule(id, targets, comments) {
                removed.push(downtime);
            }
        }
        removed
    }

    /// Handles an expire timer for `id`.
    ///
    /// A flexible downtime that started late keeps running until its own
    /// duration is used up, even past `end_time`.
    pub fn expire(
        &mut self,
        id: u64,
        targets: &mut dyn DowntimeTargets,
        comments: &mut dyn CommentStore,
        now: DateTime<Utc>,
    ) -> ExpireOutcome {
        let Some(downtime) = self.downtimes.get(&id) else {
            return ExpireOutcome::Missing;
        };

        let keep = if downtime.fixed {
            false
        } else if downtime.in_effect {
            downtime.flex_end().is_some_and(|end| now < end)
        } else {
            now < downtime.end_time
        };
        if keep {
            tracing::debug!(downtime_id = id, "Downtime expiry deferred");
            return ExpireOutcome::Deferred;
        }

        match self.stop(id, targets, comments) {
            Some(removed) => ExpireOutcome::Stopped(removed),
            None => ExpireOutcome::Missing,
        }
    }

    /// Flexible, untriggered downtimes of `target` that should start now.
    ///
    /// A candidate is pending, its window contains `now`, and the target is
    /// in a non-OK state.
    pub fn flex_candidates(&self, target: &dyn DowntimeTarget, now: DateTime<Utc>) -> Vec<u64> {
        if target.is_ok() {
            return Vec::new();
        }
        let key = target.key();
        let mut ids: Vec<u64> = self
            .downtimes
            .values()
            .filter(|dt| {
                !dt.fixed
                    && !dt.in_effect
                    && dt.triggered_by == 0
                    && &dt.parent == key
                    && dt.window_contains(now)
            })
            .map(|dt| dt.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Starts every flexible downtime of `target` that is due. Returns the
    /// ids started.
    pub fn check_pending_flex_downtime(
        &mut self,
        target: &mut dyn DowntimeTarget,
        now: DateTime<Utc>,
        scheduler: &mut dyn Scheduler,
        comments: &mut dyn CommentStore,
    ) -> Vec<u64> {
        let mut started = Vec::new();
        for id in self.flex_candidates(target, now) {
            if self.activate(id, target, now, scheduler, comments) {
                started.push(id);
            }
        }
        started
    }

    fn remove(
        &mut self,
        id: u64,
        targets: &mut dyn DowntimeTargets,
        comments: &mut dyn CommentStore,
    ) -> Option<Downtime> {
        let downtime = self.downtimes.remove(&id)?;

        match targets.target_mut(&downtime.parent) {
            Some(target) => {
                let depth = target.downtime_depth_mut();
                if downtime.in_effect {
                    depth.leave();
                } else if !downtime.fixed {
                    depth.remove_pending_flex();
                }
            }
            None => {
                tracing::warn!(downtime_id = id, target = %downtime.parent, "Downtime parent no longer exists");
            }
        }

        for comment_id in [downtime.comment_id, downtime.start_comment_id]
            .into_iter()
            .flatten()
        {
            comments.delete(comment_id);
        }
        Some(downtime)
    }
}

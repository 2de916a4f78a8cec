use crate::downtime::DowntimeRequest;
use crate::error::DowntimeError;
use crate::finder::{Criterion, DowntimeFinder};
use crate::manager::{DowntimeManager, ExpireOutcome};
use crate::{DowntimeDepth, DowntimeTarget, DowntimeTargets};
use chrono::{DateTime, TimeZone, Utc};
use oxwatch_common::time::far_future;
use oxwatch_common::traits::{CommentStore, NewComment, Scheduler, TimerEvent};
use oxwatch_common::types::ObjectKey;
use oxwatch_common::Checkable;
use std::collections::HashMap;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

#[derive(Default)]
struct RecordingScheduler {
    timers: Vec<(DateTime<Utc>, TimerEvent)>,
}

impl Scheduler for RecordingScheduler {
    fn schedule_at(&mut self, at: DateTime<Utc>, event: TimerEvent) {
        self.timers.push((at, event));
    }
}

#[derive(Default)]
struct MemoryComments {
    next_id: u64,
    comments: HashMap<u64, NewComment>,
}

impl CommentStore for MemoryComments {
    fn add(&mut self, comment: NewComment) -> u64 {
        self.next_id += 1;
        self.comments.insert(self.next_id, comment);
        self.next_id
    }

    fn delete(&mut self, comment_id: u64) {
        self.comments.remove(&comment_id);
    }

    fn delete_acknowledgement_comments(&mut self, _target: &ObjectKey) {}
}

struct FakeTarget {
    key: ObjectKey,
    ok: bool,
    depth: DowntimeDepth,
}

impl Checkable for FakeTarget {
    fn key(&self) -> &ObjectKey {
        &self.key
    }

    fn is_ok(&self) -> bool {
        self.ok
    }
}

impl DowntimeTarget for FakeTarget {
    fn downtime_depth(&self) -> &DowntimeDepth {
        &self.depth
    }

    fn downtime_depth_mut(&mut self) -> &mut DowntimeDepth {
        &mut self.depth
    }
}

#[derive(Default)]
struct Targets(HashMap<ObjectKey, FakeTarget>);

impl Targets {
    fn add(&mut self, key: ObjectKey) {
        self.0.insert(
            key.clone(),
            FakeTarget {
                key,
                ok: true,
                depth: DowntimeDepth::default(),
            },
        );
    }

    fn get(&self, key: &ObjectKey) -> &FakeTarget {
        &self.0[key]
    }

    fn get_mut(&mut self, key: &ObjectKey) -> &mut FakeTarget {
        self.0.get_mut(key).unwrap()
    }
}

impl DowntimeTargets for Targets {
    fn target_mut(&mut self, key: &ObjectKey) -> Option<&mut dyn DowntimeTarget> {
        self.0.get_mut(key).map(|t| t as &mut dyn DowntimeTarget)
    }
}

struct Fixture {
    manager: DowntimeManager,
    targets: Targets,
    scheduler: RecordingScheduler,
    comments: MemoryComments,
}

fn fixture() -> Fixture {
    let mut targets = Targets::default();
    targets.add(ObjectKey::host("web-01"));
    targets.add(ObjectKey::service("web-01", "http"));
    targets.add(ObjectKey::service("db-01", "pgsql"));
    Fixture {
        manager: DowntimeManager::new(),
        targets,
        scheduler: RecordingScheduler::default(),
        comments: MemoryComments::default(),
    }
}

fn request(start: i64, end: i64, fixed: bool, duration: u64) -> DowntimeRequest {
    DowntimeRequest {
        entry_time: at(20),
        author: "ops".into(),
        comment: "kernel upgrade".into(),
        start_time: at(start),
        end_time: at(end),
        fixed,
        duration,
        triggered_by: 0,
    }
}

impl Fixture {
    fn schedule(&mut self, key: &ObjectKey, request: DowntimeRequest, now: i64) -> u64 {
        let target = self.targets.get_mut(key);
        self.manager.schedule(
            target,
            request,
            at(now),
            &mut self.scheduler,
            &mut self.comments,
        )
    }

    fn start(&mut self, id: u64, now: i64) -> bool {
        self.manager.start(
            id,
            &mut self.targets,
            at(now),
            &mut self.scheduler,
            &mut self.comments,
        )
    }

    fn depth(&self, key: &ObjectKey) -> u32 {
        self.targets.get(key).depth.scheduled_downtime_depth
    }
}

#[test]
fn fixed_downtime_duration_is_derived_from_window() {
    let mut f = fixture();
    let svc = ObjectKey::service("web-01", "http");
    let id = f.schedule(&svc, request(40, 60, true, 999), 20);

    assert_eq!(id, 1);
    let dt = f.manager.get(id).unwrap();
    assert_eq!(dt.duration, 20);
    assert!(!dt.in_effect);

    let comment = &f.comments.comments[&dt.comment_id.unwrap()];
    assert!(comment
        .text
        .starts_with("This service has been scheduled for fixed downtime from"));
    assert!(!comment.persistent);
}

#[test]
fn fixed_untriggered_downtime_requests_start_and_expire_timers() {
    let mut f = fixture();
    let host = ObjectKey::host("web-01");
    let id = f.schedule(&host, request(40, 60, true, 0), 20);

    assert_eq!(f.scheduler.timers.len(), 2);
    assert!(f
        .scheduler
        .timers
        .contains(&(at(60), TimerEvent::ExpireDowntime(id))));
    assert!(f
        .scheduler
        .timers
        .contains(&(at(40), TimerEvent::StartDowntime(id))));
}

#[test]
fn flexible_and_triggered_downtimes_only_get_an_expire_timer() {
    let mut f = fixture();
    let host = ObjectKey::host("web-01");
    let trigger = f.schedule(&host, request(40, 60, true, 0), 20);
    f.scheduler.timers.clear();

    let flex = f.schedule(&host, request(40, 600, false, 120), 20);
    assert_eq!(
        f.scheduler.timers,
        vec![(at(600), TimerEvent::ExpireDowntime(flex))]
    );
    f.scheduler.timers.clear();

    let mut triggered = request(40, 60, true, 0);
    triggered.triggered_by = trigger;
    let id = f.schedule(&host, triggered, 20);
    assert_eq!(f.manager.get(id).unwrap().triggered_by, trigger);
    assert_eq!(
        f.scheduler.timers,
        vec![(at(60), TimerEvent::ExpireDowntime(id))]
    );
}

#[test]
fn flexible_comment_mentions_duration() {
    let mut f = fixture();
    let host = ObjectKey::host("web-01");
    let id = f.schedule(&host, request(40, 10_000, false, 5400), 20);
    let dt = f.manager.get(id).unwrap();
    let text = &f.comments.comments[&dt.comment_id.unwrap()].text;
    assert!(text.starts_with("This host has been scheduled for flexible downtime starting between"));
    assert!(text.contains("1 hours and 30 minutes"));
}

#[test]
fn rejected_requests_return_zero_and_leave_no_trace() {
    let mut f = fixture();
    let host = ObjectKey::host("web-01");

    // Window entirely in the past.
    assert_eq!(f.schedule(&host, request(5, 10, true, 0), 20), 0);
    // Inverted window.
    assert_eq!(f.schedule(&host, request(60, 40, true, 0), 20), 0);
    // Flexible without duration.
    assert_eq!(f.schedule(&host, request(40, 60, false, 0), 20), 0);

    assert!(f.manager.is_empty());
    assert!(f.comments.comments.is_empty());
    assert!(f.scheduler.timers.is_empty());
    assert_eq!(f.targets.get(&host).depth.pending_flex_downtime, 0);
}

#[test]
fn try_schedule_reports_the_reason() {
    let mut f = fixture();
    let host = ObjectKey::host("web-01");
    let mut req = request(40, 60, true, 0);
    req.triggered_by = 77;
    let target = f.targets.get_mut(&host);
    let err = f
        .manager
        .try_schedule(target, req, at(20), &mut f.scheduler, &mut f.comments)
        .unwrap_err();
    assert_eq!(err, DowntimeError::UnknownTrigger(77));
}

#[test]
fn ids_are_monotonic_and_never_reused() {
    let mut f = fixture();
    let host = ObjectKey::host("web-01");
    let first = f.schedule(&host, request(40, 60, true, 0), 20);
    let second = f.schedule(&host, request(40, 60, true, 0), 20);
    f.manager
        .unschedule(second, &mut f.targets, &mut f.comments)
        .unwrap();
    let third = f.schedule(&host, request(40, 60, true, 0), 20);
    assert_eq!((first, second, third), (1, 2, 3));
}

#[test]
fn restored_downtimes_keep_their_ids() {
    let mut f = fixture();
    let host = ObjectKey::host("web-01");
    let first = f.schedule(&host, request(40, 600, true, 0), 20);
    let second = f.schedule(&host, request(40, 600, false, 120), 20);

    let saved: Vec<String> = f
        .manager
        .iter()
        .map(|dt| serde_json::to_string(dt).unwrap())
        .collect();
    let mut reloaded = DowntimeManager::new();
    for json in &saved {
        reloaded.restore(serde_json::from_str(json).unwrap());
    }
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.get(first), f.manager.get(first));
    assert_eq!(reloaded.get(second), f.manager.get(second));

    f.manager = reloaded;

    let third = f.schedule(&host, request(40, 600, true, 0), 30);
    assert_eq!(third, 3);
    assert_eq!(f.manager.len(), 3);
}

#[test]
fn start_is_idempotent_and_stop_restores_depth() {
    let mut f = fixture();
    let host = ObjectKey::host("web-01");
    let id = f.schedule(&host, request(40, 60, true, 0), 20);

    assert!(f.start(id, 40));
    assert!(!f.start(id, 41));
    assert_eq!(f.depth(&host), 1);
    assert!(f.manager.get(id).unwrap().in_effect);

    let removed = f.manager.stop(id, &mut f.targets, &mut f.comments).unwrap();
    assert!(removed.in_effect);
    assert_eq!(f.depth(&host), 0);
    assert!(f.manager.get(id).is_none());
    // Both the scheduling and the start comment are gone.
    assert!(f.comments.comments.is_empty());
}

#[test]
fn unknown_ids_are_silent_noops() {
    let mut f = fixture();
    assert!(!f.start(42, 40));
    assert!(f.manager.stop(42, &mut f.targets, &mut f.comments).is_none());
    assert!(f
        .manager
        .unschedule(42, &mut f.targets, &mut f.comments)
        .is_none());
    assert_eq!(
        f.manager.expire(42, &mut f.targets, &mut f.comments, at(60)),
        ExpireOutcome::Missing
    );
}

#[test]
fn unscheduling_a_pending_downtime_does_not_touch_depth() {
    let mut f = fixture();
    let host = ObjectKey::host("web-01");
    let started = f.schedule(&host, request(40, 60, true, 0), 20);
    let pending = f.schedule(&host, request(50, 60, true, 0), 20);
    f.start(started, 40);

    f.manager
        .unschedule(pending, &mut f.targets, &mut f.comments)
        .unwrap();
    assert_eq!(f.depth(&host), 1);
}

#[test]
fn overlapping_downtimes_stack_depth() {
    let mut f = fixture();
    let svc = ObjectKey::service("web-01", "http");
    let a = f.schedule(&svc, request(40, 60, true, 0), 20);
    let b = f.schedule(&svc, request(45, 90, true, 0), 20);
    f.start(a, 40);
    f.start(b, 45);
    assert_eq!(f.depth(&svc), 2);

    f.manager.stop(a, &mut f.targets, &mut f.comments);
    assert_eq!(f.depth(&svc), 1);
    f.manager.stop(b, &mut f.targets, &mut f.comments);
    assert_eq!(f.depth(&svc), 0);
}

#[test]
fn flexible_downtime_waits_for_a_problem_inside_its_window() {
    let mut f = fixture();
    let host = ObjectKey::host("web-01");
    let id = f.schedule(&host, request(40, 600, false, 120), 20);
    assert_eq!(f.targets.get(&host).depth.pending_flex_downtime, 1);

    // Still OK: nothing starts.
    let target = f.targets.get_mut(&host);
    let started = f.manager.check_pending_flex_downtime(
        target,
        at(50),
        &mut f.scheduler,
        &mut f.comments,
    );
    assert!(started.is_empty());

    // Problem before the window opens: nothing starts.
    f.targets.get_mut(&host).ok = false;
    let target = f.targets.get_mut(&host);
    let started = f.manager.check_pending_flex_downtime(
        target,
        at(30),
        &mut f.scheduler,
        &mut f.comments,
    );
    assert!(started.is_empty());

    // Problem inside the window.
    let target = f.targets.get_mut(&host);
    let started = f.manager.check_pending_flex_downtime(
        target,
        at(100),
        &mut f.scheduler,
        &mut f.comments,
    );
    assert_eq!(started, vec![id]);
    assert_eq!(f.depth(&host), 1);
    assert_eq!(f.targets.get(&host).depth.pending_flex_downtime, 0);

    let dt = f.manager.get(id).unwrap();
    assert_eq!(dt.flex_downtime_start, Some(at(100)));
    assert!(f
        .scheduler
        .timers
        .contains(&(at(220), TimerEvent::ExpireDowntime(id))));
}

#[test]
fn flexible_downtime_of_another_object_is_not_started() {
    let mut f = fixture();
    let host = ObjectKey::host("web-01");
    let svc = ObjectKey::service("web-01", "http");
    f.schedule(&host, request(40, 600, false, 120), 20);

    f.targets.get_mut(&svc).ok = false;
    let target = f.targets.get_mut(&svc);
    let started = f.manager.check_pending_flex_downtime(
        target,
        at(100),
        &mut f.scheduler,
        &mut f.comments,
    );
    assert!(started.is_empty());
    assert_eq!(f.depth(&host), 0);
}

#[test]
fn running_flexible_downtime_outlives_its_window_end() {
    let mut f = fixture();
    let host = ObjectKey::host("web-01");
    let id = f.schedule(&host, request(40, 600, false, 120), 20);
    f.targets.get_mut(&host).ok = false;
    let target = f.targets.get_mut(&host);
    f.manager
        .check_pending_flex_downtime(target, at(550), &mut f.scheduler, &mut f.comments);

    // Window end timer fires while the flexible run still has time left.
    assert_eq!(
        f.manager.expire(id, &mut f.targets, &mut f.comments, at(600)),
        ExpireOutcome::Deferred
    );
    assert_eq!(f.depth(&host), 1);

    // Its own duration timer ends it.
    let outcome = f.manager.expire(id, &mut f.targets, &mut f.comments, at(670));
    assert!(matches!(outcome, ExpireOutcome::Stopped(ref dt) if dt.id == id));
    assert_eq!(f.depth(&host), 0);
}

#[test]
fn flexible_duration_beyond_the_calendar_is_clamped() {
    let mut f = fixture();
    let host = ObjectKey::host("web-01");
    let id = f.schedule(&host, request(40, 600, false, 20_000_000_000_000), 20);
    assert_ne!(id, 0);
    assert!(f.start(id, 50));

    let (when, event) = f.scheduler.timers.last().unwrap();
    assert_eq!(*when, far_future());
    assert_eq!(*event, TimerEvent::ExpireDowntime(id));
    assert_eq!(f.manager.get(id).unwrap().flex_end(), Some(far_future()));

    assert_eq!(
        f.manager.expire(id, &mut f.targets, &mut f.comments, at(600)),
        ExpireOutcome::Deferred
    );
    assert_eq!(f.depth(&host), 1);
}

#[test]
fn expired_flexible_downtime_that_never_started_is_removed() {
    let mut f = fixture();
    let host = ObjectKey::host("web-01");
    let id = f.schedule(&host, request(40, 600, false, 120), 20);

    let outcome = f.manager.expire(id, &mut f.targets, &mut f.comments, at(600));
    assert!(matches!(outcome, ExpireOutcome::Stopped(ref dt) if !dt.in_effect));
    assert_eq!(f.targets.get(&host).depth.pending_flex_downtime, 0);
    assert!(f.manager.is_empty());
}

#[test]
fn triggered_flexible_downtime_is_not_started_opportunistically() {
    let mut f = fixture();
    let host = ObjectKey::host("web-01");
    let trigger = f.schedule(&host, request(40, 600, true, 0), 20);
    let mut req = request(40, 600, false, 60);
    req.triggered_by = trigger;
    f.schedule(&host, req, 20);

    f.targets.get_mut(&host).ok = false;
    let target = f.targets.get_mut(&host);
    let started = f.manager.check_pending_flex_downtime(
        target,
        at(100),
        &mut f.scheduler,
        &mut f.comments,
    );
    assert!(started.is_empty());
}

#[test]
fn stopping_a_trigger_leaves_triggered_downtimes_alone() {
    let mut f = fixture();
    let host = ObjectKey::host("web-01");
    let trigger = f.schedule(&host, request(40, 600, true, 0), 20);
    let mut req = request(40, 600, true, 0);
    req.triggered_by = trigger;
    let child = f.schedule(&host, req, 20);

    f.manager.stop(trigger, &mut f.targets, &mut f.comments);
    let child = f.manager.get(child).unwrap();
    assert_eq!(child.triggered_by, trigger);
}

#[test]
fn unschedule_all_for_only_touches_that_object() {
    let mut f = fixture();
    let host = ObjectKey::host("web-01");
    let svc = ObjectKey::service("web-01", "http");
    f.schedule(&host, request(40, 60, true, 0), 20);
    f.schedule(&host, request(40, 90, true, 0), 20);
    let kept = f.schedule(&svc, request(40, 60, true, 0), 20);

    let removed = f
        .manager
        .unschedule_all_for(&host, &mut f.targets, &mut f.comments);
    assert_eq!(removed.len(), 2);
    assert_eq!(f.manager.len(), 1);
    assert!(f.manager.get(kept).is_some());
    assert_eq!(f.manager.downtimes_for(&svc).len(), 1);
}

#[test]
fn finder_round_trips_every_field() {
    let mut f = fixture();
    let svc = ObjectKey::service("web-01", "http");
    let host = ObjectKey::host("web-01");
    f.schedule(&host, request(40, 60, true, 0), 20);
    let id = f.schedule(&svc, request(40, 60, true, 0), 20);

    let finder = DowntimeFinder::new(&f.manager);
    let found = finder.find_matching_pairs(&[
        ("host", "web-01"),
        ("service", "http"),
        ("start", "40"),
        ("end", "60"),
        ("fixed", "1"),
        ("triggered_by", "0"),
        ("duration", "20"),
        ("author", "ops"),
        ("comment", "kernel upgrade"),
    ]);
    assert_eq!(found, vec![id]);
}

#[test]
fn finder_empty_service_selects_host_downtimes() {
    let mut f = fixture();
    let host = ObjectKey::host("web-01");
    let svc = ObjectKey::service("web-01", "http");
    let other = ObjectKey::service("db-01", "pgsql");
    let host_id = f.schedule(&host, request(40, 60, true, 0), 20);
    f.schedule(&svc, request(40, 60, true, 0), 20);
    f.schedule(&other, request(40, 60, true, 0), 20);

    let finder = DowntimeFinder::new(&f.manager);
    assert_eq!(
        finder.find_matching_all(&[Criterion::Service(String::new())]),
        vec![host_id]
    );
    assert_eq!(
        finder.find_matching_all(&[Criterion::Host("web-01".into())]).len(),
        2
    );
}

#[test]
fn finder_empty_criteria_match_all_and_unknown_keys_match_nothing() {
    let mut f = fixture();
    let host = ObjectKey::host("web-01");
    let a = f.schedule(&host, request(40, 60, true, 0), 20);
    let b = f.schedule(&host, request(40, 600, false, 30), 20);

    let finder = DowntimeFinder::new(&f.manager);
    assert_eq!(finder.find_matching_all(&[]), vec![a, b]);
    assert!(finder
        .find_matching_pairs(&[("host", "web-01"), ("colour", "red")])
        .is_empty());
    assert!(finder.find_matching_pairs(&[("start", "soon")]).is_empty());
    assert_eq!(finder.find_matching_pairs(&[("fixed", "0")]), vec![b]);
}

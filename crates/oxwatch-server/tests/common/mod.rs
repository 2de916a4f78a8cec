#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use oxwatch_common::types::{NotificationType, ObjectKey, ServiceState};
use oxwatch_downtime::downtime::DowntimeRequest;
use oxwatch_notify::error::Result as CommandResult;
use oxwatch_notify::{CommandRunner, ContactNotification};
use oxwatch_server::config::ServerConfig;
use oxwatch_server::object_builder::build_engine_with_runner;
use oxwatch_server::state::Engine;
use std::sync::{Arc, Mutex};

/// One host with one service. Alice hears about everything, bob only about
/// critical service problems and recoveries.
pub const BASE_CONFIG: &str = r#"
default_max_attempts = 3

[[time_periods]]
name = "24x7"
ranges = ["00:00-00:00"]

[[time_periods]]
name = "workhours"
ranges = ["09:00-17:00"]
weekdays = ["mon", "tue", "wed", "thu", "fri"]

[[commands]]
name = "notify-by-mail"
command_line = "true"

[[commands]]
name = "notify-by-pager"
command_line = "true"

[[contacts]]
name = "alice"
host_notification_commands = ["notify-by-mail"]
service_notification_commands = ["notify-by-mail"]

[[contacts]]
name = "bob"
host_notifications_enabled = false
service_notification_commands = ["notify-by-pager"]
service_notification_options = ["critical", "recovery"]
notification_period = "24x7"

[[contact_groups]]
name = "ops"
members = ["alice", "bob"]

[[hosts]]
name = "web-01"
max_attempts = 1
contacts = ["alice"]

[[services]]
host = "web-01"
name = "http"
contact_groups = ["ops"]
notification_interval = 600
notification_period = "24x7"
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentCommand {
    pub kind: NotificationType,
    pub object: ObjectKey,
    pub contact: String,
    pub command: String,
}

/// Records every command instead of running it.
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    sent: Arc<Mutex<Vec<SentCommand>>>,
}

impl RecordingRunner {
    pub fn sent(&self) -> Vec<SentCommand> {
        self.sent.lock().expect("runner lock poisoned").clone()
    }

    pub fn sent_to(&self, contact: &str) -> Vec<SentCommand> {
        self.sent()
            .into_iter()
            .filter(|s| s.contact == contact)
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().expect("runner lock poisoned").clear();
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&mut self, notification: &ContactNotification<'_>) -> CommandResult<()> {
        self.sent
            .lock()
            .expect("runner lock poisoned")
            .push(SentCommand {
                kind: notification.event.kind,
                object: notification.event.object.clone(),
                contact: notification.contact.name.clone(),
                command: notification.command.to_string(),
            });
        Ok(())
    }
}

pub struct TestContext {
    pub engine: Engine,
    pub runner: RecordingRunner,
}

pub fn build_test_context() -> Result<TestContext> {
    build_test_context_from(BASE_CONFIG)
}

pub fn build_test_context_from(config: &str) -> Result<TestContext> {
    let config: ServerConfig = toml::from_str(config)?;
    let runner = RecordingRunner::default();
    let engine = build_engine_with_runner(&config, Box::new(runner.clone()))?;
    Ok(TestContext { engine, runner })
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn http() -> ObjectKey {
    ObjectKey::service("web-01", "http")
}

pub fn web() -> ObjectKey {
    ObjectKey::host("web-01")
}

/// Kinds of every dispatched notification, oldest first.
pub fn dispatched(engine: &Engine) -> Vec<NotificationType> {
    engine.dispatcher.broker.history().map(|r| r.kind).collect()
}

pub fn count(engine: &Engine, kind: NotificationType) -> usize {
    engine
        .dispatcher
        .broker
        .history()
        .filter(|r| r.kind == kind)
        .count()
}

/// Drives `web-01;http` into a hard CRITICAL state, one result per minute
/// starting at `start`. Returns the time of the hard result.
pub fn make_http_hard_critical(engine: &mut Engine, start: i64) -> Result<DateTime<Utc>> {
    let mut now = at(start);
    for _ in 0..3 {
        engine.process_service_result("web-01", "http", ServiceState::Critical, now)?;
        now += Duration::seconds(60);
    }
    Ok(now - Duration::seconds(60))
}

pub fn fixed_downtime(now: i64, start: i64, end: i64) -> DowntimeRequest {
    DowntimeRequest {
        entry_time: at(now),
        author: "admin".to_string(),
        comment: "kernel upgrade".to_string(),
        start_time: at(start),
        end_time: at(end),
        fixed: true,
        duration: 0,
        triggered_by: 0,
    }
}

pub fn flexible_downtime(now: i64, start: i64, end: i64, duration: u64) -> DowntimeRequest {
    DowntimeRequest {
        fixed: false,
        duration,
        ..fixed_downtime(now, start, end)
    }
}

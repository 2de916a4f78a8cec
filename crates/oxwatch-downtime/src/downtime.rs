use chrono::{DateTime, Utc};
use oxwatch_common::time::add_secs;
use oxwatch_common::types::ObjectKey;
use serde::{Deserialize, Serialize};

const COMMENT_TIME_FORMAT: &str = "%m-%d-%Y %H:%M:%S";

/// Parameters of a downtime request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DowntimeRequest {
    pub entry_time: DateTime<Utc>,
    pub author: String,
    pub comment: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub fixed: bool,
    /// Seconds. Ignored for fixed downtimes, which last the whole window.
    pub duration: u64,
    /// Id of the downtime gating this one, or 0.
    pub triggered_by: u64,
}

/// A scheduled downtime as held in the manager's live table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Downtime {
    pub id: u64,
    /// Key of the monitored object; lookup only.
    pub parent: ObjectKey,
    pub entry_time: DateTime<Utc>,
    pub author: String,
    pub comment: String,
    /// The explanatory comment created at scheduling time.
    pub comment_id: Option<u64>,
    /// The comment added when the downtime took effect.
    pub start_comment_id: Option<u64>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub fixed: bool,
    pub duration: u64,
    pub triggered_by: u64,
    pub in_effect: bool,
    /// When a flexible downtime actually started.
    pub flex_downtime_start: Option<DateTime<Utc>>,
}

impl Downtime {
    pub(crate) fn from_request(id: u64, parent: ObjectKey, request: DowntimeRequest) -> Self {
        let duration = if request.fixed {
            (request.end_time - request.start_time).num_seconds().max(0) as u64
        } else {
            request.duration
        };
        Self {
            id,
            parent,
            entry_time: request.entry_time,
            author: request.author,
            comment: request.comment,
            comment_id: None,
            start_comment_id: None,
            start_time: request.start_time,
            end_time: request.end_time,
            fixed: request.fixed,
            duration,
            triggered_by: request.triggered_by,
            in_effect: false,
            flex_downtime_start: None,
        }
    }

    pub fn is_host_downtime(&self) -> bool {
        self.parent.is_host()
    }

    /// Whether `now` lies inside `[start_time, end_time]`.
    pub fn window_contains(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now <= self.end_time
    }

    /// When a running flexible downtime has used up its duration.
    pub fn flex_end(&self) -> Option<DateTime<Utc>> {
        self.flex_downtime_start.map(|start| add_secs(start, self.duration))
    }

    /// The explanatory comment text attached to the parent on scheduling.
    pub fn schedule_comment_text(&self) -> String {
        let kind = self.parent.kind_label();
        let start = self.start_time.format(COMMENT_TIME_FORMAT);
        let end = self.end_time.format(COMMENT_TIME_FORMAT);
        if self.fixed {
            format!(
                "This {kind} has been scheduled for fixed downtime from {start} to {end}. \
                 Notifications for the {kind} will not be sent out during that time period."
            )
        } else {
            let hours = self.duration / 3600;
            let minutes = (self.duration % 3600) / 60;
            format!(
                "This {kind} has been scheduled for flexible downtime starting between {start} \
                 and {end} and lasting for a period of {hours} hours and {minutes} minutes. \
                 Notifications for the {kind} will not be sent out during that time period."
            )
        }
    }

    pub fn start_comment_text(&self) -> String {
        format!(
            "This {} has entered a period of scheduled downtime.",
            self.parent.kind_label()
        )
    }
}

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc, Weekday};
use oxwatch_common::traits::TimePeriods;
use std::collections::HashMap;

/// A daily time range, end exclusive. `start > end` wraps past midnight,
/// `start == end` covers the whole day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    /// Parses `"HH:MM-HH:MM"`.
    pub fn parse(s: &str) -> Option<Self> {
        let (start, end) = s.split_once('-')?;
        Some(Self {
            start: NaiveTime::parse_from_str(start.trim(), "%H:%M").ok()?,
            end: NaiveTime::parse_from_str(end.trim(), "%H:%M").ok()?,
        })
    }

    /// The absolute interval this range covers when it opens on `day`.
    fn on(&self, day: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let midnight = Utc.from_utc_datetime(&day.date_naive().and_time(NaiveTime::MIN));
        let open = midnight + (self.start - NaiveTime::MIN);
        let close = if self.start < self.end {
            midnight + (self.end - NaiveTime::MIN)
        } else {
            midnight + Duration::days(1) + (self.end - NaiveTime::MIN)
        };
        (open, close)
    }
}

/// A named set of daily ranges, optionally restricted to some weekdays.
///
/// All times are UTC. A range belongs to the weekday it opens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimePeriod {
    pub name: String,
    pub ranges: Vec<TimeRange>,
    /// Empty means every day.
    pub weekdays: Vec<Weekday>,
}

impl TimePeriod {
    pub fn always(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ranges: vec![TimeRange {
                start: NaiveTime::MIN,
                end: NaiveTime::MIN,
            }],
            weekdays: Vec::new(),
        }
    }

    fn day_allowed(&self, day: DateTime<Utc>) -> bool {
        self.weekdays.is_empty() || self.weekdays.contains(&day.weekday())
    }

    /// Open intervals whose opening day lies in `first..=last` days from `t`.
    fn intervals(
        &self,
        t: DateTime<Utc>,
        first: i64,
        last: i64,
    ) -> impl Iterator<Item = (DateTime<Utc>, DateTime<Utc>)> + '_ {
        (first..=last)
            .map(move |offset| t + Duration::days(offset))
            .filter(move |day| self.day_allowed(*day))
            .flat_map(move |day| self.ranges.iter().map(move |r| r.on(day)))
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.intervals(t, -1, 0)
            .any(|(open, close)| open <= t && t < close)
    }

    /// Earliest instant at or after `t` inside the period, looking one week
    /// ahead.
    pub fn next_valid_time(&self, t: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.intervals(t, -1, 7)
            .filter(|(_, close)| *close > t)
            .map(|(open, _)| open.max(t))
            .min()
    }
}

/// Lookup table of [`TimePeriod`]s by name.
#[derive(Debug, Default)]
pub struct TimePeriodTable {
    periods: HashMap<String, TimePeriod>,
}

impl TimePeriodTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, period: TimePeriod) {
        self.periods.insert(period.name.clone(), period);
    }

    pub fn get(&self, name: &str) -> Option<&TimePeriod> {
        self.periods.get(name)
    }

    pub fn contains_period(&self, name: &str) -> bool {
        self.periods.contains_key(name)
    }
}

impl TimePeriods for TimePeriodTable {
    fn check_time(&self, period: &str, t: DateTime<Utc>) -> bool {
        match self.periods.get(period) {
            Some(p) => p.contains(t),
            None => {
                tracing::warn!(period, "Unknown time period, treating as always valid");
                true
            }
        }
    }

    fn next_valid_time(&self, period: &str, t: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.periods.get(period) {
            Some(p) => p.next_valid_time(t),
            None => Some(t),
        }
    }
}

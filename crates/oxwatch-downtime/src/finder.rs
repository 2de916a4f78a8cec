use crate::downtime::Downtime;
use crate::manager::DowntimeManager;

/// One filter on the downtime table.
///
/// Parsed from the `(key, value)` pairs used by the query surface.
/// Keys that are not recognised, or values that do not parse, become
/// [`Criterion::Unrecognized`], which never matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    Host(String),
    /// Empty string selects host downtimes.
    Service(String),
    /// Exact epoch seconds.
    Start(i64),
    End(i64),
    Fixed(bool),
    TriggeredBy(u64),
    Duration(u64),
    Author(String),
    Comment(String),
    Unrecognized { key: String, value: String },
}

impl Criterion {
    /// # Examples
    ///
    /// ```
    /// use oxwatch_downtime::finder::Criterion;
    ///
    /// assert_eq!(Criterion::parse("fixed", "1"), Criterion::Fixed(true));
    /// assert_eq!(Criterion::parse("start", "40"), Criterion::Start(40));
    /// assert!(matches!(Criterion::parse("colour", "red"), Criterion::Unrecognized { .. }));
    /// ```
    pub fn parse(key: &str, value: &str) -> Self {
        let parsed = match key {
            "host" => Some(Self::Host(value.to_string())),
            "service" => Some(Self::Service(value.to_string())),
            "start" => value.parse().ok().map(Self::Start),
            "end" => value.parse().ok().map(Self::End),
            "fixed" => match value {
                "1" => Some(Self::Fixed(true)),
                "0" => Some(Self::Fixed(false)),
                _ => None,
            },
            "triggered_by" => value.parse().ok().map(Self::TriggeredBy),
            "duration" => value.parse().ok().map(Self::Duration),
            "author" => Some(Self::Author(value.to_string())),
            "comment" => Some(Self::Comment(value.to_string())),
            _ => None,
        };
        parsed.unwrap_or_else(|| Self::Unrecognized {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    pub fn matches(&self, downtime: &Downtime) -> bool {
        match self {
            Self::Host(host) => downtime.parent.host_name() == host,
            Self::Service(service) if service.is_empty() => downtime.is_host_downtime(),
            Self::Service(service) => downtime.parent.service_name() == Some(service.as_str()),
            Self::Start(start) => downtime.start_time.timestamp() == *start,
            Self::End(end) => downtime.end_time.timestamp() == *end,
            Self::Fixed(fixed) => downtime.fixed == *fixed,
            Self::TriggeredBy(id) => downtime.triggered_by == *id,
            Self::Duration(duration) => downtime.duration == *duration,
            Self::Author(author) => &downtime.author == author,
            Self::Comment(comment) => &downtime.comment == comment,
            Self::Unrecognized { .. } => false,
        }
    }
}

/// Read-only queries over the manager's live table.
pub struct DowntimeFinder<'a> {
    manager: &'a DowntimeManager,
}

impl<'a> DowntimeFinder<'a> {
    pub fn new(manager: &'a DowntimeManager) -> Self {
        Self { manager }
    }

    /// Ids of every downtime matching all `criteria`, ascending.
    ///
    /// An empty criteria set matches everything.
    pub fn find_matching_all(&self, criteria: &[Criterion]) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .manager
            .iter()
            .filter(|dt| criteria.iter().all(|c| c.matches(dt)))
            .map(|dt| dt.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// [`find_matching_all`](Self::find_matching_all) over raw `(key, value)` pairs.
    pub fn find_matching_pairs(&self, pairs: &[(&str, &str)]) -> Vec<u64> {
        let criteria: Vec<Criterion> = pairs
            .iter()
            .map(|(key, value)| Criterion::parse(key, value))
            .collect();
        self.find_matching_all(&criteria)
    }
}

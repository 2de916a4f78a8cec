use crate::error::Result;
use crate::state::Engine;
use chrono::{DateTime, Utc};
use oxwatch_check::StateTransition;
use oxwatch_common::types::ObjectKey;
use serde::{Deserialize, Serialize};

/// A passive check result, one JSON object per input line.
///
/// ```
/// use oxwatch_server::passive::PassiveResult;
///
/// let r = PassiveResult::parse_line(r#"{"host": "web-01", "service": "http", "state": 2}"#).unwrap();
/// assert_eq!(r.key().to_string(), "web-01;http");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassiveResult {
    pub host: String,
    /// Absent for host results.
    #[serde(default)]
    pub service: Option<String>,
    /// 0..=2 for hosts, 0..=3 for services.
    pub state: u8,
}

impl PassiveResult {
    pub fn parse_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    pub fn key(&self) -> ObjectKey {
        match &self.service {
            Some(service) => ObjectKey::service(self.host.clone(), service.clone()),
            None => ObjectKey::host(self.host.clone()),
        }
    }

    pub fn apply(&self, engine: &mut Engine, now: DateTime<Utc>) -> Result<StateTransition> {
        engine.process_result(&self.key(), self.state, now)
    }
}

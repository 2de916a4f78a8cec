use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Default `tracing` directive, extended by `RUST_LOG`.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// How often due timers are fired, in milliseconds.
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
    #[serde(default = "default_true")]
    pub enable_notifications: bool,
    /// Used by hosts and services that do not set `max_attempts`.
    #[serde(default = "default_max_attempts")]
    pub default_max_attempts: u32,

    #[serde(default)]
    pub time_periods: Vec<TimePeriodConfig>,
    #[serde(default)]
    pub commands: Vec<CommandConfig>,
    #[serde(default)]
    pub contacts: Vec<ContactConfig>,
    #[serde(default)]
    pub contact_groups: Vec<ContactGroupConfig>,
    #[serde(default)]
    pub hosts: Vec<HostConfig>,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimePeriodConfig {
    pub name: String,
    /// `"HH:MM-HH:MM"` ranges; an end before the start wraps past midnight.
    #[serde(default)]
    pub ranges: Vec<String>,
    /// Weekday names such as `"mon"`; empty means every day.
    #[serde(default)]
    pub weekdays: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    pub name: String,
    pub command_line: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub host_notifications_enabled: bool,
    #[serde(default = "default_true")]
    pub service_notifications_enabled: bool,
    #[serde(default = "default_options")]
    pub host_notification_options: Vec<String>,
    #[serde(default = "default_options")]
    pub service_notification_options: Vec<String>,
    #[serde(default)]
    pub host_notification_commands: Vec<String>,
    #[serde(default)]
    pub service_notification_commands: Vec<String>,
    #[serde(default)]
    pub notification_period: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactGroupConfig {
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
}

/// Notification settings shared by hosts and services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub contacts: Vec<String>,
    #[serde(default)]
    pub contact_groups: Vec<String>,
    #[serde(default = "default_options")]
    pub notification_options: Vec<String>,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    #[serde(default = "default_notification_interval")]
    pub notification_interval: u64,
    #[serde(default)]
    pub notification_period: Option<String>,
    #[serde(default)]
    pub first_notification_delay: u64,
    #[serde(default)]
    pub recovery_notification_delay: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    pub name: String,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(flatten)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub host: String,
    pub name: String,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub volatile: bool,
    #[serde(flatten)]
    pub notifications: NotificationConfig,
}

fn default_log_filter() -> String {
    "oxwatch=info".to_string()
}

fn default_tick_millis() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_options() -> Vec<String> {
    vec!["all".to_string()]
}

fn default_notification_interval() -> u64 {
    1800
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

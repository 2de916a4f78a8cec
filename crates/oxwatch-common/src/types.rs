use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of a monitored object: a host name, or a (host, service) pair.
///
/// # Examples
///
/// ```
/// use oxwatch_common::types::ObjectKey;
///
/// let key = ObjectKey::service("web-01", "http");
/// assert_eq!(key.host_name(), "web-01");
/// assert_eq!(key.service_name(), Some("http"));
/// assert_eq!(key.to_string(), "web-01;http");
/// assert!(ObjectKey::host("web-01").is_host());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ObjectKey {
    Host { host: String },
    Service { host: String, service: String },
}

impl ObjectKey {
    pub fn host(name: impl Into<String>) -> Self {
        Self::Host { host: name.into() }
    }

    pub fn service(host: impl Into<String>, service: impl Into<String>) -> Self {
        Self::Service {
            host: host.into(),
            service: service.into(),
        }
    }

    pub fn host_name(&self) -> &str {
        match self {
            Self::Host { host } | Self::Service { host, .. } => host,
        }
    }

    /// `None` for host keys.
    pub fn service_name(&self) -> Option<&str> {
        match self {
            Self::Host { .. } => None,
            Self::Service { service, .. } => Some(service),
        }
    }

    pub fn is_host(&self) -> bool {
        matches!(self, Self::Host { .. })
    }

    /// "host" or "service", as used in human-readable texts.
    pub fn kind_label(&self) -> &'static str {
        if self.is_host() {
            "host"
        } else {
            "service"
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host { host } => write!(f, "{host}"),
            Self::Service { host, service } => write!(f, "{host};{service}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StateType {
    #[default]
    Soft,
    Hard,
}

impl fmt::Display for StateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateType::Soft => write!(f, "SOFT"),
            StateType::Hard => write!(f, "HARD"),
        }
    }
}

/// A state value of one object kind.
///
/// Host and service states are distinct enumerations that share the
/// [`NotifyOn`] bit positions 0..3.
pub trait ObjectState: Copy + Eq + fmt::Debug + fmt::Display + Default {
    /// Whether this is the "OK"/"UP" value.
    fn is_ok(self) -> bool;

    /// The notification-option bit selecting this state.
    fn notify_flag(self) -> NotifyOn;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HostState {
    #[default]
    Up,
    Down,
    Unreachable,
}

impl ObjectState for HostState {
    fn is_ok(self) -> bool {
        self == HostState::Up
    }

    fn notify_flag(self) -> NotifyOn {
        match self {
            HostState::Up => NotifyOn::UP,
            HostState::Down => NotifyOn::DOWN,
            HostState::Unreachable => NotifyOn::UNREACHABLE,
        }
    }
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostState::Up => write!(f, "UP"),
            HostState::Down => write!(f, "DOWN"),
            HostState::Unreachable => write!(f, "UNREACHABLE"),
        }
    }
}

impl TryFrom<u8> for HostState {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(HostState::Up),
            1 => Ok(HostState::Down),
            2 => Ok(HostState::Unreachable),
            _ => Err(format!("invalid host state: {value}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceState {
    #[default]
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl ObjectState for ServiceState {
    fn is_ok(self) -> bool {
        self == ServiceState::Ok
    }

    fn notify_flag(self) -> NotifyOn {
        match self {
            ServiceState::Ok => NotifyOn::OK,
            ServiceState::Warning => NotifyOn::WARNING,
            ServiceState::Critical => NotifyOn::CRITICAL,
            ServiceState::Unknown => NotifyOn::UNKNOWN,
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Ok => write!(f, "OK"),
            ServiceState::Warning => write!(f, "WARNING"),
            ServiceState::Critical => write!(f, "CRITICAL"),
            ServiceState::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl TryFrom<u8> for ServiceState {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ServiceState::Ok),
            1 => Ok(ServiceState::Warning),
            2 => Ok(ServiceState::Critical),
            3 => Ok(ServiceState::Unknown),
            _ => Err(format!("invalid service state: {value}")),
        }
    }
}

bitflags! {
    /// States and event classes an object (or contact) wants to be notified about.
    ///
    /// Host and service states share bit positions: `UP`/`OK` is the recovery
    /// bit, `DOWN`/`WARNING`, `UNREACHABLE`/`CRITICAL` and `UNKNOWN` follow.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct NotifyOn: u8 {
        const OK          = 1 << 0;
        const UP          = 1 << 0;
        const WARNING     = 1 << 1;
        const DOWN        = 1 << 1;
        const CRITICAL    = 1 << 2;
        const UNREACHABLE = 1 << 2;
        const UNKNOWN     = 1 << 3;
        const FLAPPING    = 1 << 4;
        const DOWNTIME    = 1 << 5;
    }
}

impl NotifyOn {
    /// Parses one configured option of a host (`is_host`) or a service.
    ///
    /// Single letters depend on the object kind: hosts take `d,u,r` and
    /// services `w,u,c,r`, so `u` is `UNREACHABLE` on a host and `UNKNOWN`
    /// on a service. `f`, `s` and the long names are accepted for both.
    pub fn parse_option(s: &str, is_host: bool) -> Result<Self, String> {
        let name = s.to_lowercase();
        let letter = match (name.as_str(), is_host) {
            ("r", _) => Self::OK,
            ("f", _) => Self::FLAPPING,
            ("s", _) => Self::DOWNTIME,
            ("d", true) => Self::DOWN,
            ("u", true) => Self::UNREACHABLE,
            ("w", false) => Self::WARNING,
            ("c", false) => Self::CRITICAL,
            ("u", false) => Self::UNKNOWN,
            _ => return name.parse(),
        };
        Ok(letter)
    }
}

impl FromStr for NotifyOn {
    type Err = String;

    /// Parses a kind-neutral option name. See [`NotifyOn::parse_option`]
    /// for the single-letter forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ok" | "up" | "recovery" => Ok(Self::OK),
            "warning" | "down" => Ok(Self::WARNING),
            "critical" | "unreachable" => Ok(Self::CRITICAL),
            "unknown" => Ok(Self::UNKNOWN),
            "flapping" => Ok(Self::FLAPPING),
            "downtime" => Ok(Self::DOWNTIME),
            "all" => Ok(Self::all()),
            _ => Err(format!("unknown notification option: {s}")),
        }
    }
}

bitflags! {
    /// Caller-supplied modifiers for a single `notify` call.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NotificationOptions: u8 {
        /// Send to every contact, escalated or not.
        const BROADCAST = 1 << 0;
        /// Skip every viability check.
        const FORCED    = 1 << 1;
        /// Count this notification even if its type does not normally count.
        const INCREMENT = 1 << 2;
    }
}

bitflags! {
    /// Notification types currently "active" on an object.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct NotificationFlags: u16 {
        const PROBLEM           = 1 << 0;
        const RECOVERY          = 1 << 1;
        const ACKNOWLEDGEMENT   = 1 << 2;
        const FLAPPINGSTART     = 1 << 3;
        const FLAPPINGSTOP      = 1 << 4;
        const FLAPPINGDISABLED  = 1 << 5;
        const DOWNTIMESTART     = 1 << 6;
        const DOWNTIMESTOP      = 1 << 7;
        const DOWNTIMECANCELLED = 1 << 8;
        const CUSTOM            = 1 << 9;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationType {
    Problem,
    Recovery,
    Acknowledgement,
    FlappingStart,
    FlappingStop,
    FlappingDisabled,
    DowntimeStart,
    DowntimeStop,
    DowntimeCancelled,
    Custom,
}

impl NotificationType {
    pub fn flag(self) -> NotificationFlags {
        match self {
            Self::Problem => NotificationFlags::PROBLEM,
            Self::Recovery => NotificationFlags::RECOVERY,
            Self::Acknowledgement => NotificationFlags::ACKNOWLEDGEMENT,
            Self::FlappingStart => NotificationFlags::FLAPPINGSTART,
            Self::FlappingStop => NotificationFlags::FLAPPINGSTOP,
            Self::FlappingDisabled => NotificationFlags::FLAPPINGDISABLED,
            Self::DowntimeStart => NotificationFlags::DOWNTIMESTART,
            Self::DowntimeStop => NotificationFlags::DOWNTIMESTOP,
            Self::DowntimeCancelled => NotificationFlags::DOWNTIMECANCELLED,
            Self::Custom => NotificationFlags::CUSTOM,
        }
    }

    /// PROBLEM and RECOVERY, the types driven by state changes.
    pub fn is_normal(self) -> bool {
        matches!(self, Self::Problem | Self::Recovery)
    }

    pub fn is_flapping(self) -> bool {
        matches!(
            self,
            Self::FlappingStart | Self::FlappingStop | Self::FlappingDisabled
        )
    }

    pub fn is_downtime(self) -> bool {
        matches!(
            self,
            Self::DowntimeStart | Self::DowntimeStop | Self::DowntimeCancelled
        )
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Problem => "PROBLEM",
            Self::Recovery => "RECOVERY",
            Self::Acknowledgement => "ACKNOWLEDGEMENT",
            Self::FlappingStart => "FLAPPINGSTART",
            Self::FlappingStop => "FLAPPINGSTOP",
            Self::FlappingDisabled => "FLAPPINGDISABLED",
            Self::DowntimeStart => "DOWNTIMESTART",
            Self::DowntimeStop => "DOWNTIMESTOP",
            Self::DowntimeCancelled => "DOWNTIMECANCELLED",
            Self::Custom => "CUSTOM",
        };
        f.write_str(s)
    }
}

impl FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PROBLEM" => Ok(Self::Problem),
            "RECOVERY" => Ok(Self::Recovery),
            "ACKNOWLEDGEMENT" => Ok(Self::Acknowledgement),
            "FLAPPINGSTART" => Ok(Self::FlappingStart),
            "FLAPPINGSTOP" => Ok(Self::FlappingStop),
            "FLAPPINGDISABLED" => Ok(Self::FlappingDisabled),
            "DOWNTIMESTART" => Ok(Self::DowntimeStart),
            "DOWNTIMESTOP" | "DOWNTIMEEND" => Ok(Self::DowntimeStop),
            "DOWNTIMECANCELLED" => Ok(Self::DowntimeCancelled),
            "CUSTOM" => Ok(Self::Custom),
            _ => Err(format!("unknown notification type: {s}")),
        }
    }
}

/// Acknowledgement kind of a monitored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckType {
    #[default]
    None,
    /// Cleared by any state change.
    Normal,
    /// Cleared only by a return to OK/UP.
    Sticky,
}

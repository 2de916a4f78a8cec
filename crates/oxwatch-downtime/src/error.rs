/// Reasons a downtime request is refused.
///
/// `DowntimeManager::schedule` turns any of these into the id `0`;
/// `DowntimeManager::try_schedule` hands them to the caller.
///
/// # Examples
///
/// ```rust
/// use oxwatch_downtime::error::DowntimeError;
///
/// let err = DowntimeError::UnknownTrigger(42);
/// assert!(err.to_string().contains("42"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DowntimeError {
    /// The window already ended.
    #[error("Downtime: end time lies in the past")]
    EndInPast,

    #[error("Downtime: end time is before start time")]
    InvertedWindow,

    /// Flexible downtimes need a positive duration.
    #[error("Downtime: flexible downtime requires a non-zero duration")]
    ZeroFlexibleDuration,

    /// `triggered_by` names a downtime that does not exist.
    #[error("Downtime: triggering downtime {0} does not exist")]
    UnknownTrigger(u64),
}

/// Convenience `Result` alias for downtime operations.
pub type Result<T> = std::result::Result<T, DowntimeError>;

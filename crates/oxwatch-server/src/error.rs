use oxwatch_downtime::error::DowntimeError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Engine: unknown object '{0}'")]
    UnknownObject(String),

    #[error("Engine: '{0}' is not in a problem state")]
    NotInProblemState(String),

    #[error("Engine: unknown time period '{0}'")]
    UnknownTimePeriod(String),

    #[error("Engine: unknown contact '{0}'")]
    UnknownContact(String),

    #[error("Engine: unknown notification command '{0}'")]
    UnknownCommand(String),

    #[error("Engine: duplicate object '{0}'")]
    DuplicateObject(String),

    #[error("Engine: invalid state: {0}")]
    InvalidState(String),

    #[error("Engine: invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Downtime(#[from] DowntimeError),
}

pub type Result<T> = std::result::Result<T, EngineError>;

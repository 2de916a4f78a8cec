/// Errors raised while running a contact's notification command.
///
/// # Examples
///
/// ```rust
/// use oxwatch_notify::error::CommandError;
///
/// let err = CommandError::UnknownCommand("notify-by-pager".to_string());
/// assert!(err.to_string().contains("notify-by-pager"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// No command line is defined under this name.
    #[error("Notify: unknown notification command '{0}'")]
    UnknownCommand(String),

    /// The process could not be started.
    #[error("Notify: failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("Notify: '{command}' exited with status {status}")]
    NonZeroExit { command: String, status: String },
}

/// Convenience `Result` alias for command execution.
pub type Result<T> = std::result::Result<T, CommandError>;

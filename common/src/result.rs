use crate::error::CommandError;

/// Outcome of one command on one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    /// Not every device reports one, so `None` is not a failure by itself.
    pub exit_status: Option<u32>,
    pub error: Option<CommandError>,
}

impl CommandResult {
    /// Builds a result from captured output.
    ///
    /// A non-zero exit status is promoted to [`CommandError::NonZeroExit`] so
    /// that callers only ever need to look at `error`.
    pub fn completed(
        command: impl Into<String>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        exit_status: Option<u32>,
    ) -> Self {
        let error = match exit_status {
            Some(code) if code != 0 => Some(CommandError::NonZeroExit(code)),
            _ => None,
        };

        Self {
            command: command.into(),
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_status,
            error,
        }
    }

    /// Builds a result for a command that produced no usable output.
    pub fn failed(command: impl Into<String>, error: CommandError) -> Self {
        Self {
            command: command.into(),
            stdout: String::new(),
            stderr: String::new(),
            exit_status: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// What the result sink receives: one command result tagged with its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRecord {
    pub host: String,
    pub result: CommandResult,
}

impl ResultRecord {
    pub fn new(host: impl Into<String>, result: CommandResult) -> Self {
        Self {
            host: host.into(),
            result,
        }
    }
}

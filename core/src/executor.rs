//! Per-host command execution.
//!
//! Commands run one after the other on a single session, each result goes to
//! the sink the moment it exists, and the first failure ends the host's run.

use std::sync::Arc;
use std::time::Duration;

use dispatchr_common::{
    config::DispatchOptions,
    error::CommandError,
    result::{CommandResult, ResultRecord},
};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::session::SessionTransport;
use crate::sink::ResultSink;

/// How far a host got through its commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Commands that completed successfully.
    pub completed: usize,
    /// The error that stopped the run, if any.
    pub failure: Option<CommandError>,
}

pub struct Executor<T: SessionTransport> {
    transport: Arc<T>,
    command_timeout: Duration,
    shutdown: CancellationToken,
}

impl<T: SessionTransport> Clone for Executor<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            command_timeout: self.command_timeout,
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<T: SessionTransport> Executor<T> {
    pub fn new(transport: Arc<T>, options: &DispatchOptions, shutdown: CancellationToken) -> Self {
        Self {
            transport,
            command_timeout: options.command_timeout,
            shutdown,
        }
    }

    /// Runs `commands` in order on `session`.
    ///
    /// Command `i + 1` starts only once the result of command `i` has been
    /// emitted. A cancellation noticed between two commands ends the run
    /// without emitting anything else.
    pub async fn run(
        &self,
        host: &str,
        session: &mut T::Session,
        commands: &[String],
        sink: &dyn ResultSink,
    ) -> ExecutionOutcome {
        let mut completed = 0;

        for (idx, command) in commands.iter().enumerate() {
            if self.shutdown.is_cancelled() {
                debug!(host, remaining = commands.len() - idx, "run cancelled between commands");
                return ExecutionOutcome {
                    completed,
                    failure: Some(CommandError::Cancelled),
                };
            }

            debug!(host, command = %command, step = idx + 1, total = commands.len(), "executing");
            let result = self.execute_one(session, command).await;
            let failure = result.error.clone();
            sink.emit(ResultRecord::new(host, result));

            if let Some(error) = failure {
                let skipped = commands.len() - idx - 1;
                warn!(host, command = %command, error = %error, skipped, "command failed, halting host");
                return ExecutionOutcome {
                    completed,
                    failure: Some(error),
                };
            }
            completed += 1;
        }

        ExecutionOutcome {
            completed,
            failure: None,
        }
    }

    async fn execute_one(&self, session: &mut T::Session, command: &str) -> CommandResult {
        tokio::select! {
            biased;
            res = timeout(self.command_timeout, self.transport.execute(session, command)) => {
                res.unwrap_or_else(|_elapsed| {
                    CommandResult::failed(command, CommandError::Timeout(self.command_timeout))
                })
            }
            _ = self.shutdown.cancelled() => CommandResult::failed(command, CommandError::Cancelled),
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

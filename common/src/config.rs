use std::time::Duration;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Terminal behaviour of the CLI.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Skips the startup banner.
    pub no_banner: bool,
    /// `0` prints everything, `1` drops headers and trees, `2` only keeps
    /// warnings, errors and the final verdict.
    pub quiet: u8,
    /// Stops the CLI from listening for key presses (`q` to cancel).
    pub disable_input: bool,
}

/// Tuning of one dispatch run.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Replace platform defaults with host commands instead of appending.
    pub overwrite: bool,
    /// Upper bound on concurrently running host-tasks. `None` runs every
    /// host at once.
    pub max_concurrency: Option<usize>,
    /// Bound on opening a session, authentication included.
    pub connect_timeout: Duration,
    /// Bound on a single command.
    pub command_timeout: Duration,
    /// Bound on tearing a session down.
    ///
    /// Close is never cancelled, so this is the only thing that limits it.
    pub close_timeout: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            max_concurrency: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

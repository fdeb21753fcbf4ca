pub mod plan;
pub mod run;

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use dispatchr_common::config::{
    DEFAULT_CLOSE_TIMEOUT, DEFAULT_COMMAND_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, DispatchOptions,
};

#[derive(Parser)]
#[command(name = "dispatchr")]
#[command(about = "Runs command lists on a fleet of network devices.")]
#[command(version)]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Less output; repeat to only keep warnings, errors and the verdict
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub quiet: u8,

    /// Do not print the banner
    #[arg(long, global = true)]
    pub no_banner: bool,

    /// Do not listen for 'q' to cancel the run
    #[arg(long, global = true)]
    pub disable_input: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open a session on every host and run its commands
    #[command(alias = "r")]
    Run(RunArgs),
    /// Print what every host would run, without connecting
    #[command(alias = "p")]
    Plan(InventoryArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    /// Inventory file
    #[arg(short, long, default_value = "hosts.yaml")]
    pub inventory: PathBuf,

    /// Replace platform defaults with host commands instead of appending them
    #[arg(long, visible_alias = "ow")]
    pub overwrite: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub inventory: InventoryArgs,

    /// Maximum number of hosts worked on at the same time (default: all)
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub workers: Option<u64>,

    /// Seconds allowed to connect and authenticate
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT.as_secs())]
    pub connect_timeout: u64,

    /// Seconds allowed per command
    #[arg(long, default_value_t = DEFAULT_COMMAND_TIMEOUT.as_secs())]
    pub command_timeout: u64,
}

impl RunArgs {
    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            overwrite: self.inventory.overwrite,
            max_concurrency: self.workers.map(|w| w as usize),
            connect_timeout: Duration::from_secs(self.connect_timeout),
            command_timeout: Duration::from_secs(self.command_timeout),
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

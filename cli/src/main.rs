mod commands;
mod terminal;

use std::process::ExitCode;

use commands::{CommandLine, Commands, plan, run};
use dispatchr_common::config::Config;
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let commands = CommandLine::parse_args();

    let cfg = Config {
        no_banner: commands.no_banner,
        quiet: commands.quiet,
        disable_input: commands.disable_input,
    };

    logging::init_logging(cfg.quiet);
    print::banner(cfg.no_banner, cfg.quiet);

    match commands.command {
        Commands::Run(args) => run::run(args, &cfg).await,
        Commands::Plan(args) => {
            plan::plan(args, &cfg)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

use anyhow::Context;
use colored::*;

use crate::commands::InventoryArgs;
use crate::mprint;
use crate::terminal::{colors, format, print};
use dispatchr_common::{config::Config, inventory::InventorySnapshot, success};
use dispatchr_core::resolver::{self, Plan};

/// Dry run: resolves every host and prints the result without connecting.
pub fn plan(args: InventoryArgs, cfg: &Config) -> anyhow::Result<()> {
    let inventory = InventorySnapshot::from_file(&args.inventory)
        .with_context(|| format!("could not load inventory from {}", args.inventory.display()))?;
    let plan = resolver::plan(&inventory, args.overwrite);

    if plan.is_empty() {
        print::header("nothing to run", cfg.quiet);
        print::nothing_to_run();
        return Ok(());
    }

    print::header("resolved plan", cfg.quiet);
    if cfg.quiet == 0 {
        print_plans(&plan);
    }
    print_skipped(&plan, cfg);

    let hosts: ColoredString = format!("{} hosts", plan.plans.len()).bold().color(colors::OK);
    let commands: ColoredString = format!("{} commands", plan.command_count())
        .bold()
        .color(colors::ACCENT);
    success!("Plan ready: {hosts} would run {commands}");
    Ok(())
}

fn print_plans(plan: &Plan) {
    let last = plan.plans.len();
    for (idx, (host, commands)) in plan.plans.iter().enumerate() {
        print::tree_head(idx, host);
        print::as_tree_one_level(format::commands_to_key_value_pair(commands));
        if idx + 1 != last {
            mprint!();
        }
    }
}

fn print_skipped(plan: &Plan, cfg: &Config) {
    if plan.skipped.is_empty() || cfg.quiet > 1 {
        return;
    }

    mprint!();
    let names: Vec<String> = plan
        .skipped
        .iter()
        .map(|host| host.color(colors::PARTIAL).to_string())
        .collect();
    print::print_status(format!("Skipped, no commands: {}", names.join(", ")));
}

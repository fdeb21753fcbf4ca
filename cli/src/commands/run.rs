use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use colored::*;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::commands::RunArgs;
use crate::mprint;
use crate::terminal::{colors, format, input::InputHandle, print, spinner};
use dispatchr_common::{
    config::Config, inventory::InventorySnapshot, result::ResultRecord, success,
};
use dispatchr_core::{
    dispatch::Dispatcher,
    network::SshTransport,
    resolver::{self, Plan},
    sink::ChannelSink,
    summary::{HostReport, RunSummary},
};

pub async fn run(args: RunArgs, cfg: &Config) -> anyhow::Result<ExitCode> {
    let path = &args.inventory.inventory;
    let inventory = InventorySnapshot::from_file(path)
        .with_context(|| format!("could not load inventory from {}", path.display()))?;
    let options = args.dispatch_options();
    let plan = resolver::plan(&inventory, options.overwrite);

    if plan.is_empty() {
        print::header("nothing to run", cfg.quiet);
        print::nothing_to_run();
        return Ok(ExitCode::SUCCESS);
    }

    print_run_header(&args, &plan, cfg);

    let shutdown = CancellationToken::new();
    let signal_task = tokio::spawn(cancel_on_ctrl_c(shutdown.clone()));
    let keys = if cfg.disable_input {
        None
    } else {
        InputHandle::start(shutdown.clone())
    };

    let (sink, rx) = ChannelSink::new();
    let renderer = tokio::spawn(render_results(rx, cfg.quiet));

    spinner::start();
    let dispatcher =
        Dispatcher::with_cancellation_token(Arc::new(SshTransport::new()), options, shutdown.clone());
    let summary = dispatcher
        .dispatch(Arc::new(inventory), plan, Arc::new(sink))
        .await;

    let rendered = renderer.await.context("result renderer stopped unexpectedly")?;
    spinner::stop();
    signal_task.abort();
    if let Some(keys) = keys {
        keys.stop();
    }
    debug!(rendered, "all results rendered");

    print_summary(&summary, cfg);

    if summary.has_errors() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

async fn cancel_on_ctrl_c(shutdown: CancellationToken) {
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => warn!("interrupt received, cancelling the run"),
                Err(e) => warn!(error = %e, "could not listen for ctrl-c, cancelling the run"),
            }
            shutdown.cancel();
        }
        _ = shutdown.cancelled() => {}
    }
}

async fn render_results(mut rx: UnboundedReceiver<ResultRecord>, quiet: u8) -> usize {
    let mut received: usize = 0;
    let mut failed: usize = 0;

    while let Some(record) = rx.recv().await {
        received += 1;
        if !record.result.is_success() {
            failed += 1;
        }

        match quiet {
            0 => print::print(&format::result_block(&record, true)),
            1 => print::print(&format::result_block(&record, false)),
            _ => {}
        }
        spinner::report_progress(received, failed);
    }

    received
}

fn print_run_header(args: &RunArgs, plan: &Plan, cfg: &Config) {
    if cfg.quiet > 0 {
        return;
    }

    let workers = match args.workers {
        Some(workers) => workers.to_string(),
        None => String::from("unbounded"),
    };
    let mode = match args.inventory.overwrite {
        true => "overwrite",
        false => "append",
    };

    print::header("dispatching", cfg.quiet);
    let width = 9;
    print::aligned_line("Inventory", width, args.inventory.inventory.display().to_string());
    print::aligned_line("Hosts", width, plan.plans.len().to_string());
    print::aligned_line("Commands", width, plan.command_count().to_string());
    print::aligned_line("Skipped", width, plan.skipped.len().to_string());
    print::aligned_line("Mode", width, mode);
    print::aligned_line("Workers", width, workers);
    mprint!();
}

fn print_summary(summary: &RunSummary, cfg: &Config) {
    if cfg.quiet == 0 {
        mprint!();
        print::header("run summary", cfg.quiet);
        print_hosts(&summary.hosts);
    }

    for report in summary.close_failures() {
        if let Some(error) = &report.close_error {
            warn!(host = %report.host, "session did not close cleanly: {error}");
        }
    }

    print_verdict(summary, cfg);
}

fn print_hosts(hosts: &[HostReport]) {
    for (idx, report) in hosts.iter().enumerate() {
        print::tree_head(idx, &report.host);
        print::as_tree_one_level(format::report_to_key_value_pair(report));
        if idx + 1 != hosts.len() {
            mprint!();
        }
    }
}

fn print_verdict(summary: &RunSummary, cfg: &Config) {
    let succeeded: ColoredString = format!("{} succeeded", summary.succeeded().count())
        .bold()
        .color(colors::OK);
    let failed_count = summary.partial().count() + summary.open_failed().count() + summary.crashed().count();
    let failed: ColoredString = format!("{failed_count} failed").bold().color(colors::FAILED);
    let elapsed: ColoredString = format!("{:.2}s", summary.elapsed.as_secs_f64()).bold().yellow();

    let mut output = format!("Run Complete: {succeeded}, {failed}");
    let cancelled = summary.cancelled().count();
    if cancelled > 0 {
        output.push_str(&format!(
            ", {}",
            format!("{cancelled} cancelled").bold().color(colors::PARTIAL)
        ));
    }
    output.push_str(&format!(" in {elapsed}"));
    let output: ColoredString = output.color(colors::TEXT_DEFAULT);

    match cfg.quiet {
        0 => {
            print::fat_separator();
            print::centerln(&output);
            print::end_of_program();
        }
        1 => {
            mprint!();
            if summary.has_errors() {
                warn!("{}", output);
            } else {
                success!("{}", output);
            }
        }
        _ => {
            let symbol: ColoredString = if summary.has_errors() {
                "[*]".yellow().bold()
            } else {
                "[+]".green().bold()
            };
            print::print(&format!("{symbol} {output}"));
        }
    }
}

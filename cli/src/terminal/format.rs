use crate::terminal::colors;
use colored::*;
use dispatchr_common::result::ResultRecord;
use dispatchr_core::summary::{HostReport, HostStatus};

const OUTPUT_INDENT: &str = "    ";

/// Renders one streamed result as a single block so concurrent hosts never
/// interleave inside it.
pub fn result_block(record: &ResultRecord, show_output: bool) -> String {
    let result = &record.result;
    let marker: ColoredString = if result.is_success() {
        "✔".color(colors::OK)
    } else {
        "✘".color(colors::FAILED)
    };

    let mut block = format!(
        "{} {} {} {}",
        marker,
        record.host.color(colors::PRIMARY).bold(),
        "$".color(colors::SEPARATOR),
        result.command.color(colors::COMMAND)
    );

    if let Some(error) = &result.error {
        block.push_str(&format!(" {}", format!("({error})").color(colors::FAILED)));
    }

    if !show_output {
        return block;
    }

    for line in result.stdout.lines() {
        block.push('\n');
        block.push_str(OUTPUT_INDENT);
        block.push_str(&line.color(colors::TEXT_DEFAULT).to_string());
    }
    for line in result.stderr.lines() {
        block.push('\n');
        block.push_str(OUTPUT_INDENT);
        block.push_str(&line.color(colors::STDERR).to_string());
    }

    block
}

pub fn status_label(status: &HostStatus) -> ColoredString {
    match status {
        HostStatus::Succeeded => "succeeded".color(colors::OK).bold(),
        HostStatus::Partial(_) => "partial".color(colors::PARTIAL).bold(),
        HostStatus::OpenFailed(_) => "open failed".color(colors::FAILED).bold(),
        HostStatus::Cancelled => "cancelled".color(colors::PARTIAL),
        HostStatus::Crashed(_) => "crashed".color(colors::FAILED).bold(),
    }
}

pub fn status_reason(status: &HostStatus) -> Option<String> {
    match status {
        HostStatus::Succeeded | HostStatus::Cancelled => None,
        HostStatus::Partial(e) => Some(e.to_string()),
        HostStatus::OpenFailed(e) => Some(e.to_string()),
        HostStatus::Crashed(reason) => Some(reason.clone()),
    }
}

pub fn report_to_key_value_pair(report: &HostReport) -> Vec<(String, ColoredString)> {
    let mut pairs: Vec<(String, ColoredString)> = vec![
        (String::from("Status"), status_label(&report.status)),
        (
            String::from("Commands"),
            format!("{}/{}", report.completed, report.planned).color(colors::ACCENT),
        ),
    ];

    if let Some(reason) = status_reason(&report.status) {
        pairs.push((String::from("Reason"), reason.color(colors::FAILED)));
    }

    if let Some(close_error) = &report.close_error {
        pairs.push((
            String::from("Close"),
            close_error.to_string().color(colors::FAILED),
        ));
    }

    pairs
}

pub fn commands_to_key_value_pair(commands: &[String]) -> Vec<(String, ColoredString)> {
    commands
        .iter()
        .enumerate()
        .map(|(idx, command)| (format!("#{}", idx + 1), command.color(colors::COMMAND)))
        .collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

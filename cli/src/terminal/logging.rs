use std::fmt;

use colored::*;
use dispatchr_common::logging::{PRINT_TARGET, STATUS_SUCCESS};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::registry::LookupSpan;

use crate::terminal::spinner::SpinnerWriter;

pub struct DispatchFormatter;

#[derive(Default)]
struct EventFields {
    message: Option<String>,
    raw_msg: Option<String>,
    status: Option<String>,
    rest: Vec<(&'static str, String)>,
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.store(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.store(field, format!("{value:?}"));
    }
}

impl EventFields {
    fn store(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            "raw_msg" => self.raw_msg = Some(value),
            "status" => self.status = Some(value),
            name => self.rest.push((name, value)),
        }
    }
}

impl<S, N> FormatEvent<S, N> for DispatchFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let mut fields = EventFields::default();
        event.record(&mut fields);

        if meta.target() == PRINT_TARGET
            && let Some(raw) = fields.raw_msg
        {
            return writeln!(writer, "{raw}");
        }

        let success = fields.status.as_deref() == Some(STATUS_SUCCESS);
        let (symbol, color_func): (&str, fn(ColoredString) -> ColoredString) = match *meta.level() {
            Level::TRACE => ("[ ]", |s| s.dimmed()),
            Level::DEBUG => ("[?]", |s| s.blue()),
            Level::INFO if success => ("[+]", |s| s.green().bold()),
            Level::INFO => ("[~]", |s| s.cyan().bold()),
            Level::WARN => ("[*]", |s| s.yellow().bold()),
            Level::ERROR => ("[-]", |s| s.red().bold()),
        };

        write!(writer, "{} ", color_func(symbol.into()))?;
        write!(writer, "{}", fields.message.unwrap_or_default())?;

        for (key, value) in &fields.rest {
            write!(writer, " {}", format!("{key}={value}").dimmed())?;
        }

        writeln!(writer)
    }
}

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over the quiet level when it is set.
pub fn init_logging(quiet: u8) {
    let default_directives = match quiet {
        0 | 1 => "info,russh=warn".to_string(),
        _ => format!("warn,{PRINT_TARGET}=info"),
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(DispatchFormatter)
        .with_writer(|| SpinnerWriter)
        .init();
}

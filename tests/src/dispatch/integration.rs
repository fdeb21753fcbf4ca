#![cfg(test)]
use std::sync::Arc;
use std::time::Duration;

use crate::support::{ScriptedTransport, fleet};
use dispatchr_common::config::DispatchOptions;
use dispatchr_common::error::{CloseError, CommandError, OpenError};
use dispatchr_common::inventory::InventorySnapshot;
use dispatchr_core::dispatch::Dispatcher;
use dispatchr_core::resolver::{self, resolve};
use dispatchr_core::sink::{ChannelSink, MemorySink, ResultSink};
use dispatchr_core::summary::HostStatus;
use tokio_util::sync::CancellationToken;

fn dispatcher(transport: &Arc<ScriptedTransport>, options: DispatchOptions) -> Dispatcher<ScriptedTransport> {
    Dispatcher::with_cancellation_token(Arc::clone(transport), options, CancellationToken::new())
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn resolve_appends_or_replaces_defaults() {
    let defaults = strings(&["show version", "show run"]);
    let host = strings(&["show ip int br"]);

    assert_eq!(
        resolve(Some(defaults.as_slice()), &host, false),
        strings(&["show version", "show run", "show ip int br"])
    );
    assert_eq!(
        resolve(Some(defaults.as_slice()), &host, true),
        strings(&["show ip int br"])
    );
    assert!(resolve(None, &[], false).is_empty());
    assert!(resolve(None, &[], true).is_empty());
}

/// B cannot be reached; A still runs everything and is closed.
#[tokio::test]
async fn open_failure_is_isolated() {
    let inventory = Arc::new(fleet(2, &["show version", "show run"]));
    let plan = resolver::plan(&inventory, false);
    let transport = Arc::new(ScriptedTransport::new().refuse("10.0.0.1"));
    let sink = Arc::new(MemorySink::new());

    let summary = dispatcher(&transport, DispatchOptions::default())
        .dispatch(inventory, plan, sink.clone())
        .await;

    assert_eq!(summary.report("r0").unwrap().status, HostStatus::Succeeded);
    assert!(matches!(
        summary.report("r1").unwrap().status,
        HostStatus::OpenFailed(OpenError::Connect(_))
    ));
    assert_eq!(transport.executed_on("10.0.0.0"), strings(&["show version", "show run"]));
    assert_eq!(transport.closes_for("10.0.0.0"), 1);
    assert_eq!(transport.closes_for("10.0.0.1"), 0);
    assert!(sink.records_for("r1").is_empty());
    assert!(summary.has_errors());
}

#[tokio::test]
async fn rejected_credentials_are_reported_per_host() {
    let inventory = Arc::new(fleet(3, &["show clock"]));
    let plan = resolver::plan(&inventory, false);
    let transport = Arc::new(ScriptedTransport::new().reject_auth("10.0.0.2"));

    let summary = dispatcher(&transport, DispatchOptions::default())
        .dispatch(inventory, plan, Arc::new(MemorySink::new()))
        .await;

    assert_eq!(summary.succeeded().count(), 2);
    assert_eq!(
        summary.report("r2").unwrap().status,
        HostStatus::OpenFailed(OpenError::Auth {
            user: "admin".to_string()
        })
    );
}

/// Command 2 of 3 fails: command 3 never runs there, siblings are untouched.
#[tokio::test]
async fn failing_command_halts_only_its_host() {
    let inventory = Arc::new(fleet(2, &["show version", "show run", "show clock"]));
    let plan = resolver::plan(&inventory, false);
    let transport = Arc::new(ScriptedTransport::new().fail(
        "10.0.0.0",
        "show run",
        CommandError::NonZeroExit(1),
    ));
    let sink = Arc::new(MemorySink::new());

    let summary = dispatcher(&transport, DispatchOptions::default())
        .dispatch(inventory, plan, sink.clone())
        .await;

    assert_eq!(transport.executed_on("10.0.0.0"), strings(&["show version", "show run"]));
    assert_eq!(
        transport.executed_on("10.0.0.1"),
        strings(&["show version", "show run", "show clock"])
    );

    let r0 = summary.report("r0").unwrap();
    assert_eq!(r0.status, HostStatus::Partial(CommandError::NonZeroExit(1)));
    assert_eq!((r0.completed, r0.planned), (1, 3));

    let failed = sink.records_for("r0");
    assert_eq!(failed.len(), 2);
    assert_eq!(failed[1].result.error, Some(CommandError::NonZeroExit(1)));

    assert_eq!(transport.closes_for("10.0.0.0"), 1);
    assert_eq!(transport.closes_for("10.0.0.1"), 1);
}

#[tokio::test]
async fn every_opened_session_is_closed_once() {
    let inventory = Arc::new(fleet(6, &["show version", "show run"]));
    let plan = resolver::plan(&inventory, false);
    let transport = Arc::new(
        ScriptedTransport::new()
            .refuse("10.0.0.1")
            .fail("10.0.0.2", "show version", CommandError::Transport("eof".to_string()))
            .fail("10.0.0.3", "show run", CommandError::NonZeroExit(127)),
    );

    dispatcher(&transport, DispatchOptions::default())
        .dispatch(inventory, plan, Arc::new(MemorySink::new()))
        .await;

    for i in 0..6 {
        let address = format!("10.0.0.{i}");
        assert_eq!(
            transport.opens_for(&address),
            transport.closes_for(&address),
            "open/close mismatch on {address}"
        );
    }
    assert_eq!(transport.total_closes(), 5);
}

#[tokio::test]
async fn command_timeout_halts_the_host_and_still_closes() {
    let inventory = Arc::new(fleet(2, &["show tech", "show clock"]));
    let plan = resolver::plan(&inventory, false);
    let transport = Arc::new(ScriptedTransport::new().hang("10.0.0.0", "show tech"));
    let options = DispatchOptions {
        command_timeout: Duration::from_millis(50),
        ..DispatchOptions::default()
    };

    let summary = dispatcher(&transport, options)
        .dispatch(inventory, plan, Arc::new(MemorySink::new()))
        .await;

    assert_eq!(
        summary.report("r0").unwrap().status,
        HostStatus::Partial(CommandError::Timeout(Duration::from_millis(50)))
    );
    assert_eq!(transport.executed_on("10.0.0.0"), strings(&["show tech"]));
    assert_eq!(transport.closes_for("10.0.0.0"), 1);
    assert_eq!(summary.report("r1").unwrap().status, HostStatus::Succeeded);
}

/// Cancelling while a command is in flight still closes every open session.
#[tokio::test]
async fn cancellation_mid_flight_closes_sessions() {
    let inventory = Arc::new(fleet(3, &["show tech", "show clock"]));
    let plan = resolver::plan(&inventory, false);
    let transport = Arc::new(
        ScriptedTransport::new()
            .hang("10.0.0.0", "show tech")
            .hang("10.0.0.1", "show tech")
            .hang("10.0.0.2", "show tech"),
    );
    let shutdown = CancellationToken::new();
    let dispatcher = Dispatcher::with_cancellation_token(
        Arc::clone(&transport),
        DispatchOptions::default(),
        shutdown.clone(),
    );
    let sink = Arc::new(MemorySink::new());

    let run = tokio::spawn({
        let sink = sink.clone();
        async move { dispatcher.dispatch(inventory, plan, sink).await }
    });

    transport.hang_started().await;
    shutdown.cancel();
    let summary = run.await.unwrap();

    assert_eq!(summary.cancelled().count(), 3);
    assert_eq!(transport.total_opens(), transport.total_closes());
    for i in 0..3 {
        assert!(!transport.executed_on(&format!("10.0.0.{i}")).contains(&"show clock".to_string()));
    }
    assert!(summary.has_errors());
}

#[tokio::test]
async fn cancelled_before_start_opens_nothing() {
    let inventory = Arc::new(fleet(4, &["show version"]));
    let plan = resolver::plan(&inventory, false);
    let transport = Arc::new(ScriptedTransport::new());
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let summary = Dispatcher::with_cancellation_token(
        Arc::clone(&transport),
        DispatchOptions::default(),
        shutdown,
    )
    .dispatch(inventory, plan, Arc::new(MemorySink::new()))
    .await;

    assert_eq!(summary.cancelled().count(), 4);
    assert_eq!(transport.total_opens(), 0);
    assert_eq!(transport.total_closes(), 0);
}

#[tokio::test]
async fn concurrency_bound_is_respected() {
    let inventory = Arc::new(fleet(8, &["show version", "show run"]));
    let plan = resolver::plan(&inventory, false);
    let transport = Arc::new(ScriptedTransport::new().delay_commands(Duration::from_millis(10)));
    let options = DispatchOptions {
        max_concurrency: Some(2),
        ..DispatchOptions::default()
    };

    let summary = dispatcher(&transport, options)
        .dispatch(inventory, plan, Arc::new(MemorySink::new()))
        .await;

    assert_eq!(summary.succeeded().count(), 8);
    assert!(transport.peak_open_sessions() <= 2);
    assert_eq!(transport.total_closes(), 8);
}

#[tokio::test]
async fn unbounded_runs_hosts_concurrently() {
    let inventory = Arc::new(fleet(5, &["show version"]));
    let plan = resolver::plan(&inventory, false);
    let transport = Arc::new(ScriptedTransport::new().delay_commands(Duration::from_millis(50)));

    dispatcher(&transport, DispatchOptions::default())
        .dispatch(inventory, plan, Arc::new(MemorySink::new()))
        .await;

    assert!(transport.peak_open_sessions() > 1);
}

/// Hosts interleave freely, but each host's results keep their order.
#[tokio::test]
async fn per_host_order_survives_concurrency() {
    let defaults = ["show version", "show run", "show clock", "show users"];
    let inventory = Arc::new(fleet(6, &defaults));
    let plan = resolver::plan(&inventory, false);
    let transport = Arc::new(ScriptedTransport::new().delay_commands(Duration::from_millis(2)));
    let (sink, mut rx) = ChannelSink::new();
    let sink: Arc<dyn ResultSink> = Arc::new(sink);

    let summary = dispatcher(&transport, DispatchOptions::default())
        .dispatch(inventory, plan, sink)
        .await;

    let mut records = Vec::new();
    while let Some(record) = rx.recv().await {
        records.push(record);
    }

    assert_eq!(records.len(), 24);
    for report in &summary.hosts {
        let seen: Vec<&str> = records
            .iter()
            .filter(|record| record.host == report.host)
            .map(|record| record.result.command.as_str())
            .collect();
        assert_eq!(seen, defaults);
    }
}

#[tokio::test]
async fn hosts_without_commands_never_get_a_session() {
    let inventory: InventorySnapshot = r#"
platform_defaults:
  ios: [show version]
nodes:
  core1: { hostname: 10.0.0.0, username: admin, platform: ios }
  edge1: { hostname: 10.0.0.1, username: admin, platform: junos }
  edge2: { hostname: 10.0.0.2, username: admin }
  edge3: { hostname: 10.0.0.3, username: admin, commands: [show route] }
"#
    .parse()
    .unwrap();
    let inventory = Arc::new(inventory);
    let plan = resolver::plan(&inventory, false);
    let transport = Arc::new(ScriptedTransport::new());

    assert_eq!(plan.skipped, strings(&["edge1", "edge2"]));

    let summary = dispatcher(&transport, DispatchOptions::default())
        .dispatch(inventory, plan, Arc::new(MemorySink::new()))
        .await;

    assert_eq!(summary.hosts.len(), 2);
    assert_eq!(summary.skipped, strings(&["edge1", "edge2"]));
    assert_eq!(transport.opens_for("10.0.0.1"), 0);
    assert_eq!(transport.opens_for("10.0.0.2"), 0);
    assert_eq!(transport.executed_on("10.0.0.3"), strings(&["show route"]));
    assert!(!summary.has_errors());
}

#[tokio::test]
async fn overwrite_replaces_defaults_for_the_run() {
    let inventory: InventorySnapshot = r#"
platform_defaults:
  ios: [show version, show run]
nodes:
  r1: { hostname: 10.0.0.1, username: admin, platform: ios, commands: [show ip int br] }
  r2: { hostname: 10.0.0.2, username: admin, platform: ios }
"#
    .parse()
    .unwrap();
    let inventory = Arc::new(inventory);
    let plan = resolver::plan(&inventory, true);
    let transport = Arc::new(ScriptedTransport::new());

    dispatcher(&transport, DispatchOptions::default())
        .dispatch(inventory, plan, Arc::new(MemorySink::new()))
        .await;

    assert_eq!(transport.executed_on("10.0.0.1"), strings(&["show ip int br"]));
    assert_eq!(transport.executed_on("10.0.0.2"), strings(&["show version", "show run"]));
}

/// A transport that panics mid-run still gets its session closed.
#[tokio::test]
async fn panicking_command_still_closes_session() {
    let inventory = Arc::new(fleet(2, &["show version", "show run", "show clock"]));
    let plan = resolver::plan(&inventory, false);
    let transport = Arc::new(ScriptedTransport::new().panic_on("show run"));
    let sink = Arc::new(MemorySink::new());

    let summary = dispatcher(&transport, DispatchOptions::default())
        .dispatch(inventory, plan, sink.clone())
        .await;

    assert_eq!(transport.total_opens(), 2);
    assert_eq!(transport.total_closes(), 2);
    assert_eq!(summary.crashed().count(), 2);
    for i in 0..2 {
        let address = format!("10.0.0.{i}");
        assert_eq!(transport.executed_on(&address), strings(&["show version", "show run"]));
        let report = summary.report(&format!("r{i}")).unwrap();
        assert!(matches!(&report.status, HostStatus::Crashed(msg) if msg.contains("show run")));
        assert_eq!(report.close_error, None);
    }
    assert_eq!(sink.records_for("r0").len(), 1);
    assert!(summary.has_errors());
}

/// A failing close keeps the host's results and status but fails the run.
#[tokio::test]
async fn close_failure_is_reported_next_to_results() {
    let inventory = Arc::new(fleet(2, &["show version", "show run"]));
    let plan = resolver::plan(&inventory, false);
    let transport = Arc::new(ScriptedTransport::new().fail_close("10.0.0.1"));
    let sink = Arc::new(MemorySink::new());

    let summary = dispatcher(&transport, DispatchOptions::default())
        .dispatch(inventory, plan, sink.clone())
        .await;

    let r1 = summary.report("r1").unwrap();
    assert_eq!(r1.status, HostStatus::Succeeded);
    assert_eq!(r1.completed, 2);
    assert_eq!(
        r1.close_error,
        Some(CloseError::Transport("connection reset by peer".to_string()))
    );
    assert_eq!(sink.records_for("r1").len(), 2);
    assert_eq!(transport.closes_for("10.0.0.1"), 1);

    assert!(summary.report("r0").unwrap().is_clean());
    assert_eq!(summary.close_failures().count(), 1);
    assert!(summary.has_errors());
}

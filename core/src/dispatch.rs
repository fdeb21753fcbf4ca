//! The **dispatch orchestrator**.
//!
//! Fans a [`Plan`] out into one tokio task per host. Every task walks the same
//! lifecycle on its own:
//!
//! 1. wait for a concurrency permit (only when a bound is configured),
//! 2. open the host's session,
//! 3. run the resolved commands through the [`Executor`],
//! 4. close the session, whatever step 3 returned.
//!
//! Tasks share nothing mutable except the result sink. A failing host never
//! aborts its siblings, and [`Dispatcher::dispatch`] only returns once every
//! task reached a terminal state.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use dispatchr_common::{config::DispatchOptions, inventory::InventorySnapshot};
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::executor::Executor;
use crate::resolver::{Plan, ResolvedPlan};
use crate::session::{SessionLifecycle, SessionTransport};
use crate::sink::ResultSink;
use crate::summary::{HostReport, HostStatus, RunSummary};

pub struct Dispatcher<T: SessionTransport> {
    transport: Arc<T>,
    options: DispatchOptions,
    shutdown: CancellationToken,
}

/// Everything one host-task owns.
struct HostTask<T: SessionTransport> {
    host: String,
    commands: ResolvedPlan,
    inventory: Arc<InventorySnapshot>,
    lifecycle: SessionLifecycle<T>,
    executor: Executor<T>,
    sink: Arc<dyn ResultSink>,
    limiter: Option<Arc<Semaphore>>,
    shutdown: CancellationToken,
}

impl<T: SessionTransport> Dispatcher<T> {
    pub fn new(transport: T, options: DispatchOptions) -> Self {
        Self::with_cancellation_token(Arc::new(transport), options, CancellationToken::new())
    }

    /// Builds a dispatcher that stops when `shutdown` is cancelled.
    pub fn with_cancellation_token(
        transport: Arc<T>,
        options: DispatchOptions,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            transport,
            options,
            shutdown,
        }
    }

    /// Returns a clone of the run's token so callers can wire their own
    /// signal handling to it.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs every planned host and waits for all of them.
    pub async fn dispatch(
        &self,
        inventory: Arc<InventorySnapshot>,
        plan: Plan,
        sink: Arc<dyn ResultSink>,
    ) -> RunSummary {
        let start = Instant::now();
        let lifecycle = SessionLifecycle::new(Arc::clone(&self.transport), &self.options, self.shutdown.clone());
        let executor = Executor::new(Arc::clone(&self.transport), &self.options, self.shutdown.clone());
        let limiter = self
            .options
            .max_concurrency
            .map(|permits| Arc::new(Semaphore::new(permits.max(1))));

        info!(
            hosts = plan.plans.len(),
            commands = plan.command_count(),
            skipped = plan.skipped.len(),
            "dispatching"
        );

        let mut handles: Vec<(String, usize, JoinHandle<HostReport>)> = Vec::with_capacity(plan.plans.len());
        for (host, commands) in plan.plans {
            let planned = commands.len();
            let task = HostTask {
                host: host.clone(),
                commands,
                inventory: Arc::clone(&inventory),
                lifecycle: lifecycle.clone(),
                executor: executor.clone(),
                sink: Arc::clone(&sink),
                limiter: limiter.clone(),
                shutdown: self.shutdown.clone(),
            };
            handles.push((host, planned, tokio::spawn(run_host(task))));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (host, planned, handle) in handles {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(host = %host, error = %e, "host task did not finish");
                    reports.push(HostReport::new(host, planned, HostStatus::Crashed(e.to_string())));
                }
            }
        }

        RunSummary::new(reports, plan.skipped, start.elapsed())
    }
}

async fn run_host<T: SessionTransport>(task: HostTask<T>) -> HostReport {
    let HostTask {
        host,
        commands,
        inventory,
        lifecycle,
        executor,
        sink,
        limiter,
        shutdown,
    } = task;
    let planned = commands.len();

    let _permit = match limiter {
        Some(limiter) => tokio::select! {
            biased;
            permit = limiter.acquire_owned() => permit.ok(),
            _ = shutdown.cancelled() => return HostReport::new(host, planned, HostStatus::Cancelled),
        },
        None => None,
    };

    let Some(spec) = inventory.hosts.get(&host) else {
        error!(host = %host, "planned host is missing from the inventory");
        return HostReport::new(
            host,
            planned,
            HostStatus::Crashed("host missing from inventory".to_string()),
        );
    };

    let mut session = match lifecycle.open(&host, spec).await {
        Ok(session) => session,
        Err(e) => return HostReport::open_failed(host, planned, e),
    };

    // Nothing between open and close may return early or unwind.
    let outcome = AssertUnwindSafe(executor.run(&host, &mut session, &commands, sink.as_ref()))
        .catch_unwind()
        .await;
    let close_error = lifecycle.close(&host, session).await.err();

    let report = match outcome {
        Ok(outcome) => HostReport::from_execution(host, planned, outcome, close_error),
        Err(panic_payload) => {
            let panic_msg = panic_message(panic_payload.as_ref());
            error!(host = %host, panic = %panic_msg, "command execution panicked");
            let mut report = HostReport::new(host, planned, HostStatus::Crashed(panic_msg));
            report.close_error = close_error;
            report
        }
    };
    if report.status == HostStatus::Succeeded {
        info!(host = %report.host, commands = report.completed, "host finished");
    }
    report
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

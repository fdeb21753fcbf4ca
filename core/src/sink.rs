//! Destinations for command results.
//!
//! A sink receives whole [`ResultRecord`]s, so concurrent hosts can never
//! interleave the fields of a single result.

use std::sync::Mutex;

use dispatchr_common::result::ResultRecord;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::warn;

/// Append-only consumer of results, shared by every host-task of a run.
pub trait ResultSink: Send + Sync {
    fn emit(&self, record: ResultRecord);
}

/// Forwards records to a single consumer over an unbounded channel.
///
/// Per-host order is preserved because a host emits from one task only.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<ResultRecord>,
}

impl ChannelSink {
    pub fn new() -> (Self, UnboundedReceiver<ResultRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ResultSink for ChannelSink {
    fn emit(&self, record: ResultRecord) {
        if let Err(e) = self.tx.send(record) {
            warn!(host = %e.0.host, command = %e.0.result.command, "result dropped, consumer is gone");
        }
    }
}

/// Keeps every record in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<ResultRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ResultRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Records of one host, in the order that host emitted them.
    pub fn records_for(&self, host: &str) -> Vec<ResultRecord> {
        self.records()
            .into_iter()
            .filter(|record| record.host == host)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultSink for MemorySink {
    fn emit(&self, record: ResultRecord) {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        records.push(record);
    }
}

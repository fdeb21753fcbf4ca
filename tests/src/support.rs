//! A transport whose behaviour is scripted per host, plus inventory helpers.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dispatchr_common::{
    error::{CloseError, CommandError, OpenError},
    inventory::{HostSpec, InventorySnapshot},
    result::CommandResult,
};
use dispatchr_core::session::SessionTransport;
use tokio::sync::Notify;

const FOREVER: Duration = Duration::from_secs(3_600);

pub struct ScriptedSession {
    address: String,
}

#[derive(Default)]
pub struct ScriptedTransport {
    refused: HashSet<String>,
    rejected: HashSet<String>,
    failures: HashMap<(String, String), CommandError>,
    hangs: HashSet<(String, String)>,
    panics: HashSet<String>,
    failing_closes: HashSet<String>,
    command_delay: Duration,

    opens: Mutex<HashMap<String, usize>>,
    closes: Mutex<HashMap<String, usize>>,
    executed: Mutex<HashMap<String, Vec<String>>>,
    open_now: AtomicUsize,
    peak_open: AtomicUsize,
    hang_started: Notify,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connection to `address` fails.
    pub fn refuse(mut self, address: &str) -> Self {
        self.refused.insert(address.to_string());
        self
    }

    /// `address` rejects the credentials.
    pub fn reject_auth(mut self, address: &str) -> Self {
        self.rejected.insert(address.to_string());
        self
    }

    pub fn fail(mut self, address: &str, command: &str, error: CommandError) -> Self {
        self.failures
            .insert((address.to_string(), command.to_string()), error);
        self
    }

    /// `command` never returns on `address`.
    pub fn hang(mut self, address: &str, command: &str) -> Self {
        self.hangs.insert((address.to_string(), command.to_string()));
        self
    }

    /// `command` panics inside the transport, on every host.
    pub fn panic_on(mut self, command: &str) -> Self {
        self.panics.insert(command.to_string());
        self
    }

    /// Closing the session of `address` reports an error.
    pub fn fail_close(mut self, address: &str) -> Self {
        self.failing_closes.insert(address.to_string());
        self
    }

    /// Every command takes `delay` before returning.
    pub fn delay_commands(mut self, delay: Duration) -> Self {
        self.command_delay = delay;
        self
    }

    /// Resolves once some host is stuck in a hanging command.
    pub async fn hang_started(&self) {
        self.hang_started.notified().await;
    }

    pub fn opens_for(&self, address: &str) -> usize {
        counter(&self.opens, address)
    }

    pub fn closes_for(&self, address: &str) -> usize {
        counter(&self.closes, address)
    }

    pub fn total_opens(&self) -> usize {
        self.opens.lock().unwrap().values().sum()
    }

    pub fn total_closes(&self) -> usize {
        self.closes.lock().unwrap().values().sum()
    }

    pub fn executed_on(&self, address: &str) -> Vec<String> {
        self.executed
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_default()
    }

    /// Highest number of sessions that were open at the same time.
    pub fn peak_open_sessions(&self) -> usize {
        self.peak_open.load(Ordering::SeqCst)
    }
}

fn counter(map: &Mutex<HashMap<String, usize>>, address: &str) -> usize {
    map.lock().unwrap().get(address).copied().unwrap_or(0)
}

#[async_trait]
impl SessionTransport for ScriptedTransport {
    type Session = ScriptedSession;

    async fn open(&self, host: &HostSpec) -> Result<ScriptedSession, OpenError> {
        tokio::task::yield_now().await;

        if self.refused.contains(&host.address) {
            return Err(OpenError::Connect(format!("{}: connection refused", host.address)));
        }
        if self.rejected.contains(&host.address) {
            return Err(OpenError::Auth {
                user: host.username.clone(),
            });
        }

        *self
            .opens
            .lock()
            .unwrap()
            .entry(host.address.clone())
            .or_default() += 1;
        let now = self.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_open.fetch_max(now, Ordering::SeqCst);

        Ok(ScriptedSession {
            address: host.address.clone(),
        })
    }

    async fn execute(&self, session: &mut ScriptedSession, command: &str) -> CommandResult {
        self.executed
            .lock()
            .unwrap()
            .entry(session.address.clone())
            .or_default()
            .push(command.to_string());

        if self.panics.contains(command) {
            panic!("{}: transport blew up on '{command}'", session.address);
        }

        let key = (session.address.clone(), command.to_string());
        if self.hangs.contains(&key) {
            self.hang_started.notify_one();
            tokio::time::sleep(FOREVER).await;
        }
        if !self.command_delay.is_zero() {
            tokio::time::sleep(self.command_delay).await;
        }

        match self.failures.get(&key) {
            Some(CommandError::NonZeroExit(code)) => {
                CommandResult::completed(command, "", "% Invalid input detected", Some(*code))
            }
            Some(error) => CommandResult::failed(command, error.clone()),
            None => CommandResult::completed(
                command,
                format!("{}# {command}\nok", session.address),
                "",
                Some(0),
            ),
        }
    }

    async fn close(&self, session: ScriptedSession) -> Result<(), CloseError> {
        self.open_now.fetch_sub(1, Ordering::SeqCst);
        *self
            .closes
            .lock()
            .unwrap()
            .entry(session.address.clone())
            .or_default() += 1;

        if self.failing_closes.contains(&session.address) {
            return Err(CloseError::Transport("connection reset by peer".to_string()));
        }
        Ok(())
    }
}

/// Inventory with `count` hosts named `r0..rN` on platform `ios`, addressed
/// `10.0.0.0..10.0.0.N`.
pub fn fleet(count: usize, defaults: &[&str]) -> InventorySnapshot {
    let mut yaml = String::from("platform_defaults:\n  ios:\n");
    for command in defaults {
        yaml.push_str(&format!("    - \"{command}\"\n"));
    }
    yaml.push_str("nodes:\n");
    for i in 0..count {
        yaml.push_str(&format!(
            "  r{i}:\n    hostname: 10.0.0.{i}\n    username: admin\n    password: secret\n    platform: ios\n"
        ));
    }
    yaml.parse().unwrap()
}

//! # Command Resolution
//!
//! Merges platform defaults with host commands into the ordered list a host
//! will run. Nothing in here touches the network, so a [`Plan`] doubles as the
//! dry-run output of the CLI.

use std::collections::BTreeMap;

use dispatchr_common::inventory::InventorySnapshot;
use tracing::info;

/// Ordered commands for one host. Order is significant: device state left by
/// one command is visible to the next.
pub type ResolvedPlan = Vec<String>;

/// Resolved commands for a whole inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Hosts that will get a session, with their commands.
    pub plans: BTreeMap<String, ResolvedPlan>,
    /// Hosts that resolved to nothing and will not be contacted.
    pub skipped: Vec<String>,
}

impl Plan {
    pub fn command_count(&self) -> usize {
        self.plans.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

/// Merges the platform defaults of a host with its own commands.
///
/// An empty list counts as absent. When both are present, `overwrite` selects
/// between replacing the defaults and appending to them.
pub fn resolve(defaults: Option<&[String]>, overrides: &[String], overwrite: bool) -> ResolvedPlan {
    let defaults = defaults.unwrap_or_default();

    match (defaults.is_empty(), overrides.is_empty()) {
        (true, true) => Vec::new(),
        (false, true) => defaults.to_vec(),
        (true, false) => overrides.to_vec(),
        (false, false) if overwrite => overrides.to_vec(),
        (false, false) => defaults.iter().chain(overrides).cloned().collect(),
    }
}

/// Resolves every host of the inventory.
pub fn plan(inventory: &InventorySnapshot, overwrite: bool) -> Plan {
    let mut result = Plan::default();

    for (name, host) in &inventory.hosts {
        let commands = resolve(
            inventory.defaults_for(host),
            &host.override_commands,
            overwrite,
        );

        if commands.is_empty() {
            info!(host = %name, "No commands to execute for host '{name}'");
            result.skipped.push(name.clone());
        } else {
            result.plans.insert(name.clone(), commands);
        }
    }

    result
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

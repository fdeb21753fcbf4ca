//! # Inventory Model
//!
//! Parses the YAML inventory into an immutable [`InventorySnapshot`].
//!
//! The document has two top-level keys:
//! * `platform_defaults`: platform name to an ordered list of commands.
//! * `nodes`: host name to connection parameters, an optional platform, optional
//!   host commands and any number of extra keys which are kept verbatim.
//!
//! Everything is validated here, so a snapshot that exists is safe to dispatch.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::LoadError;
use crate::{success, warn};

pub const DEFAULT_SSH_PORT: u16 = 22;

/// Opaque per-host data, passed through without being interpreted.
pub type ExtraFields = BTreeMap<String, serde_yaml::Value>;

/// Read-only view of the whole inventory for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventorySnapshot {
    pub platform_defaults: BTreeMap<String, Vec<String>>,
    pub hosts: BTreeMap<String, HostSpec>,
}

/// One device and how to reach it.
#[derive(Clone, PartialEq)]
pub struct HostSpec {
    pub address: String,
    pub port: u16,
    pub username: String,
    pub secret: String,
    /// Need not name an entry of `platform_defaults`.
    pub platform: Option<String>,
    pub override_commands: Vec<String>,
    pub extra: ExtraFields,
}

impl fmt::Debug for HostSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostSpec")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .field("platform", &self.platform)
            .field("override_commands", &self.override_commands)
            .field("extra", &self.extra)
            .finish()
    }
}

#[derive(Deserialize)]
struct RawInventory {
    #[serde(default)]
    platform_defaults: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    nodes: Option<BTreeMap<String, RawHost>>,
}

#[derive(Deserialize)]
struct RawHost {
    hostname: String,
    #[serde(default)]
    port: Option<u16>,
    username: String,
    #[serde(default, alias = "secret")]
    password: Option<String>,
    #[serde(default)]
    platform: Option<String>,
    #[serde(default)]
    commands: Option<Vec<String>>,
    #[serde(flatten)]
    extra: ExtraFields,
}

impl InventorySnapshot {
    /// Reads and validates an inventory file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let snapshot: Self = text.parse()?;
        let len = snapshot.len();
        let unit = if len == 1 { "host" } else { "hosts" };
        success!("{len} {unit} loaded from {}", path.display());
        Ok(snapshot)
    }

    /// Default commands of the host's platform, if it has any.
    pub fn defaults_for(&self, host: &HostSpec) -> Option<&[String]> {
        host.platform
            .as_deref()
            .and_then(|platform| self.platform_defaults.get(platform))
            .map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl FromStr for InventorySnapshot {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: RawInventory = serde_yaml::from_str(s)?;

        let nodes = raw.nodes.unwrap_or_default();
        if nodes.is_empty() {
            return Err(LoadError::Empty);
        }

        let hosts = nodes
            .into_iter()
            .map(|(name, host)| {
                let spec = validate_host(&name, host)?;
                Ok((name, spec))
            })
            .collect::<Result<BTreeMap<_, _>, LoadError>>()?;

        let platform_defaults = raw.platform_defaults.unwrap_or_default();
        for (name, host) in &hosts {
            if let Some(platform) = &host.platform
                && !platform_defaults.contains_key(platform)
            {
                warn!(host = %name, platform = %platform, "platform has no default commands");
            }
        }

        Ok(Self {
            platform_defaults,
            hosts,
        })
    }
}

fn validate_host(name: &str, raw: RawHost) -> Result<HostSpec, LoadError> {
    let invalid = |reason: &str| LoadError::InvalidHost {
        host: name.to_string(),
        reason: reason.to_string(),
    };

    if name.trim().is_empty() {
        return Err(invalid("host name is empty"));
    }

    let address = raw.hostname.trim().to_string();
    if address.is_empty() {
        return Err(invalid("'hostname' is empty"));
    }

    let port = raw.port.unwrap_or(DEFAULT_SSH_PORT);
    if port == 0 {
        return Err(invalid("'port' must be between 1 and 65535"));
    }

    if raw.username.trim().is_empty() {
        return Err(invalid("'username' is empty"));
    }

    let platform = raw
        .platform
        .map(|platform| platform.trim().to_string())
        .filter(|platform| !platform.is_empty());

    Ok(HostSpec {
        address,
        port,
        username: raw.username,
        secret: raw.password.unwrap_or_default(),
        platform,
        override_commands: raw.commands.unwrap_or_default(),
        extra: raw.extra,
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

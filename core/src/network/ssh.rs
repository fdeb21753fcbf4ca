//! SSH transport built on `russh`.
//!
//! One authenticated connection per host; every command gets its own exec
//! channel so the exit status of each command is reported separately.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dispatchr_common::{
    error::{CloseError, CommandError, OpenError},
    inventory::HostSpec,
    result::CommandResult,
};
use russh::client::{self, Handle};
use russh::{ChannelMsg, Disconnect};
use tracing::{debug, trace};

use crate::session::SessionTransport;

const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300);
const STDERR_EXT: u32 = 1;

/// Accepts every server key. Host key pinning is not part of this tool.
pub struct DeviceHandler;

#[async_trait]
impl client::Handler for DeviceHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh_keys::key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

pub struct SshSession {
    handle: Handle<DeviceHandler>,
    address: String,
}

pub struct SshTransport {
    config: Arc<client::Config>,
}

impl SshTransport {
    pub fn new() -> Self {
        let config = client::Config {
            inactivity_timeout: Some(INACTIVITY_TIMEOUT),
            ..Default::default()
        };

        Self {
            config: Arc::new(config),
        }
    }
}

impl Default for SshTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionTransport for SshTransport {
    type Session = SshSession;

    async fn open(&self, host: &HostSpec) -> Result<SshSession, OpenError> {
        let addr = (host.address.clone(), host.port);
        let mut handle = client::connect(Arc::clone(&self.config), addr, DeviceHandler)
            .await
            .map_err(|e| OpenError::Connect(e.to_string()))?;

        let accepted = handle
            .authenticate_password(host.username.clone(), host.secret.clone())
            .await
            .map_err(|e| OpenError::Connect(e.to_string()))?;

        if !accepted {
            let _ = handle
                .disconnect(Disconnect::ByApplication, "authentication failed", "en")
                .await;
            return Err(OpenError::Auth {
                user: host.username.clone(),
            });
        }

        debug!(address = %host.address, user = %host.username, "ssh session authenticated");
        Ok(SshSession {
            handle,
            address: host.address.clone(),
        })
    }

    async fn execute(&self, session: &mut SshSession, command: &str) -> CommandResult {
        match exec(&mut session.handle, command).await {
            Ok((stdout, stderr, exit_status)) => {
                trace!(address = %session.address, command, ?exit_status, "channel closed");
                CommandResult::completed(
                    command,
                    String::from_utf8_lossy(&stdout),
                    String::from_utf8_lossy(&stderr),
                    exit_status,
                )
            }
            Err(e) => CommandResult::failed(command, CommandError::Transport(e.to_string())),
        }
    }

    async fn close(&self, session: SshSession) -> Result<(), CloseError> {
        session
            .handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| CloseError::Transport(e.to_string()))
    }
}

async fn exec(
    handle: &mut Handle<DeviceHandler>,
    command: &str,
) -> Result<(Vec<u8>, Vec<u8>, Option<u32>), russh::Error> {
    let mut channel = handle.channel_open_session().await?;
    channel.exec(true, command).await?;

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut exit_status = None;

    while let Some(msg) = channel.wait().await {
        match msg {
            ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
            ChannelMsg::ExtendedData { ref data, ext } if ext == STDERR_EXT => {
                stderr.extend_from_slice(data)
            }
            ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
            _ => {}
        }
    }

    Ok((stdout, stderr, exit_status))
}

//! Session lifecycle.
//!
//! Opening and closing are independent per host: one host failing to connect
//! has no effect on any other host's session. Every session that opens gets
//! exactly one close attempt, and close is never cut short by cancellation.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dispatchr_common::{
    config::DispatchOptions,
    error::{CloseError, OpenError},
    inventory::HostSpec,
    result::CommandResult,
};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// The remote shell protocol.
///
/// Implementations never see more than one caller per session: a session is
/// owned by the host-task that opened it until it is handed back to `close`.
#[async_trait]
pub trait SessionTransport: Send + Sync + 'static {
    type Session: Send + 'static;

    async fn open(&self, host: &HostSpec) -> Result<Self::Session, OpenError>;

    /// Runs one command. Failures are reported inside the returned result.
    async fn execute(&self, session: &mut Self::Session, command: &str) -> CommandResult;

    async fn close(&self, session: Self::Session) -> Result<(), CloseError>;
}

/// Opens and closes sessions with the run's timeouts and cancellation applied.
pub struct SessionLifecycle<T: SessionTransport> {
    transport: Arc<T>,
    connect_timeout: Duration,
    close_timeout: Duration,
    shutdown: CancellationToken,
}

impl<T: SessionTransport> Clone for SessionLifecycle<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            connect_timeout: self.connect_timeout,
            close_timeout: self.close_timeout,
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<T: SessionTransport> SessionLifecycle<T> {
    pub fn new(transport: Arc<T>, options: &DispatchOptions, shutdown: CancellationToken) -> Self {
        Self {
            transport,
            connect_timeout: options.connect_timeout,
            close_timeout: options.close_timeout,
            shutdown,
        }
    }

    /// Opens a session, bounded by the connect timeout.
    ///
    /// Cancellation only wins while the transport has not produced a session
    /// yet, so an opened session is never dropped on the floor here.
    pub async fn open(&self, name: &str, host: &HostSpec) -> Result<T::Session, OpenError> {
        debug!(host = %name, address = %host.address, port = host.port, "opening session");

        let opened = tokio::select! {
            biased;
            res = timeout(self.connect_timeout, self.transport.open(host)) => match res {
                Ok(opened) => opened,
                Err(_elapsed) => Err(OpenError::Timeout(self.connect_timeout)),
            },
            _ = self.shutdown.cancelled() => Err(OpenError::Cancelled),
        };

        match &opened {
            Ok(_) => debug!(host = %name, "session opened"),
            Err(OpenError::Cancelled) => debug!(host = %name, "open abandoned, run cancelled"),
            Err(e) => error!(host = %name, error = %e, "failed to open session"),
        }
        opened
    }

    /// Closes a session, bounded by the close timeout only.
    pub async fn close(&self, name: &str, session: T::Session) -> Result<(), CloseError> {
        let closed = match timeout(self.close_timeout, self.transport.close(session)).await {
            Ok(closed) => closed,
            Err(_elapsed) => Err(CloseError::Timeout(self.close_timeout)),
        };

        match &closed {
            Ok(()) => debug!(host = %name, "session closed"),
            Err(e) => warn!(host = %name, error = %e, "failed to close session"),
        }
        closed
    }

    /// Opens every given host concurrently.
    ///
    /// Each entry succeeds or fails on its own; the caller owns the opened
    /// sessions and must hand them to [`close_all`](Self::close_all).
    pub async fn open_all<'a, I>(&self, hosts: I) -> BTreeMap<String, Result<T::Session, OpenError>>
    where
        I: IntoIterator<Item = (&'a String, &'a HostSpec)>,
    {
        let mut set = JoinSet::new();
        for (name, host) in hosts {
            let lifecycle = self.clone();
            let name = name.clone();
            let host = host.clone();
            set.spawn(async move {
                let opened = lifecycle.open(&name, &host).await;
                (name, opened)
            });
        }

        let mut sessions = BTreeMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((name, opened)) => {
                    sessions.insert(name, opened);
                }
                Err(e) => error!(error = %e, "open task failed"),
            }
        }
        sessions
    }

    /// Closes every given session concurrently, one attempt each.
    pub async fn close_all<I>(&self, sessions: I) -> BTreeMap<String, Result<(), CloseError>>
    where
        I: IntoIterator<Item = (String, T::Session)>,
    {
        let mut set = JoinSet::new();
        for (name, session) in sessions {
            let lifecycle = self.clone();
            set.spawn(async move {
                let closed = lifecycle.close(&name, session).await;
                (name, closed)
            });
        }

        let mut results = BTreeMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((name, closed)) => {
                    results.insert(name, closed);
                }
                Err(e) => error!(error = %e, "close task failed"),
            }
        }
        results
    }
}

//! Concrete transports.

pub mod ssh;

pub use ssh::{SshSession, SshTransport};

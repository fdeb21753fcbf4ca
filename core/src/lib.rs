//! # Dispatch Engine
//!
//! Turns an inventory into per-host command plans and runs them.
//!
//! * **[`resolver`]**: merges platform defaults and host commands. Pure.
//! * **[`session`]**: the [`SessionTransport`](session::SessionTransport)
//!   abstraction and the open/close discipline around it.
//! * **[`executor`]**: runs one host's commands in order on one session.
//! * **[`dispatch`]**: one task per host, joined into a [`RunSummary`](summary::RunSummary).
//! * **[`network`]**: the SSH transport.
//!
//! High-level callers should depend on the `SessionTransport` trait rather
//! than on a concrete transport, the same way tests swap in an in-memory one.

pub mod dispatch;
pub mod executor;
pub mod network;
pub mod resolver;
pub mod session;
pub mod sink;
pub mod summary;

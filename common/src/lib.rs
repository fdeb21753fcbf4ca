//! Shared model for `dispatchr`.
//!
//! Everything the core engine and the CLI agree on lives here: the inventory
//! snapshot and its loader, the per-command result, the error taxonomy and the
//! run configuration.

pub mod config;
pub mod error;
pub mod inventory;
pub mod logging;
pub mod result;

#[doc(hidden)]
pub use tracing;

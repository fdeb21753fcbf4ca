//! Status-line macros.
//!
//! Thin wrappers around `tracing` that tag the event with a `status` field.
//! The CLI formatter turns that field into the leading symbol of the line.

/// Field value marking an event as a positive outcome.
pub const STATUS_SUCCESS: &str = "success";

/// Target used for pre-rendered terminal output.
///
/// Events on this target carry a `raw_msg` field which is printed verbatim.
pub const PRINT_TARGET: &str = "dispatchr::print";

#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::tracing::info!(status = $crate::logging::STATUS_SUCCESS, $($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::tracing::warn!($($arg)*)
    };
}

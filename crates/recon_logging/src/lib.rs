#![deny(missing_docs)]
//! Shared logging utilities for the recon workspace.
//!
//! This crate provides the `recon_*` logging macros used across the codebase,
//! the active page-visit context that prefixes log lines, and a minimal test
//! initializer for the global logger.

use std::cell::Cell;

#[doc(hidden)]
pub use log;

thread_local! {
    /// Thread-local storage for the page visit currently being processed.
    static CURRENT_VISIT: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Marks `visit_id` as the active page visit for the current thread.
///
/// The previous value is restored when the returned guard is dropped. The
/// crawl runs one visit at a time on a single thread, so nesting only happens
/// in tests.
pub fn enter_visit(visit_id: u64) -> VisitScope {
    let previous = CURRENT_VISIT.with(|v| v.replace(Some(visit_id)));
    VisitScope { previous }
}

/// Retrieves the active page visit for the current thread, if any.
pub fn current_visit() -> Option<u64> {
    CURRENT_VISIT.with(|v| v.get())
}

/// Guard returned by [`enter_visit`].
#[must_use = "the visit context ends when the guard is dropped"]
pub struct VisitScope {
    previous: Option<u64>,
}

impl Drop for VisitScope {
    fn drop(&mut self) {
        CURRENT_VISIT.with(|v| v.set(self.previous));
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __recon_log {
    ($level:expr, $($arg:tt)*) => {{
        match $crate::current_visit() {
            Some(visit) => {
                $crate::log::log!($level, "[visit {}] {}", visit, format_args!($($arg)*))
            }
            None => $crate::log::log!($level, $($arg)*),
        }
    }};
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! recon_trace {
    ($($arg:tt)*) => {{
        $crate::__recon_log!($crate::log::Level::Trace, $($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! recon_info {
    ($($arg:tt)*) => {{
        $crate::__recon_log!($crate::log::Level::Info, $($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! recon_debug {
    ($($arg:tt)*) => {{
        $crate::__recon_log!($crate::log::Level::Debug, $($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! recon_warn {
    ($($arg:tt)*) => {{
        $crate::__recon_log!($crate::log::Level::Warn, $($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! recon_error {
    ($($arg:tt)*) => {{
        $crate::__recon_log!($crate::log::Level::Error, $($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

//! Conditional logging macros that check a module-level `ENABLE_LOGS` flag.
//!
//! Usage:
//! ```ignore
//! // In your module, define the flag first:
//! const ENABLE_LOGS: bool = true;
//!
//! // Then use the macros (they're exported at the crate root):
//! use crate::{log_info, log_warn};
//!
//! log_info!("This will log if ENABLE_LOGS is true");
//! log_warn!(session = session.id(); "tagged with the session id");
//! ```
//!
//! The `session = <expr>;` prefix form renders as `[<session>] message`.

/// Macro for conditional debug logging.
/// Checks the `ENABLE_LOGS` const in the calling module.
#[macro_export]
macro_rules! log_debug {
    (session = $session:expr; $($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!("[{}] {}", $session, format_args!($($arg)*));
        }
    };
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// Macro for conditional info logging.
/// Checks the `ENABLE_LOGS` const in the calling module.
///
/// Each module that uses this macro must define:
/// ```ignore
/// const ENABLE_LOGS: bool = true; // or false
/// ```
#[macro_export]
macro_rules! log_info {
    (session = $session:expr; $($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!("[{}] {}", $session, format_args!($($arg)*));
        }
    };
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Macro for conditional warn logging.
/// Checks the `ENABLE_LOGS` const in the calling module.
#[macro_export]
macro_rules! log_warn {
    (session = $session:expr; $($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!("[{}] {}", $session, format_args!($($arg)*));
        }
    };
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Macro for conditional error logging.
/// Checks the `ENABLE_LOGS` const in the calling module.
#[macro_export]
macro_rules! log_error {
    (session = $session:expr; $($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!("[{}] {}", $session, format_args!($($arg)*));
        }
    };
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}

// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Process-wide logging for the drivegate crates
//!
//! Every crate in the workspace logs through the macros exported here so that
//! one switch controls the whole process.
//!
//! Usage:
//! - Set DRIVEGATE_LOG=off (default) - no logs
//! - Set DRIVEGATE_LOG=warn - retries, declaration mismatches, cleanup failures
//! - Set DRIVEGATE_LOG=info - gateway operations and session handshakes
//! - Set DRIVEGATE_LOG=debug - per-call backend translation details

use std::str::FromStr;
use std::sync::Once;

// Re-export emit so macros can use it
pub use emit;

/// Environment variable consulted by [`init_diagnostics`]
pub const LOG_ENV: &str = "DRIVEGATE_LOG";

static INIT: Once = Once::new();

/// Verbosity selected through `DRIVEGATE_LOG` or a config file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    fn min_level(self) -> Option<emit::Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(emit::Level::Error),
            LogLevel::Warn => Some(emit::Level::Warn),
            LogLevel::Info => Some(emit::Level::Info),
            LogLevel::Debug => Some(emit::Level::Debug),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "off" => Ok(LogLevel::Off),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "trace" => Ok(LogLevel::Debug),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Initialize diagnostics from the DRIVEGATE_LOG environment variable
///
/// Safe to call multiple times; only the first call (here or in
/// [`init_with_level`]) installs an emitter.
pub fn init_diagnostics() {
    let raw = std::env::var(LOG_ENV).unwrap_or_default();
    match raw.parse::<LogLevel>() {
        Ok(level) => init_with_level(level),
        Err(msg) => {
            init_with_level(LogLevel::Info);
            // The emitter is up now, so this reaches the terminal.
            emit::warn!("{reason}, falling back to info", reason: msg);
        }
    }
}

/// Initialize diagnostics at an explicit level
pub fn init_with_level(level: LogLevel) {
    INIT.call_once(|| {
        let Some(min) = level.min_level() else {
            return;
        };

        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(min))
            .init();

        // The runtime lives for the rest of the process.
        std::mem::forget(rt);
    });
}

/// Log basic operations (handshakes, created items, harness progress)
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log detailed diagnostics (backend calls, id translation)
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log recoverable conditions (retries, skipped scenarios)
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Log failures that surface to the caller
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

/// Short form of [`log_info!`]
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Short form of [`log_debug!`]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Short form of [`log_warn!`]
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Short form of [`log_error!`]
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

/// Re-export the init function for convenience
pub use init_diagnostics as init;

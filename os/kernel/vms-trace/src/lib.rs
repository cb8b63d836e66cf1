//! # Simulator Tracing
//!
//! Diagnostic output for the emulated machine, written to the host's stderr.
//!
//! ```text
//! log::info!/debug!/...        vms_trace!
//!        ↓                          ↓
//!   StderrLogger (filter)           │
//!        ↓                          ↓
//!   "[LEVEL] target: message"   raw text
//!        ↓                          ↓
//!                  stderr
//! ```
//!
//! ## Core Components
//!
//! ### Logger ([`StderrLogger`])
//! A `log::Log` implementation with a level threshold. The threshold can be
//! taken from an environment variable ([`StderrLogger::from_env`]), so the
//! demo driver honours `VMS_LOG=debug` and friends. Fatal conditions are
//! logged at `error` right before the process exits, so they are visible at
//! every threshold except `off`.
//!
//! ### Trace Macro ([`vms_trace!`])
//! Unfiltered output that bypasses the `log` facade, for text that must
//! always reach the terminal (scenario banners, summaries).
//!
//! ## `enabled` Feature (default)
//! Without it, [`vms_trace!`] compiles to nothing. The logger is unaffected.
//!
//! ## Usage
//! ```rust,no_run
//! use log::{LevelFilter, info};
//! use vms_trace::{StderrLogger, vms_trace};
//!
//! StderrLogger::from_env("VMS_LOG", LevelFilter::Info)
//!     .init()
//!     .expect("logger initialization");
//!
//! info!("machine ready");
//! vms_trace!("frames in use: {}\n", 4);
//! ```

#![deny(unsafe_code)]

mod logger;

pub use logger::StderrLogger;

#[cfg(feature = "enabled")]
#[doc(hidden)]
pub mod stderr_fmt {
    use std::fmt;
    use std::io::Write;

    #[doc(hidden)]
    #[inline]
    pub fn stderr_write(args: fmt::Arguments) {
        // best effort: a closed stderr must not take the simulator down
        let _ = std::io::stderr().lock().write_fmt(args);
    }
}

#[cfg(not(feature = "enabled"))]
#[doc(hidden)]
pub mod stderr_fmt {
    use std::fmt;

    #[doc(hidden)]
    #[inline]
    pub const fn stderr_write(_: fmt::Arguments) {}
}

/// Write `format!`-style text straight to stderr, bypassing the log filter.
#[macro_export]
macro_rules! vms_trace {
    ($($arg:tt)*) => {{
        $crate::stderr_fmt::stderr_write(::core::format_args!($($arg)*));
    }};
}

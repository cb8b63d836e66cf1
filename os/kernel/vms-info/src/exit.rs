//! # Process Exit Conditions
//!
//! The simulator has no recoverable error path for a failed translation or an
//! exhausted pool: like a hardware double fault, the process ends. Every such
//! exit goes through [`terminate`], which logs the reason first.

use core::fmt;
use vms_trace::vms_trace;

/// `EFAULT`: a translation faulted twice at the same level.
pub const BAD_ADDRESS: i32 = 14;

/// `ENOMEM`: the frame pool is exhausted, or a fork would not fit.
pub const OUT_OF_MEMORY: i32 = 12;

/// `EX_OSERR`: the backing region for the frame pool could not be reserved.
pub const INIT_FAILURE: i32 = 71;

/// A condition that ends the process with a specific exit code.
pub trait ExitCondition: fmt::Display {
    /// The process exit code reported for this condition.
    fn exit_code(&self) -> i32;

    /// Log the condition and end the process.
    fn terminate(self) -> !
    where
        Self: Sized,
    {
        terminate(self.exit_code(), &self)
    }
}

/// Report `reason` and exit the process with `code`.
///
/// The reason is logged at error level and also written straight to stderr,
/// so it is visible without an installed logger or with logging turned off.
pub fn terminate(code: i32, reason: &dyn fmt::Display) -> ! {
    log::error!("{reason}");
    log::logger().flush();
    vms_trace!("{reason}\n");
    std::process::exit(code)
}

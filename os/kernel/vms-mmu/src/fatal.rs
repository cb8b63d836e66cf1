use core::fmt;
use vms_addresses::{FrameNumber, Level, VirtualAddress};
use vms_alloc::FrameAllocError;
use vms_info::exit::{self, ExitCondition};

use crate::PageTableEntry;

/// Everything that ends the simulated machine.
///
/// Internal steps propagate this with `?`; the public surface of
/// [`Vms`](crate::Vms) hands it to [`ExitCondition::terminate`].
#[derive(Debug, thiserror::Error)]
pub enum Fatal {
    /// A translation faulted twice at the same level.
    #[error("{0}")]
    BadAddress(FatalPageFault),

    /// The frame pool could not supply a frame.
    #[error(transparent)]
    Alloc(#[from] FrameAllocError),

    /// A fork was requested while more than half of the pool is in use.
    #[error("cannot fork: {used} of {capacity} frames in use, a copy needs at most half")]
    ForkCapacity { used: usize, capacity: usize },
}

impl ExitCondition for Fatal {
    fn exit_code(&self) -> i32 {
        match self {
            Self::BadAddress(_) => exit::BAD_ADDRESS,
            Self::Alloc(e) => e.exit_code(),
            Self::ForkCapacity { .. } => exit::OUT_OF_MEMORY,
        }
    }
}

/// Diagnostic snapshot of an unrecoverable page fault.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FatalPageFault {
    pub address: VirtualAddress,
    pub table: FrameNumber,
    pub level: Level,
    pub entry: PageTableEntry,
}

impl Fatal {
    pub(crate) const fn bad_address(
        address: VirtualAddress,
        table: FrameNumber,
        level: Level,
        entry: PageTableEntry,
    ) -> Self {
        Self::BadAddress(FatalPageFault {
            address,
            table,
            level,
            entry,
        })
    }
}

impl fmt::Display for FatalPageFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fatal page fault!")?;
        writeln!(f, "  Virtual address: {}", self.address)?;
        writeln!(f, "  Page table: {}", self.table.base())?;
        writeln!(f, "  Level: {}", self.level)?;
        writeln!(f, "  PTE:")?;
        writeln!(f, "    PPN: {}", self.entry.ppn())?;
        write!(f, "    Flags: {}", self.entry.flags())
    }
}

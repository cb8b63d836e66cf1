use bitfield_struct::bitfield;
use core::fmt;
use vms_addresses::{FrameNumber, Level};
use vms_info::memory::PPN_MAX;

/// A single 64-bit page-table entry.
///
/// The same layout is used at every level; what the bits mean depends on the
/// level the entry is found at.
///
/// ### Bit layout
///
/// | Bits   | Name             | Meaning |
/// |--------|------------------|---------|
/// | 0      | `valid`          | Entry is in use |
/// | 1      | `read`           | Leaf may be read |
/// | 2      | `write`          | Leaf may be written |
/// | 3–7    | reserved         | Always zero |
/// | 8      | `deferred_write` | Leaf is writable once its copy-on-write is resolved |
/// | 9–19   | reserved         | Always zero |
/// | 20–63  | `ppn`            | Frame number of the next table or the data frame |
///
/// ### Notes
/// - Interior entries (levels 2 and 1) route only: `read` and `write` must be
///   clear, or the translator faults.
/// - A valid leaf (level 0) needs at least one of `read`/`write`, otherwise it
///   is an incomplete leaf and the translator faults.
/// - The PPN is a frame number, never an address.
///
/// ### Example
/// ```rust
/// # use vms_addresses::{FrameNumber, Level};
/// # use vms_mmu::PageTableEntry;
/// let e = PageTableEntry::leaf(FrameNumber::new(3), true, false);
/// assert!(e.valid() && e.read() && !e.write());
/// assert_eq!(e.ppn(), FrameNumber::new(3));
/// assert_eq!(e.into_bits(), (3 << 20) | 0b011);
/// ```
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct PageTableEntry {
    /// Valid (bit 0).
    pub valid: bool,

    /// Read permission (bit 1). Leaf only.
    pub read: bool,

    /// Write permission (bit 2). Leaf only.
    pub write: bool,

    #[bits(5)]
    __reserved_low: u8,

    /// Deferred write (bit 8).
    ///
    /// Set on both copies of a formerly writable leaf when an address space is
    /// forked copy-on-write. The fault handler turns it back into `write` once
    /// the leaf owns its frame.
    pub deferred_write: bool,

    #[bits(11)]
    __reserved_high: u16,

    /// Physical page number (bits 20..=63).
    #[bits(44)]
    ppn_bits: u64,
}

impl PageTableEntry {
    /// A valid interior entry routing to the table in `next`.
    #[inline]
    #[must_use]
    pub const fn interior(next: FrameNumber) -> Self {
        Self::new().with_valid(true).with_ppn(next)
    }

    /// A valid leaf entry mapping `frame` with the given permissions.
    #[inline]
    #[must_use]
    pub const fn leaf(frame: FrameNumber, read: bool, write: bool) -> Self {
        Self::new()
            .with_valid(true)
            .with_read(read)
            .with_write(write)
            .with_ppn(frame)
    }

    /// The frame this entry references.
    #[inline]
    #[must_use]
    pub const fn ppn(&self) -> FrameNumber {
        FrameNumber::new(self.ppn_bits())
    }

    /// Replace the frame number, leaving every flag untouched.
    ///
    /// # Panics
    /// If the frame number does not fit the 44-bit field.
    #[inline]
    pub const fn set_ppn(&mut self, frame: FrameNumber) {
        assert!(frame.as_u64() <= PPN_MAX, "PPN out of range");
        self.set_ppn_bits(frame.as_u64());
    }

    /// Builder form of [`set_ppn`](Self::set_ppn).
    #[inline]
    #[must_use]
    pub const fn with_ppn(mut self, frame: FrameNumber) -> Self {
        self.set_ppn(frame);
        self
    }

    /// `true` if the entry grants read or write.
    #[inline]
    #[must_use]
    pub const fn has_data_permission(&self) -> bool {
        self.read() || self.write()
    }

    /// `true` if the translator can use this entry at `level` without a fault:
    /// valid, and carrying read/write exactly when `level` is the leaf level.
    #[inline]
    #[must_use]
    pub const fn is_usable_at(&self, level: Level) -> bool {
        self.valid() && level.is_leaf() == self.has_data_permission()
    }

    /// Flags in diagnostic form: `C`, `W`, `R`, `V` in that order, `-` when unset.
    #[must_use]
    pub fn flags(&self) -> EntryFlags {
        EntryFlags(*self)
    }
}

/// Display adapter for the four flags of an entry (e.g. `"-WRV"`).
#[derive(Copy, Clone)]
pub struct EntryFlags(PageTableEntry);

impl fmt::Display for EntryFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = self.0;
        let pick = |set: bool, c: char| if set { c } else { '-' };
        write!(
            f,
            "{}{}{}{}",
            pick(e.deferred_write(), 'C'),
            pick(e.write(), 'W'),
            pick(e.read(), 'R'),
            pick(e.valid(), 'V'),
        )
    }
}

impl fmt::Display for PageTableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PPN: 0x{:X}, Flags: {}", self.ppn_bits(), self.flags())
    }
}

//! # Memory Layout

/// Size of one physical frame (and one virtual page) in bytes.
pub const PAGE_SIZE: usize = 4096;

/// Number of frames in the default physical pool (16 MiB).
pub const MAX_PAGES: usize = 1 << 12;

/// Number of 64-bit entries in one page table; a table fills exactly one frame.
pub const NUM_PTE_ENTRIES: usize = 512;

/// Width of one per-level index in a virtual address.
pub const INDEX_BITS: u32 = 9;

/// Width of the in-page offset in a virtual address.
pub const OFFSET_BITS: u32 = 12;

/// Number of translation levels (L2 root, L1, L0 leaf).
pub const MMU_LEVELS: u8 = 3;

/// Usable virtual address bits: three indices plus the offset.
pub const VIRTUAL_ADDRESS_BITS: u32 = INDEX_BITS * MMU_LEVELS as u32 + OFFSET_BITS;

/// Mask of the in-page offset (`0xFFF`).
pub const OFFSET_MASK: u64 = (1 << OFFSET_BITS) - 1;

/// Mask of one per-level index (`0x1FF`).
pub const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;

/// First bit of the physical page number inside a page-table entry.
pub const PPN_SHIFT: u32 = 20;

/// Width of the physical page number field (bits 20..=63).
pub const PPN_BITS: u32 = u64::BITS - PPN_SHIFT;

/// Largest physical page number an entry can hold.
pub const PPN_MAX: u64 = (1 << PPN_BITS) - 1;

const _: () = {
    assert!(PAGE_SIZE.is_power_of_two());
    assert!(PAGE_SIZE == 1 << OFFSET_BITS);
    assert!(NUM_PTE_ENTRIES == 1 << INDEX_BITS);
    assert!(NUM_PTE_ENTRIES * size_of::<u64>() == PAGE_SIZE);
    assert!(VIRTUAL_ADDRESS_BITS == 39);
    assert!(MAX_PAGES as u64 <= PPN_MAX);
};

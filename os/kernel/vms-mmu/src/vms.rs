use vms_addresses::{FrameNumber, Level, PhysicalAddress, VirtualAddress};
use vms_alloc::FramePool;
use vms_info::exit::ExitCondition;

use crate::mmu::{Access, FatalFaultHandler, FaultHandler, Mmu};
use crate::address_space::{self, AddressSpace, RootPage};
use crate::{PageTableEntry, PhysicalMemory};

/// One emulated machine: physical memory, the active root and a fault
/// handler.
///
/// Every operation borrows the whole machine mutably; separate instances are
/// fully isolated. Operations that hit a fatal condition end the process
/// (see [`Fatal`](crate::Fatal) for the exit codes).
///
/// ```rust
/// use vms_addresses::VirtualAddress;
/// use vms_mmu::{PageTableEntry, Vms};
///
/// let mut vms = Vms::<vms_mmu::FatalFaultHandler>::with_capacity(16);
/// let root = vms.alloc_frame();
/// let data = vms.alloc_frame();
/// let va = VirtualAddress::new(0xABC123);
///
/// vms.map_page(root, va, data, PageTableEntry::new().with_read(true).with_write(true));
/// vms.set_root(root);
/// vms.write(va, 1);
/// assert_eq!(vms.read(va), 1);
/// ```
pub struct Vms<H = FatalFaultHandler> {
    memory: PhysicalMemory,
    mmu: Mmu<H>,
}

impl<H: FaultHandler + Default> Vms<H> {
    /// A machine with the default pool of [`MAX_PAGES`](vms_info::memory::MAX_PAGES) frames.
    #[must_use]
    pub fn new() -> Self {
        Self::with_handler(FramePool::new(), H::default())
    }

    /// A machine with a pool of `capacity` frames.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_handler(FramePool::with_capacity(capacity), H::default())
    }
}

impl<H: FaultHandler + Default> Default for Vms<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: FaultHandler> Vms<H> {
    #[must_use]
    pub fn with_handler(frames: FramePool, handler: H) -> Self {
        Self {
            memory: PhysicalMemory::new(frames),
            mmu: Mmu::new(handler),
        }
    }

    #[inline]
    #[must_use]
    pub const fn memory(&self) -> &PhysicalMemory {
        &self.memory
    }

    #[inline]
    pub const fn memory_mut(&mut self) -> &mut PhysicalMemory {
        &mut self.memory
    }

    #[inline]
    #[must_use]
    pub const fn handler(&self) -> &H {
        self.mmu.handler()
    }

    /// Allocate a zeroed frame; ends the process if the pool is exhausted.
    #[must_use]
    pub fn alloc_frame(&mut self) -> FrameNumber {
        self.memory.alloc()
    }

    /// Zero and release a frame, resetting its reference count.
    ///
    /// # Panics
    /// If the frame is not allocated.
    pub fn free_frame(&mut self, frame: FrameNumber) {
        self.memory.free(frame);
    }

    #[inline]
    #[must_use]
    pub const fn used_frames(&self) -> usize {
        self.memory.frames().used_count()
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.memory.frames().capacity()
    }

    /// Make `root` the active address space.
    ///
    /// # Panics
    /// If `root` is not an allocated frame.
    pub fn set_root(&mut self, root: RootPage) {
        assert!(
            self.memory.frames().is_allocated(root),
            "root table {root} is not allocated"
        );
        log::debug!("active root is now {root}");
        self.mmu.set_root(root);
    }

    #[inline]
    #[must_use]
    pub const fn root(&self) -> Option<RootPage> {
        self.mmu.root()
    }

    /// Load the value at `va` in the active address space.
    ///
    /// Ends the process with a bad-address exit code if the translation
    /// faults twice at one level, or the leaf stays unreadable.
    ///
    /// # Panics
    /// If there is no active root.
    pub fn read(&mut self, va: VirtualAddress) -> i32 {
        let pa = self.translate(va, Access::Read);
        let value = self.memory.load(pa);
        log::trace!("read {value} from {va} ({pa})");
        value
    }

    /// Store `value` at `va` in the active address space.
    ///
    /// Ends the process with a bad-address exit code if the translation
    /// faults twice at one level, or the leaf stays unwritable.
    ///
    /// # Panics
    /// If there is no active root.
    pub fn write(&mut self, va: VirtualAddress, value: i32) {
        let pa = self.translate(va, Access::Write);
        self.memory.store(pa, value);
        log::trace!("wrote {value} to {va} ({pa})");
    }

    fn translate(&mut self, va: VirtualAddress, access: Access) -> PhysicalAddress {
        self.mmu
            .try_translate(&mut self.memory, va, access)
            .unwrap_or_else(|e| e.terminate())
    }

    /// Translate `va` in the active address space without faulting.
    ///
    /// # Panics
    /// If there is no active root.
    #[must_use]
    pub fn query(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        address_space::query(&self.memory, self.mmu.active_root(), va)
    }

    /// Map `va` to `frame` in the tree rooted at `root`; see
    /// [`AddressSpace::map_page`]. Ends the process if a table frame cannot
    /// be allocated.
    pub fn map_page(
        &mut self,
        root: RootPage,
        va: VirtualAddress,
        frame: FrameNumber,
        leaf_flags: PageTableEntry,
    ) {
        self.space(root)
            .map_page(va, frame, leaf_flags)
            .unwrap_or_else(|e| e.terminate());
    }

    /// Eagerly duplicate the active address space and return the new root,
    /// leaving the active root unchanged.
    ///
    /// Ends the process if more than half of the pool is already in use.
    ///
    /// # Panics
    /// If there is no active root.
    #[must_use]
    pub fn fork_copy(&mut self) -> RootPage {
        let root = self.mmu.active_root();
        self.space(root)
            .fork_copy()
            .unwrap_or_else(|e| e.terminate())
    }

    /// Duplicate the active address space copy-on-write and return the new
    /// root, leaving the active root unchanged.
    ///
    /// Only meaningful with a [`CopyOnWrite`](crate::CopyOnWrite) handler;
    /// with any other the first write to a shared page is fatal. Forking a
    /// tree that still shares frames adds the new tree to their counts.
    ///
    /// # Panics
    /// If there is no active root.
    #[must_use]
    pub fn fork_copy_on_write(&mut self) -> RootPage {
        let root = self.mmu.active_root();
        self.space(root)
            .fork_copy_on_write()
            .unwrap_or_else(|e| e.terminate())
    }

    /// Number of address-space leaves referencing `frame`.
    #[inline]
    #[must_use]
    pub fn ref_count(&self, frame: FrameNumber) -> u32 {
        self.memory.refs().get(frame)
    }

    /// The entry for `va` at `level` in `table`.
    #[must_use]
    pub fn entry(&self, table: FrameNumber, va: VirtualAddress, level: Level) -> PageTableEntry {
        self.memory.table(table).entry(va, level)
    }

    /// A handle to the tree rooted at `root`.
    pub fn space(&mut self, root: RootPage) -> AddressSpace<'_> {
        AddressSpace::from_root(&mut self.memory, root)
    }
}

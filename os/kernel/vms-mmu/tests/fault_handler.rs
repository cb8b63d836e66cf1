use vms_addresses::{Level, VirtualAddress};
use vms_alloc::FramePool;
use vms_mmu::{AddressSpace, FaultHandler, PageFault, PageTableEntry, PhysicalMemory, Vms};

/// Maps a fresh zeroed page on the first touch of an unmapped address.
#[derive(Default)]
struct DemandPaging {
    faults: usize,
}

impl FaultHandler for DemandPaging {
    fn page_fault(&mut self, memory: &mut PhysicalMemory, fault: PageFault) {
        self.faults += 1;
        if fault.level != Level::ROOT {
            return;
        }
        let root = fault.table;
        let frame = memory.alloc();
        AddressSpace::from_root(memory, root)
            .map_page(
                fault.address,
                frame,
                PageTableEntry::new().with_read(true).with_write(true),
            )
            .unwrap();
    }
}

#[test]
fn handler_may_build_a_mapping_on_demand() {
    let mut vms = Vms::with_handler(FramePool::with_capacity(8), DemandPaging::default());
    let root = vms.alloc_frame();
    vms.set_root(root);

    let va = VirtualAddress::new(0x1234_5678);
    assert_eq!(vms.query(va), None);

    vms.write(va, -17);
    assert_eq!(vms.read(va), -17);
    assert_eq!(vms.handler().faults, 1);
    assert_eq!(vms.used_frames(), 4);
    assert!(vms.query(va).is_some());
}

#[test]
fn stored_values_are_signed_32_bit() {
    let mut vms = Vms::with_handler(FramePool::with_capacity(8), DemandPaging::default());
    let root = vms.alloc_frame();
    vms.set_root(root);

    let base = VirtualAddress::new(0x7000);
    let next = VirtualAddress::new(0x7004);
    vms.write(base, i32::MIN);
    vms.write(next, i32::MAX);
    assert_eq!(vms.read(base), i32::MIN);
    assert_eq!(vms.read(next), i32::MAX);
}

#[test]
fn addresses_beyond_39_bits_alias() {
    let mut vms = Vms::with_handler(FramePool::with_capacity(8), DemandPaging::default());
    let root = vms.alloc_frame();
    vms.set_root(root);

    let low = VirtualAddress::new(0x42_0000);
    let high = VirtualAddress::new((1 << 39) | 0x42_0000);
    vms.write(low, 9);
    assert_eq!(vms.read(high), 9);
}

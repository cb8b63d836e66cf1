use log::LevelFilter;
use std::env;
use std::process::ExitCode;
use vms_addresses::{Level, PhysicalAddress, VirtualAddress};
use vms_alloc::FramePool;
use vms_mmu::{CopyOnWrite, FatalFaultHandler, FaultHandler, PageTableEntry, Vms};
use vms_trace::{StderrLogger, vms_trace};

const VA: VirtualAddress = VirtualAddress::new(0xABC123);

const USAGE: &str = "usage: vms-demo [copy | cow | fault-read | fault-leaf | fault-write | oom | fork-capacity]";

fn main() -> ExitCode {
    // args: [scenario]
    let scenario = env::args().nth(1).unwrap_or_else(|| "copy".to_owned());

    if StderrLogger::from_env("VMS_LOG", LevelFilter::Info).init().is_err() {
        vms_trace!("logger already installed\n");
    }

    match scenario.as_str() {
        "copy" => fork_copy(),
        "cow" => fork_copy_on_write(),
        "fault-read" => fault_read(),
        "fault-leaf" => fault_leaf(),
        "fault-write" => fault_write(),
        "oom" => exhaust_pool(),
        "fork-capacity" => fork_over_capacity(),
        _ => {
            vms_trace!("{USAGE}\n");
            return ExitCode::from(2);
        }
    }

    ExitCode::SUCCESS
}

fn read_write() -> PageTableEntry {
    PageTableEntry::new().with_read(true).with_write(true)
}

/// Map [`VA`] writable in a fresh root and activate it.
fn single_page<H: FaultHandler>(vms: &mut Vms<H>) -> vms_mmu::RootPage {
    let root = vms.alloc_frame();
    let data = vms.alloc_frame();
    vms.map_page(root, VA, data, read_write());
    vms.set_root(root);
    root
}

fn fork_copy() {
    let mut vms = Vms::<FatalFaultHandler>::new();
    let root = single_page(&mut vms);
    vms.write(VA, 1);

    let forked = vms.fork_copy();
    vms_trace!("frames in use after fork: {}\n", vms.used_frames());

    vms.set_root(forked);
    vms_trace!("forked reads {}\n", vms.read(VA));
    vms.write(VA, 2);
    vms_trace!("forked reads {} after write\n", vms.read(VA));

    vms.set_root(root);
    vms_trace!("original reads {}\n", vms.read(VA));
}

fn fork_copy_on_write() {
    let mut vms = Vms::<CopyOnWrite>::new();
    let root = single_page(&mut vms);
    vms.write(VA, 1);

    let forked = vms.fork_copy_on_write();
    let shared = vms.query(VA).map(PhysicalAddress::frame);
    vms_trace!("frames in use after fork: {}\n", vms.used_frames());

    vms.set_root(forked);
    vms.write(VA, 2);
    vms_trace!("forked reads {}\n", vms.read(VA));

    vms.set_root(root);
    vms_trace!("original reads {}\n", vms.read(VA));
    if let Some(frame) = shared {
        vms_trace!("shared frame {frame} now has {} reference(s)\n", vms.ref_count(frame));
    }
    vms_trace!("frames in use: {}\n", vms.used_frames());
}

fn fault_read() {
    let mut vms = Vms::<FatalFaultHandler>::new();
    let root = vms.alloc_frame();
    vms.set_root(root);
    // nothing is mapped: the root entry faults twice
    let value = vms.read(VA);
    vms_trace!("unreachable: read {value}\n");
}

fn fault_leaf() {
    let mut vms = Vms::<FatalFaultHandler>::new();
    let root = single_page(&mut vms);
    vms.write(VA, 1);

    // unmap the leaf, keeping both interior levels in place
    let l1 = vms.entry(root, VA, Level::ROOT).ppn();
    let l0 = vms.entry(l1, VA, Level::new(1)).ppn();
    vms.memory_mut()
        .table_mut(l0)
        .set_entry(VA, Level::LEAF, PageTableEntry::new());

    let value = vms.read(VA);
    vms_trace!("unreachable: read {value}\n");
}

fn fault_write() {
    let mut vms = Vms::<CopyOnWrite>::new();
    let root = vms.alloc_frame();
    let data = vms.alloc_frame();
    vms.map_page(root, VA, data, PageTableEntry::new().with_read(true));
    vms.set_root(root);
    // read-only without a deferred write: copy-on-write leaves it alone
    vms.write(VA, 1);
    vms_trace!("unreachable: wrote to a read-only page\n");
}

fn exhaust_pool() {
    let mut vms = Vms::<FatalFaultHandler>::with_handler(FramePool::with_capacity(4), FatalFaultHandler);
    loop {
        let frame = vms.alloc_frame();
        vms_trace!("allocated frame {frame}\n");
    }
}

fn fork_over_capacity() {
    let mut vms = Vms::<FatalFaultHandler>::with_capacity(6);
    let _ = single_page(&mut vms);
    // 4 of 6 frames in use
    let forked = vms.fork_copy();
    vms_trace!("unreachable: forked into {forked}\n");
}

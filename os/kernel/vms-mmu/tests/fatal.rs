//! Fatal conditions end the process, so each case runs this test binary again
//! as a child with `VMS_FATAL_CASE` set and inspects how the child exited.
//! No logger is ever installed here.

use std::env;
use std::process::{Command, Output};
use vms_addresses::VirtualAddress;
use vms_info::exit;
use vms_mmu::{FatalFaultHandler, Vms};

const CASE_VAR: &str = "VMS_FATAL_CASE";

/// Run `test_name` in a child process with `CASE_VAR` set.
fn run_as_child(test_name: &str) -> Output {
    Command::new(env::current_exe().expect("test binary path"))
        .args([test_name, "--exact", "--nocapture", "--test-threads=1"])
        .env(CASE_VAR, "1")
        .output()
        .expect("failed to rerun the test binary")
}

fn in_child() -> bool {
    env::var_os(CASE_VAR).is_some()
}

#[test]
fn fatal_fault_is_reported_without_a_logger() {
    if in_child() {
        let mut vms = Vms::<FatalFaultHandler>::with_capacity(4);
        let root = vms.alloc_frame();
        vms.set_root(root);
        let _ = vms.read(VirtualAddress::new(0xABC123));
        return;
    }

    let output = run_as_child("fatal_fault_is_reported_without_a_logger");
    let text = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(exit::BAD_ADDRESS), "{text}");
    assert!(text.contains("Fatal page fault!"), "{text}");
    assert!(text.contains("Virtual address: 0xABC123"), "{text}");
    assert!(text.contains("Level: 2"), "{text}");
}

#[test]
fn exhaustion_is_reported_without_a_logger() {
    if in_child() {
        let mut vms = Vms::<FatalFaultHandler>::with_capacity(1);
        let _ = vms.alloc_frame();
        let _ = vms.alloc_frame();
        return;
    }

    let output = run_as_child("exhaustion_is_reported_without_a_logger");
    let text = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(exit::OUT_OF_MEMORY), "{text}");
    assert!(text.contains("out of memory"), "{text}");
}

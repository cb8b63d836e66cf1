use std::process::{Command, Output};
use vms_info::exit;

fn run(scenario: &str) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vms-demo"))
        .arg(scenario)
        .env("VMS_LOG", "info")
        .output()
        .expect("failed to run vms-demo")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn eager_fork_keeps_the_original_value() {
    let output = run("copy");
    let text = stderr(&output);
    assert!(output.status.success(), "{text}");
    assert!(text.contains("frames in use after fork: 8"), "{text}");
    assert!(text.contains("forked reads 1\n"), "{text}");
    assert!(text.contains("forked reads 2 after write"), "{text}");
    assert!(text.contains("original reads 1"), "{text}");
}

#[test]
fn copy_on_write_splits_on_write() {
    let output = run("cow");
    let text = stderr(&output);
    assert!(output.status.success(), "{text}");
    assert!(text.contains("frames in use after fork: 7"), "{text}");
    assert!(text.contains("forked reads 2"), "{text}");
    assert!(text.contains("original reads 1"), "{text}");
    assert!(text.contains("now has 1 reference(s)"), "{text}");
    assert!(text.contains("frames in use: 8"), "{text}");
}

#[test]
fn unmapped_read_is_fatal() {
    let output = run("fault-read");
    let text = stderr(&output);
    assert_eq!(output.status.code(), Some(exit::BAD_ADDRESS), "{text}");
    assert!(text.contains("Fatal page fault!"), "{text}");
    assert!(text.contains("Virtual address: 0xABC123"), "{text}");
    assert!(text.contains("Level: 2"), "{text}");
    assert!(text.contains("Flags: ----"), "{text}");
    assert!(!text.contains("unreachable"), "{text}");
}

#[test]
fn fatal_fault_is_reported_with_logging_off() {
    let output = Command::new(env!("CARGO_BIN_EXE_vms-demo"))
        .arg("fault-read")
        .env("VMS_LOG", "off")
        .output()
        .expect("failed to run vms-demo");
    let text = stderr(&output);
    assert_eq!(output.status.code(), Some(exit::BAD_ADDRESS), "{text}");
    assert!(text.contains("Fatal page fault!"), "{text}");
    assert!(!text.contains("[ERROR]"), "{text}");
}

#[test]
fn invalid_leaf_under_a_complete_chain_is_fatal() {
    let output = run("fault-leaf");
    let text = stderr(&output);
    assert_eq!(output.status.code(), Some(exit::BAD_ADDRESS), "{text}");
    assert!(text.contains("Fatal page fault!"), "{text}");
    assert!(text.contains("Virtual address: 0xABC123"), "{text}");
    assert!(text.contains("Level: 0"), "{text}");
    assert!(text.contains("Flags: ----"), "{text}");
    assert!(!text.contains("unreachable"), "{text}");
}

#[test]
fn write_to_read_only_page_is_fatal() {
    let output = run("fault-write");
    let text = stderr(&output);
    assert_eq!(output.status.code(), Some(exit::BAD_ADDRESS), "{text}");
    assert!(text.contains("Level: 0"), "{text}");
    assert!(text.contains("Flags: --RV"), "{text}");
    assert!(!text.contains("unreachable"), "{text}");
}

#[test]
fn pool_exhaustion_is_fatal() {
    let output = run("oom");
    let text = stderr(&output);
    assert_eq!(output.status.code(), Some(exit::OUT_OF_MEMORY), "{text}");
    assert_eq!(text.matches("allocated frame").count(), 4, "{text}");
    assert!(text.contains("out of memory"), "{text}");
}

#[test]
fn fork_needs_half_the_pool_free() {
    let output = run("fork-capacity");
    let text = stderr(&output);
    assert_eq!(output.status.code(), Some(exit::OUT_OF_MEMORY), "{text}");
    assert!(text.contains("cannot fork: 4 of 6 frames in use"), "{text}");
    assert!(!text.contains("unreachable"), "{text}");
}

#[test]
fn unknown_scenario_prints_usage() {
    let output = run("bogus");
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("usage: vms-demo"));
}

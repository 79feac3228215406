// Runs the shared_sync binary end to end: two forked children, the default
// named region, five messages paced at 100ms.
use serial_test::serial;
use std::path::Path;
use std::process::Command;

#[test]
#[serial]
fn test_shared_sync_binary() {
    let output = Command::new(env!("CARGO_BIN_EXE_shared_sync"))
        .env("RUST_LOG", "info")
        .output()
        .expect("failed to run shared_sync");

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !output.status.success() {
        eprintln!("stdout:\n{}", stdout);
        eprintln!("stderr:\n{}", String::from_utf8_lossy(&output.stderr));
        panic!("shared_sync failed with {}", output.status);
    }

    let lines: Vec<&str> = stdout.lines().collect();
    let position = |needle: &str| {
        lines
            .iter()
            .position(|line| line.contains(needle))
            .unwrap_or_else(|| panic!("missing line {:?} in:\n{}", needle, stdout))
    };

    // strict alternation: wrote k < read k < wrote k+1
    let mut last = None;
    for i in 1..=5 {
        let id = 100 + i;
        let payload = format!("'Message from writer, iteration {}'", i);
        let wrote = position(&format!("writer: wrote message {}: {}", id, payload));
        let read = position(&format!("reader: read message {}: {}", id, payload));
        assert!(wrote < read, "message {} read before it was written", id);
        if let Some(prev) = last {
            assert!(prev < wrote, "message {} written before {} was read", id, id - 1);
        }
        last = Some(read);
    }

    assert_eq!(lines.iter().filter(|l| l.contains("wrote message")).count(), 5);
    assert_eq!(lines.iter().filter(|l| l.contains("read message")).count(), 5);
    position("writer: finished writing 5 messages");
    position("reader: finished reading 5 messages");
    position("initiator: cleaned up shared memory /shm_handoff");

    assert!(!Path::new("/dev/shm/shm_handoff").exists());
}

// Process mode run from inside the test binary. Kept in its own test target
// and serialized so no other test thread is busy while fork() runs.
use serial_test::serial;
use shm_handoff::Core::{HandoffError, SpinStrategy};
use shm_handoff::Handoff::{ExecutionMode, HandoffBuilder};
use shm_handoff::Structs::{Role, RoleState};
use std::time::Duration;

#[test]
#[serial]
fn test_forked_roles_hand_off_through_anonymous_region() {
    let report = HandoffBuilder::new()
        .with_mode(ExecutionMode::Processes)
        .anonymous_region()
        .with_messages(25)
        .with_pacing(Duration::from_millis(1))
        .with_spin(SpinStrategy::Backoff {
            timeout: Duration::from_secs(10),
        })
        .build()
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(report.writer.state, RoleState::Completed);
    assert_eq!(report.reader.state, RoleState::Completed);
    assert_eq!(report.writer.cycles, 25);
    assert!(report.transcripts_match());
}

#[test]
#[serial]
fn test_child_exiting_non_zero_is_reported() {
    // one poll per wait cannot keep up for a thousand cycles, so at least
    // one child gives up and exits with status 1
    let res = HandoffBuilder::new()
        .with_mode(ExecutionMode::Processes)
        .anonymous_region()
        .with_messages(1000)
        .with_pacing(Duration::ZERO)
        .with_spin(SpinStrategy::Bounded { max_polls: 1 })
        .build()
        .unwrap()
        .run();

    match res {
        Err(HandoffError::RoleFailed { role, status }) => {
            assert!(matches!(role, Role::Writer | Role::Reader));
            assert_eq!(status, "exit status 1");
        }
        other => panic!("expected a failed child, got {:?}", other),
    }
}

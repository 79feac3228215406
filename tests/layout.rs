// Layout conformance tests for the shared record.
// The slot must stay binary compatible with the C struct
// { int message_id; char text_message[256]; int ready; }
// so that a non-Rust peer can map the same region.
use memoffset::offset_of;
use shm_handoff::Slot::layout::{RegionLayout, RoleReport, SlotRecord, DIGEST_LEN, MAX_MSG_LEN};
use shm_handoff::Slot::HandoffRegion;
use std::mem::{align_of, size_of};

#[test]
fn test_slot_record_layout() {
    let size = size_of::<SlotRecord>();
    let align = align_of::<SlotRecord>();
    let off_sequence_id = offset_of!(SlotRecord, sequence_id);
    let off_payload = offset_of!(SlotRecord, payload);
    let off_flag = offset_of!(SlotRecord, ownership_flag);

    println!(
        "SlotRecord => size: {size}, align: {align}, offsets: [sequence_id:{off_sequence_id}, payload:{off_payload}, ownership_flag:{off_flag}]"
    );

    assert_eq!(size, 4 + MAX_MSG_LEN + 4);
    assert_eq!(align, 4);
    assert_eq!(off_sequence_id, 0);
    assert_eq!(off_payload, 4);
    assert_eq!(off_flag, 4 + MAX_MSG_LEN);
}

#[test]
fn test_role_report_layout() {
    assert_eq!(offset_of!(RoleReport, state), 0);
    assert_eq!(offset_of!(RoleReport, cycles), 4);
    assert_eq!(offset_of!(RoleReport, digest), 8);
    assert_eq!(size_of::<RoleReport>(), 8 + DIGEST_LEN);
}

#[test]
fn test_region_layout_keeps_slot_first() {
    assert_eq!(offset_of!(RegionLayout, slot), 0);
    assert_eq!(offset_of!(RegionLayout, reports), size_of::<SlotRecord>());
    assert_eq!(HandoffRegion::required_size(), size_of::<RegionLayout>());
    // the reference 1024-byte region has room to spare
    assert!(HandoffRegion::required_size() <= 1024);
}

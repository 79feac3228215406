use std::cell::UnsafeCell;
use std::sync::atomic::AtomicU32;

/// Capacity of the payload buffer, including the terminating NUL.
pub const MAX_MSG_LEN: usize = 256;

/// Size of a SHA-256 transcript digest.
pub const DIGEST_LEN: usize = 32;

/// Raw flag value: the writer may fill the slot.
pub const FLAG_EMPTY: u32 = 0;

/// Raw flag value: the reader may drain the slot.
pub const FLAG_FULL: u32 = 1;

/// The shared record, laid out exactly like the C struct
/// `{ int message_id; char text_message[256]; int ready; }`.
///
/// The record fields carry no synchronization of their own. Who may touch
/// them is decided by `ownership_flag` alone:
/// - `sequence_id` and `payload` are written only by the writer while the
///   flag is `FLAG_EMPTY`;
/// - they are read only by the reader while the flag is `FLAG_FULL`;
/// - the writer flips `EMPTY -> FULL` with a release store after filling
///   the record, the reader flips `FULL -> EMPTY` after draining it.
#[repr(C)]
pub struct SlotRecord {
    /// Identifier of the message currently in the slot.
    pub sequence_id: UnsafeCell<i32>,

    /// NUL-padded message text.
    pub payload: UnsafeCell<[u8; MAX_MSG_LEN]>,

    /// 0 = empty (writer's turn), 1 = full (reader's turn).
    pub ownership_flag: AtomicU32,
}

/// Completion record a role writes into the region right before it terminates.
///
/// `state` is stored last with release ordering; readers load it with
/// acquire ordering before looking at `cycles` and `digest`.
#[repr(C)]
pub struct RoleReport {
    pub state: AtomicU32,
    pub cycles: AtomicU32,
    pub digest: UnsafeCell<[u8; DIGEST_LEN]>,
}

/// Everything the handoff keeps in the shared region.
///
/// The slot sits at offset 0 so the record stays binary compatible with the
/// C layout; the role reports follow it in otherwise unused bytes.
#[repr(C)]
pub struct RegionLayout {
    pub slot: SlotRecord,
    pub reports: [RoleReport; 2],
}

// Access to the UnsafeCell fields is arbitrated by the atomics above.
unsafe impl Sync for SlotRecord {}
unsafe impl Sync for RoleReport {}

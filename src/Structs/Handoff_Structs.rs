// Value types exchanged through the slot and collected by the roles

use crate::Core::error::{HandoffError, Result};
use crate::Slot::layout::{DIGEST_LEN, MAX_MSG_LEN};
use sha2::{Digest, Sha256};
use std::fmt;

/// The two parties of the handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Writer,
    Reader,
}

impl Role {
    /// Index of this role's report entry in the region.
    pub(crate) fn report_index(self) -> usize {
        match self {
            Role::Writer => 0,
            Role::Reader => 1,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Writer => f.write_str("writer"),
            Role::Reader => f.write_str("reader"),
        }
    }
}

/// One message as it travels through the slot.
///
/// Payloads are validated on construction so that they always fit the
/// NUL-terminated buffer of the shared record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    sequence_id: i32,
    payload: String,
}

impl Message {
    pub fn new(sequence_id: i32, payload: impl Into<String>) -> Result<Self> {
        let payload = payload.into();
        // one byte stays reserved for the terminating NUL
        if payload.len() >= MAX_MSG_LEN {
            return Err(HandoffError::PayloadTooLarge {
                len: payload.len(),
                max: MAX_MSG_LEN - 1,
            });
        }
        if payload.as_bytes().contains(&0) {
            return Err(HandoffError::PayloadContainsNul);
        }
        Ok(Self {
            sequence_id,
            payload,
        })
    }

    /// Builds a message from bytes read out of the slot (already trimmed at the first NUL).
    pub(crate) fn from_slot(sequence_id: i32, payload: &[u8]) -> Self {
        Self {
            sequence_id,
            payload: String::from_utf8_lossy(payload).into_owned(),
        }
    }

    pub fn sequence_id(&self) -> i32 {
        self.sequence_id
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}

/// Ordered record of the messages one role handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    role: Role,
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            messages: Vec::new(),
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// SHA-256 over every (sequence id, payload) pair in order.
    ///
    /// Writer and reader transcripts of a correct session hash to the same value.
    pub fn digest(&self) -> [u8; DIGEST_LEN] {
        let mut hasher = Sha256::new();
        for message in &self.messages {
            hasher.update(message.sequence_id.to_le_bytes());
            hasher.update(message.payload.as_bytes());
            hasher.update([0u8]);
        }
        let mut out = [0u8; DIGEST_LEN];
        out.copy_from_slice(&hasher.finalize());
        out
    }
}

/// Lifecycle of a role as recorded in its report entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleState {
    Running,
    Completed,
    Failed,
}

impl RoleState {
    pub(crate) const RUNNING: u32 = 0;
    pub(crate) const COMPLETED: u32 = 1;
    pub(crate) const FAILED: u32 = 2;

    pub(crate) fn from_raw(raw: u32) -> Self {
        match raw {
            Self::COMPLETED => RoleState::Completed,
            Self::FAILED => RoleState::Failed,
            _ => RoleState::Running,
        }
    }
}

/// What a role left behind in the region when it terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSummary {
    pub role: Role,
    pub state: RoleState,
    pub cycles: u32,
    pub digest: [u8; DIGEST_LEN],
}

impl RoleSummary {
    /// Lower-case hex rendering of the transcript digest.
    pub fn digest_hex(&self) -> String {
        self.digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_payload_that_leaves_no_room_for_nul() {
        let err = Message::new(1, "x".repeat(MAX_MSG_LEN)).unwrap_err();
        assert!(matches!(
            err,
            HandoffError::PayloadTooLarge { len: 256, max: 255 }
        ));
        assert!(Message::new(1, "x".repeat(MAX_MSG_LEN - 1)).is_ok());
    }

    #[test]
    fn test_rejects_interior_nul() {
        assert!(matches!(
            Message::new(1, "a\0b"),
            Err(HandoffError::PayloadContainsNul)
        ));
    }

    #[test]
    fn test_digest_depends_on_order() {
        let a = Message::new(1, "one").unwrap();
        let b = Message::new(2, "two").unwrap();

        let mut forward = Transcript::new(Role::Writer);
        forward.push(a.clone());
        forward.push(b.clone());

        let mut backward = Transcript::new(Role::Reader);
        backward.push(b);
        backward.push(a);

        assert_ne!(forward.digest(), backward.digest());
    }

    #[test]
    fn test_digest_separates_adjacent_payloads() {
        let mut split = Transcript::new(Role::Writer);
        split.push(Message::new(1, "ab").unwrap());
        split.push(Message::new(2, "c").unwrap());

        let mut shifted = Transcript::new(Role::Reader);
        shifted.push(Message::new(1, "a").unwrap());
        shifted.push(Message::new(2, "bc").unwrap());

        assert_ne!(split.digest(), shifted.digest());
    }

    #[test]
    fn test_role_state_maps_unknown_values_to_running() {
        assert_eq!(RoleState::from_raw(1), RoleState::Completed);
        assert_eq!(RoleState::from_raw(2), RoleState::Failed);
        assert_eq!(RoleState::from_raw(7), RoleState::Running);
    }
}

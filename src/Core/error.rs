use crate::Slot::Ownership;
use crate::Structs::Role;
use std::io;

/// Result alias used across the handoff crate.
pub type Result<T> = std::result::Result<T, HandoffError>;

/// Everything that can stop a handoff session.
///
/// The shared memory layer reports plain `io::Error`s; the initiator wraps
/// them into [`HandoffError::Setup`] together with the operation that failed.
#[derive(Debug, thiserror::Error)]
pub enum HandoffError {
    /// The shared region could not be created, sized, mapped, validated or destroyed.
    #[error("failed to {op} shared region {region}: {source}")]
    Setup {
        op: &'static str,
        region: String,
        #[source]
        source: io::Error,
    },

    /// The execution unit for a role could not be created.
    #[error("failed to spawn {role}: {source}")]
    Spawn {
        role: Role,
        #[source]
        source: io::Error,
    },

    /// A bounded spin strategy gave up waiting for the peer.
    #[error("{role} gave up waiting for {awaited:?} in cycle {cycle} after {polls} polls")]
    PeerTimeout {
        role: Role,
        cycle: u32,
        awaited: Ownership,
        polls: u64,
    },

    #[error("payload of {len} bytes exceeds slot capacity of {max} bytes")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("payload contains an interior NUL byte")]
    PayloadContainsNul,

    #[error("the {0} end of the slot was already claimed")]
    RoleAlreadyClaimed(Role),

    /// A role running in a child process did not exit cleanly.
    #[error("{role} exited abnormally: {status}")]
    RoleFailed { role: Role, status: String },

    #[error("{0} thread panicked")]
    RolePanicked(Role),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl HandoffError {
    pub(crate) fn setup(op: &'static str, region: &str, source: io::Error) -> Self {
        Self::Setup {
            op,
            region: region.to_owned(),
            source,
        }
    }
}

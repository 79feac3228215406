// Module naming follows project convention (Core = platform plumbing, Slot = shared record)
#[allow(non_snake_case)]
pub mod Core {
    pub mod SharedMemory;
    pub mod error;
    pub mod spin;
    pub use error::{HandoffError, Result};
    pub use spin::{SpinExhausted, SpinStrategy, SpinWait};
    pub use SharedMemory::{
        create_shared_memory, unlink_shared_memory, RawHandle, SharedMemoryBackend,
    };
}
#[allow(non_snake_case)]
pub mod Slot {
    pub mod layout;
    #[allow(clippy::module_inception)]
    pub mod Slot;
    pub mod Slot_impl;
    pub use Slot::{HandoffRegion, Ownership, ReaderEnd, WriterEnd}; // re-export for stable path
    pub use Slot_impl::{ReadTurn, WriteTurn};
}
#[allow(non_snake_case)]
pub mod Structs {
    pub mod Handoff_Structs;
    pub use Handoff_Structs::{Message, Role, RoleState, RoleSummary, Transcript}; // re-export for stable path
}
#[allow(non_snake_case)]
pub mod Handoff {
    mod builder;
    mod initiator;
    mod reader;
    mod writer;

    pub use builder::{ExecutionMode, HandoffBuilder, HandoffConfig, RolePlan};
    pub use initiator::{HandoffReport, Initiator};
    pub use reader::Reader;
    pub use writer::Writer;
}
#[allow(non_snake_case)]
mod Debug {
    pub mod StructDebug;
}

use crate::Core::SharedMemory::SharedMemoryBackend as _;
use crate::Slot::{HandoffRegion, ReaderEnd, WriterEnd};
use std::fmt;

// Debug proxy implementations that call the standalone debug functions
impl fmt::Debug for HandoffRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_handoff_region(self, f)
    }
}

impl fmt::Debug for WriterEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_end("WriterEnd", self.region(), f)
    }
}

impl fmt::Debug for ReaderEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_end("ReaderEnd", self.region(), f)
    }
}

/// Debug function for HandoffRegion
///
/// Shows where the layout is mapped and the current flag value without
/// touching the unsynchronized record fields.
pub fn debug_handoff_region(region: &HandoffRegion, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("HandoffRegion")
        .field("label", &region.label())
        .field("size", &region.size())
        .field("handle", &region.shm.raw_handle())
        .field("layout", &format_args!("{:p}", region.layout.as_ptr()))
        .field("ownership_flag", &region.raw_flag())
        .finish()
}

/// Debug function for the slot ends
pub fn debug_end(name: &str, region: &HandoffRegion, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct(name)
        .field("region", &region.label())
        .finish_non_exhaustive()
}

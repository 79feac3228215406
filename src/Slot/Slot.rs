// The single shared slot and the region that holds it

use super::layout::{RegionLayout, RoleReport, SlotRecord, DIGEST_LEN, FLAG_EMPTY, FLAG_FULL};
use crate::Core::error::{HandoffError, Result};
use crate::Core::SharedMemory::{create_shared_memory, unlink_shared_memory, SharedMemoryBackend};
use crate::Structs::{Role, RoleState, RoleSummary, Transcript};

use std::io;
use std::mem::{align_of, size_of};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Value of the ownership flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The writer may fill the slot.
    Empty,
    /// The reader may drain the slot.
    Full,
}

impl Ownership {
    pub const fn raw(self) -> u32 {
        match self {
            Ownership::Empty => FLAG_EMPTY,
            Ownership::Full => FLAG_FULL,
        }
    }

    /// `None` for values the protocol never writes.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            FLAG_EMPTY => Some(Ownership::Empty),
            FLAG_FULL => Some(Ownership::Full),
            _ => None,
        }
    }
}

/// A mapped shared region holding one [`SlotRecord`] and the role reports.
///
/// The region is created and reset by the initiator, then shared through an
/// `Arc` with exactly one [`WriterEnd`] and one [`ReaderEnd`]. It is torn down
/// with [`HandoffRegion::destroy`] once both ends are gone.
pub struct HandoffRegion {
    pub(crate) shm: Box<dyn SharedMemoryBackend>,
    pub(crate) layout: NonNull<RegionLayout>,
    pub(crate) label: String,
    writer_claimed: AtomicBool,
    reader_claimed: AtomicBool,
}

// The layout pointer targets the mapping owned by `shm`; access to the
// record is arbitrated by the ownership flag.
unsafe impl Send for HandoffRegion {}
unsafe impl Sync for HandoffRegion {}

impl HandoffRegion {
    /// Minimum number of bytes a region needs to hold the layout.
    pub const fn required_size() -> usize {
        size_of::<RegionLayout>()
    }

    /// Create (or open) the region, check it can hold the layout and reset the
    /// slot to `Empty`.
    ///
    /// `name` selects a POSIX named region; `None` maps anonymous shared
    /// memory, which is still shared with children created by `fork()`.
    pub fn create(size: usize, name: Option<&str>) -> Result<Self> {
        let label = name.unwrap_or("<anonymous>");
        let required = Self::required_size();

        if size < required {
            return Err(HandoffError::setup(
                "size",
                label,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "region of {} bytes cannot hold the {}-byte layout",
                        size, required
                    ),
                ),
            ));
        }

        let shm = create_shared_memory(size, name)
            .map_err(|e| HandoffError::setup("create", label, e))?;

        let layout_ptr = shm.as_ptr() as *mut RegionLayout;
        if (layout_ptr as usize) % align_of::<RegionLayout>() != 0 {
            return Err(HandoffError::setup(
                "validate",
                label,
                io::Error::new(io::ErrorKind::InvalidData, "Shared memory not properly aligned"),
            ));
        }
        let layout = NonNull::new(layout_ptr).ok_or_else(|| {
            HandoffError::setup(
                "map",
                label,
                io::Error::new(io::ErrorKind::Other, "null mapping"),
            )
        })?;

        let mut region = Self {
            shm,
            layout,
            label: label.to_owned(),
            writer_claimed: AtomicBool::new(false),
            reader_claimed: AtomicBool::new(false),
        };
        region.reset();
        Ok(region)
    }

    /// Zero the record and the reports and hand the slot to the writer.
    ///
    /// Taking `&mut self` guarantees no end is alive while this runs.
    pub fn reset(&mut self) {
        unsafe {
            ptr::write_bytes(self.layout.as_ptr() as *mut u8, 0, size_of::<RegionLayout>());
        }
        self.slot()
            .ownership_flag
            .store(Ownership::Empty.raw(), Ordering::Release);
    }

    /// Name of the region, `<anonymous>` for anonymous mappings.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn name(&self) -> Option<&str> {
        self.shm.name()
    }

    pub fn size(&self) -> usize {
        self.shm.size()
    }

    /// Raw value of the ownership flag, acquire load.
    pub fn raw_flag(&self) -> u32 {
        self.slot().ownership_flag.load(Ordering::Acquire)
    }

    /// Current owner of the slot, or `None` if the flag holds a value the
    /// protocol never writes. Nothing in the protocol validates the flag; this
    /// is for observation only.
    pub fn ownership(&self) -> Option<Ownership> {
        Ownership::from_raw(self.raw_flag())
    }

    /// Claim the writer end. Fails if it was already handed out.
    pub fn writer(self: &Arc<Self>) -> Result<WriterEnd> {
        self.claim(&self.writer_claimed, Role::Writer)?;
        Ok(WriterEnd {
            region: Arc::clone(self),
        })
    }

    /// Claim the reader end. Fails if it was already handed out.
    pub fn reader(self: &Arc<Self>) -> Result<ReaderEnd> {
        self.claim(&self.reader_claimed, Role::Reader)?;
        Ok(ReaderEnd {
            region: Arc::clone(self),
        })
    }

    fn claim(&self, claimed: &AtomicBool, role: Role) -> Result<()> {
        if claimed.swap(true, Ordering::AcqRel) {
            return Err(HandoffError::RoleAlreadyClaimed(role));
        }
        Ok(())
    }

    /// Read what `role` reported before terminating.
    pub fn summary(&self, role: Role) -> RoleSummary {
        let report = self.report(role);
        let state = RoleState::from_raw(report.state.load(Ordering::Acquire));
        let cycles = report.cycles.load(Ordering::Relaxed);
        // the digest is only stable once the role has published a final state
        let digest = match state {
            RoleState::Running => [0u8; DIGEST_LEN],
            _ => unsafe { *report.digest.get() },
        };
        RoleSummary {
            role,
            state,
            cycles,
            digest,
        }
    }

    /// Unmap the region and, for named regions, remove the name.
    pub fn destroy(self) -> Result<()> {
        let name = self.shm.name().map(str::to_owned);
        drop(self);
        if let Some(name) = name {
            unlink_shared_memory(&name).map_err(|e| HandoffError::setup("destroy", &name, e))?;
        }
        Ok(())
    }

    pub(crate) fn slot(&self) -> &SlotRecord {
        unsafe { &self.layout.as_ref().slot }
    }

    pub(crate) fn report(&self, role: Role) -> &RoleReport {
        unsafe { &self.layout.as_ref().reports[role.report_index()] }
    }

    /// Store a role's final report. Only the end owning `role` calls this.
    pub(crate) fn record_report(&self, role: Role, state: RoleState, transcript: &Transcript) {
        let report = self.report(role);
        let digest: [u8; DIGEST_LEN] = transcript.digest();
        unsafe {
            *report.digest.get() = digest;
        }
        report.cycles.store(transcript.len() as u32, Ordering::Relaxed);
        let raw = match state {
            RoleState::Running => RoleState::RUNNING,
            RoleState::Completed => RoleState::COMPLETED,
            RoleState::Failed => RoleState::FAILED,
        };
        report.state.store(raw, Ordering::Release);
    }
}

/// Exclusive writer handle on the slot.
pub struct WriterEnd {
    pub(crate) region: Arc<HandoffRegion>,
}

/// Exclusive reader handle on the slot.
pub struct ReaderEnd {
    pub(crate) region: Arc<HandoffRegion>,
}

// Sets up the region, runs both roles concurrently and tears everything down

use super::{ExecutionMode, HandoffConfig, Reader, Writer};
use crate::Core::error::{HandoffError, Result};
use crate::Core::SharedMemory::SharedMemoryBackend as _;
use crate::Slot::HandoffRegion;
use crate::Structs::{Role, RoleState, RoleSummary};
use log::{error, info, warn};
use std::io::{self, Write as _};
use std::sync::Arc;
use std::thread;

/// What both roles left in the region, read after they were joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffReport {
    pub writer: RoleSummary,
    pub reader: RoleSummary,
}

impl HandoffReport {
    /// Both roles completed the same number of cycles and saw the same
    /// sequence of (id, payload) pairs.
    pub fn transcripts_match(&self) -> bool {
        self.writer.state == RoleState::Completed
            && self.reader.state == RoleState::Completed
            && self.writer.cycles == self.reader.cycles
            && self.writer.digest == self.reader.digest
    }
}

/// Owns one handoff session from region creation to teardown.
pub struct Initiator {
    config: HandoffConfig,
}

impl Initiator {
    pub(crate) fn new(config: HandoffConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HandoffConfig {
        &self.config
    }

    /// Run the session in the configured [`ExecutionMode`].
    pub fn run(&self) -> Result<HandoffReport> {
        match self.config.mode {
            ExecutionMode::Processes => self.run_processes(),
            ExecutionMode::Threads => self.run_threads(),
        }
    }

    /// Run writer and reader on two OS threads sharing the region.
    pub fn run_threads(&self) -> Result<HandoffReport> {
        let region = self.setup()?;
        let writer = Writer::new(region.writer()?, self.config.plan, self.config.spin);
        let reader = Reader::new(region.reader()?, self.config.plan, self.config.spin);

        // an already started writer is orphaned if the reader cannot be spawned
        let writer_handle = thread::Builder::new()
            .name("writer".into())
            .spawn(move || writer.run())
            .map_err(|source| HandoffError::Spawn {
                role: Role::Writer,
                source,
            })?;
        let reader_handle = thread::Builder::new()
            .name("reader".into())
            .spawn(move || reader.run())
            .map_err(|source| HandoffError::Spawn {
                role: Role::Reader,
                source,
            })?;

        info!("initiator: waiting for roles to complete...");
        let writer_result = join_role(Role::Writer, writer_handle);
        info!("initiator: writer thread completed");
        let reader_result = join_role(Role::Reader, reader_handle);
        info!("initiator: reader thread completed");

        finish(self.teardown(region), writer_result, reader_result)
    }

    /// Run writer and reader in two forked child processes, the way the
    /// reference program does.
    ///
    /// Children inherit the shared mapping. Call this from a process that
    /// has no other threads doing work, as with any use of `fork()`.
    pub fn run_processes(&self) -> Result<HandoffReport> {
        let region = self.setup()?;
        let writer = Writer::new(region.writer()?, self.config.plan, self.config.spin);
        let reader = Reader::new(region.reader()?, self.config.plan, self.config.spin);

        let writer_pid = spawn_process(Role::Writer, move || writer.run().map(|_| ()))?;
        let reader_pid = spawn_process(Role::Reader, move || reader.run().map(|_| ()))?;

        info!("initiator: waiting for children to complete...");
        // each waitpid blocks only until that child is gone; the other may
        // already be a zombie, so completion order does not matter
        let writer_result = reap(Role::Writer, writer_pid);
        let reader_result = reap(Role::Reader, reader_pid);

        finish(self.teardown(region), writer_result, reader_result)
    }

    fn setup(&self) -> Result<Arc<HandoffRegion>> {
        let region = HandoffRegion::create(
            self.config.region_size,
            self.config.region_name.as_deref(),
        )?;
        info!(
            "initiator: created shared memory {} ({} bytes, {:?})",
            region.label(),
            region.size(),
            region.shm.raw_handle()
        );
        info!(
            "initiator: mapped at {:p}, using ready flag for synchronization",
            region.layout.as_ptr()
        );
        Ok(Arc::new(region))
    }

    fn teardown(&self, region: Arc<HandoffRegion>) -> Result<HandoffReport> {
        let report = HandoffReport {
            writer: region.summary(Role::Writer),
            reader: region.summary(Role::Reader),
        };

        if report.transcripts_match() {
            info!(
                "initiator: {} messages handed off, transcript digest {}",
                report.writer.cycles,
                report.writer.digest_hex()
            );
        } else {
            warn!(
                "initiator: transcripts differ (writer {:?}/{} cycles, reader {:?}/{} cycles)",
                report.writer.state, report.writer.cycles, report.reader.state, report.reader.cycles
            );
        }

        let label = region.label().to_owned();
        match Arc::try_unwrap(region) {
            Ok(region) => {
                region.destroy()?;
                info!("initiator: cleaned up shared memory {}", label);
            }
            Err(_) => warn!("initiator: {} is still referenced, leaving it in place", label),
        }
        Ok(report)
    }
}

/// Join a role thread, turning a panic into [`HandoffError::RolePanicked`].
fn join_role<T>(role: Role, handle: thread::JoinHandle<Result<T>>) -> Result<()> {
    handle
        .join()
        .map_err(|_| HandoffError::RolePanicked(role))
        .and_then(|res| res.map(|_| ()))
}

/// Combine the teardown outcome with both role outcomes. A role error wins
/// over a teardown error, which is then only logged.
fn finish(
    report: Result<HandoffReport>,
    writer: Result<()>,
    reader: Result<()>,
) -> Result<HandoffReport> {
    if writer.is_err() || reader.is_err() {
        if let Err(e) = &report {
            warn!("initiator: teardown failed: {}", e);
        }
        writer?;
        reader?;
    }
    report
}

/// Fork a child that runs `role_fn` and exits with 0 on success, 1 on error.
/// Returns the child's pid in the parent.
fn spawn_process(role: Role, role_fn: impl FnOnce() -> Result<()>) -> Result<libc::pid_t> {
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        return Err(HandoffError::Spawn {
            role,
            source: io::Error::last_os_error(),
        });
    }

    if pid == 0 {
        // the parent may carry a SIGINT handler; children keep the default
        unsafe {
            libc::signal(libc::SIGINT, libc::SIG_DFL);
        }
        let code = match role_fn() {
            Ok(()) => 0,
            Err(e) => {
                error!("{} (pid {}): {}", role, std::process::id(), e);
                1
            }
        };
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();
        unsafe { libc::_exit(code) }
    }

    info!("initiator: started {} as pid {}", role, pid);
    Ok(pid)
}

/// Wait for one child and turn its exit status into a result.
fn reap(role: Role, pid: libc::pid_t) -> Result<()> {
    let mut status: libc::c_int = 0;
    loop {
        let ret = unsafe { libc::waitpid(pid, &mut status, 0) };
        if ret == pid {
            break;
        }
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            continue;
        }
        return Err(HandoffError::RoleFailed {
            role,
            status: format!("waitpid({}) failed: {}", pid, err),
        });
    }

    if libc::WIFEXITED(status) {
        let code = libc::WEXITSTATUS(status);
        info!("initiator: {} (pid {}) completed with status {}", role, pid, code);
        if code == 0 {
            return Ok(());
        }
        return Err(HandoffError::RoleFailed {
            role,
            status: format!("exit status {}", code),
        });
    }
    if libc::WIFSIGNALED(status) {
        return Err(HandoffError::RoleFailed {
            role,
            status: format!("killed by signal {}", libc::WTERMSIG(status)),
        });
    }
    Err(HandoffError::RoleFailed {
        role,
        status: format!("raw wait status {:#x}", status),
    })
}

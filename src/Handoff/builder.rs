use super::Initiator;
use crate::Core::error::{HandoffError, Result};
use crate::Core::spin::SpinStrategy;
use std::time::Duration;

/// Name of the POSIX region used when none is configured.
pub const DEFAULT_REGION_NAME: &str = "/shm_handoff";
/// Bytes mapped for the region; the layout itself needs far less.
pub const DEFAULT_REGION_SIZE: usize = 1024;
pub const DEFAULT_MESSAGES: u32 = 5;
pub const DEFAULT_BASE_ID: i32 = 100;
pub const DEFAULT_PACING: Duration = Duration::from_millis(100);

/// How the two roles are run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Two child processes created with fork(), sharing the mapping.
    #[default]
    Processes,
    /// Two OS threads in this process.
    Threads,
}

/// Per-role part of the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolePlan {
    /// Number of handoff cycles.
    pub messages: u32,
    /// Message k carries `base_id + k`.
    pub base_id: i32,
    /// Sleep after each cycle. Zero skips the sleep.
    pub pacing: Duration,
}

impl RolePlan {
    /// Sequence id carried by the message of `cycle` (1-based), or a
    /// `Config` error if it does not fit in an `i32`.
    pub fn sequence_id(&self, cycle: u32) -> Result<i32> {
        i32::try_from(cycle)
            .ok()
            .and_then(|cycle| self.base_id.checked_add(cycle))
            .ok_or_else(|| {
                HandoffError::Config(format!(
                    "sequence ids overflow: base {} + {} exceeds {}",
                    self.base_id,
                    cycle,
                    i32::MAX
                ))
            })
    }

    /// Check that every cycle of the plan gets a sequence id.
    pub fn validate(&self) -> Result<()> {
        self.sequence_id(self.messages).map(|_| ())
    }
}

impl Default for RolePlan {
    fn default() -> Self {
        Self {
            messages: DEFAULT_MESSAGES,
            base_id: DEFAULT_BASE_ID,
            pacing: DEFAULT_PACING,
        }
    }
}

/// Validated settings for one handoff session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffConfig {
    pub plan: RolePlan,
    /// `None` maps an anonymous region.
    pub region_name: Option<String>,
    pub region_size: usize,
    pub spin: SpinStrategy,
    pub mode: ExecutionMode,
}

pub struct HandoffBuilder {
    plan: RolePlan,
    region_name: Option<String>,
    region_size: usize,
    spin: SpinStrategy,
    mode: ExecutionMode,
}

impl Default for HandoffBuilder {
    fn default() -> Self {
        Self {
            plan: RolePlan::default(),
            region_name: Some(DEFAULT_REGION_NAME.to_owned()),
            region_size: DEFAULT_REGION_SIZE,
            spin: SpinStrategy::Unbounded,
            mode: ExecutionMode::Processes,
        }
    }
}

impl HandoffBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(mut self, messages: u32) -> Self {
        self.plan.messages = messages;
        self
    }

    pub fn with_base_id(mut self, base_id: i32) -> Self {
        self.plan.base_id = base_id;
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.plan.pacing = pacing;
        self
    }

    pub fn with_region_name(mut self, name: impl Into<String>) -> Self {
        self.region_name = Some(name.into());
        self
    }

    /// Use an anonymous shared mapping instead of a named region.
    pub fn anonymous_region(mut self) -> Self {
        self.region_name = None;
        self
    }

    pub fn with_region_size(mut self, size: usize) -> Self {
        self.region_size = size;
        self
    }

    pub fn with_spin(mut self, spin: SpinStrategy) -> Self {
        self.spin = spin;
        self
    }

    /// Give up waiting on a silent peer after `timeout`, using backoff
    /// instead of the pure spin.
    pub fn with_peer_timeout(self, timeout: Duration) -> Self {
        self.with_spin(SpinStrategy::Backoff { timeout })
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn config(self) -> Result<HandoffConfig> {
        self.plan.validate()?;
        if let Some(name) = &self.region_name {
            if name.trim_start_matches('/').is_empty() {
                return Err(HandoffError::Config("region name must not be empty".into()));
            }
        }

        Ok(HandoffConfig {
            plan: self.plan,
            region_name: self.region_name,
            region_size: self.region_size,
            spin: self.spin,
            mode: self.mode,
        })
    }

    pub fn build(self) -> Result<Initiator> {
        Ok(Initiator::new(self.config()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_the_reference_scenario() {
        let config = HandoffBuilder::new().config().unwrap();
        assert_eq!(config.plan.messages, 5);
        assert_eq!(config.plan.base_id, 100);
        assert_eq!(config.plan.pacing, Duration::from_millis(100));
        assert_eq!(config.region_name.as_deref(), Some("/shm_handoff"));
        assert_eq!(config.region_size, 1024);
        assert_eq!(config.spin, SpinStrategy::Unbounded);
        assert_eq!(config.mode, ExecutionMode::Processes);
    }

    #[test]
    fn test_rejects_sequence_overflow() {
        let res = HandoffBuilder::new()
            .with_base_id(i32::MAX - 2)
            .with_messages(3)
            .config();
        assert!(matches!(res, Err(HandoffError::Config(_))));

        assert!(HandoffBuilder::new()
            .with_base_id(i32::MAX - 3)
            .with_messages(3)
            .config()
            .is_ok());
    }

    #[test]
    fn test_sequence_id_checks_bounds() {
        let plan = RolePlan {
            messages: 3,
            base_id: i32::MAX - 1,
            pacing: Duration::ZERO,
        };
        assert_eq!(plan.sequence_id(1).unwrap(), i32::MAX);
        assert!(matches!(plan.sequence_id(2), Err(HandoffError::Config(_))));
        assert!(plan.validate().is_err());
        assert!(RolePlan::default().sequence_id(u32::MAX).is_err());
    }

    #[test]
    fn test_rejects_empty_region_name() {
        let res = HandoffBuilder::new().with_region_name("/").config();
        assert!(matches!(res, Err(HandoffError::Config(_))));
    }

    #[test]
    fn test_peer_timeout_selects_backoff() {
        let config = HandoffBuilder::new()
            .with_peer_timeout(Duration::from_secs(2))
            .config()
            .unwrap();
        assert_eq!(
            config.spin,
            SpinStrategy::Backoff {
                timeout: Duration::from_secs(2)
            }
        );
    }
}

use super::RolePlan;
use crate::Core::error::{HandoffError, Result};
use crate::Core::spin::SpinWait;
use crate::Slot::{Ownership, ReaderEnd};
use crate::Structs::{Message, Role, RoleState, Transcript};
use log::{debug, info};
use std::thread;

/// Consuming side of the handoff: WaitFull, Consume, Release, Pace.
pub struct Reader<S: SpinWait> {
    end: ReaderEnd,
    plan: RolePlan,
    spin: S,
}

impl<S: SpinWait> Reader<S> {
    pub fn new(end: ReaderEnd, plan: RolePlan, spin: S) -> Self {
        Self { end, plan, spin }
    }

    pub fn run(self) -> Result<Transcript> {
        self.run_with(|_| {})
    }

    /// Like [`Reader::run`], calling `observe` with every message while the
    /// reader owns the slot (after WaitFull, before the flag flips to Empty).
    pub fn run_with(mut self, mut observe: impl FnMut(&Message)) -> Result<Transcript> {
        info!("reader (pid {}): started", std::process::id());
        let mut transcript = Transcript::new(Role::Reader);

        for cycle in 1..=self.plan.messages {
            match self.cycle(cycle, &mut observe) {
                Ok(message) => transcript.push(message),
                Err(e) => {
                    self.end.report(RoleState::Failed, &transcript);
                    return Err(e);
                }
            }
            if !self.plan.pacing.is_zero() {
                thread::sleep(self.plan.pacing);
            }
        }

        self.end.report(RoleState::Completed, &transcript);
        info!("reader: finished reading {} messages", transcript.len());
        Ok(transcript)
    }

    fn cycle(&mut self, cycle: u32, observe: &mut impl FnMut(&Message)) -> Result<Message> {
        let turn = self
            .end
            .wait_full(&self.spin)
            .map_err(|e| HandoffError::PeerTimeout {
                role: Role::Reader,
                cycle,
                awaited: Ownership::Full,
                polls: e.polls,
            })?;

        let message = turn.message();
        observe(&message);
        info!(
            "reader: read message {}: '{}'",
            message.sequence_id(),
            message.payload()
        );
        turn.release();
        debug!("reader: cycle {} released", cycle);

        Ok(message)
    }
}

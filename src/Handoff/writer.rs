use super::RolePlan;
use crate::Core::error::{HandoffError, Result};
use crate::Core::spin::SpinWait;
use crate::Slot::{Ownership, WriterEnd};
use crate::Structs::{Message, Role, RoleState, Transcript};
use log::{debug, info};
use std::thread;

/// Producing side of the handoff.
///
/// Each cycle: WaitEmpty, Produce, Publish, Pace. After the last cycle the
/// writer leaves the flag as it is and records its report.
pub struct Writer<S: SpinWait> {
    end: WriterEnd,
    plan: RolePlan,
    spin: S,
}

impl<S: SpinWait> Writer<S> {
    pub fn new(end: WriterEnd, plan: RolePlan, spin: S) -> Self {
        Self { end, plan, spin }
    }

    /// Payload text for cycle `iteration` (1-based).
    pub fn payload_for(iteration: u32) -> String {
        format!("Message from writer, iteration {}", iteration)
    }

    pub fn run(self) -> Result<Transcript> {
        self.run_with(|_| {})
    }

    /// Like [`Writer::run`], calling `observe` with every message while the
    /// writer owns the slot (after WaitEmpty, before the flag flips to Full).
    pub fn run_with(mut self, mut observe: impl FnMut(&Message)) -> Result<Transcript> {
        info!("writer (pid {}): started", std::process::id());
        let mut transcript = Transcript::new(Role::Writer);

        if let Err(e) = self.plan.validate() {
            self.end.report(RoleState::Failed, &transcript);
            return Err(e);
        }

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
        info!("writer: finished writing {} messages", transcript.len());
        Ok(transcript)
    }

    fn cycle(&mut self, cycle: u32, observe: &mut impl FnMut(&Message)) -> Result<Message> {
        let mut turn = self
            .end
            .wait_empty(&self.spin)
            .map_err(|e| HandoffError::PeerTimeout {
                role: Role::Writer,
                cycle,
                awaited: Ownership::Empty,
                polls: e.polls,
            })?;

        let sequence_id = self.plan.sequence_id(cycle)?;
        let message = Message::new(sequence_id, Self::payload_for(cycle))?;

        turn.fill(&message);
        observe(&message);
        info!(
            "writer: wrote message {}: '{}'",
            message.sequence_id(),
            message.payload()
        );
        turn.publish();
        debug!("writer: cycle {} published", cycle);

        Ok(message)
    }
}

use std::ptr;
use std::sync::atomic::Ordering::Release;

use super::layout::{SlotRecord, MAX_MSG_LEN};
use super::Slot::{HandoffRegion, Ownership, ReaderEnd, WriterEnd};
use crate::Core::spin::{SpinExhausted, SpinWait};
use crate::Structs::{Message, Role, RoleState, Transcript};

/// Proof that the writer observed `Empty` and owns the record.
///
/// Dropping a turn without [`WriteTurn::publish`] leaves the flag untouched.
pub struct WriteTurn<'a> {
    slot: &'a SlotRecord,
}

/// Proof that the reader observed `Full` and owns the record.
///
/// Dropping a turn without [`ReadTurn::release`] leaves the flag untouched.
pub struct ReadTurn<'a> {
    slot: &'a SlotRecord,
}

impl WriterEnd {
    /// WaitEmpty: spin until the flag reads `Empty`.
    ///
    /// `&mut self` keeps at most one turn alive per end.
    pub fn wait_empty<S: SpinWait>(&mut self, spin: &S) -> Result<WriteTurn<'_>, SpinExhausted> {
        let slot = self.region.slot();
        spin.wait_for(&slot.ownership_flag, Ownership::Empty.raw())?;
        Ok(WriteTurn { slot })
    }

    pub fn region(&self) -> &HandoffRegion {
        &self.region
    }

    pub(crate) fn report(&self, state: RoleState, transcript: &Transcript) {
        self.region.record_report(Role::Writer, state, transcript);
    }
}

impl ReaderEnd {
    /// WaitFull: spin until the flag reads `Full`.
    pub fn wait_full<S: SpinWait>(&mut self, spin: &S) -> Result<ReadTurn<'_>, SpinExhausted> {
        let slot = self.region.slot();
        spin.wait_for(&slot.ownership_flag, Ownership::Full.raw())?;
        Ok(ReadTurn { slot })
    }

    pub fn region(&self) -> &HandoffRegion {
        &self.region
    }

    pub(crate) fn report(&self, state: RoleState, transcript: &Transcript) {
        self.region.record_report(Role::Reader, state, transcript);
    }
}

impl WriteTurn<'_> {
    /// Write `sequence_id` and the NUL-padded payload into the record.
    pub fn fill(&mut self, message: &Message) {
        let bytes = message.payload().as_bytes();
        // Message guarantees len < MAX_MSG_LEN
        let len = bytes.len().min(MAX_MSG_LEN - 1);

        // Safety: the flag read Empty with acquire ordering and only the
        // single WriterEnd can hold a WriteTurn, so the reader is not
        // touching the record until publish() flips the flag.
        unsafe {
            *self.slot.sequence_id.get() = message.sequence_id();
            let buf = &mut *self.slot.payload.get();
            ptr::copy_nonoverlapping(bytes.as_ptr(), buf.as_mut_ptr(), len);
            // zero the tail so no bytes of a longer previous message survive
            buf[len..].fill(0);
        }
    }

    /// Hand the slot to the reader. Everything written by `fill` happens-before
    /// the reader's acquire load that observes `Full`.
    pub fn publish(self) {
        self.slot
            .ownership_flag
            .store(Ownership::Full.raw(), Release);
    }
}

impl ReadTurn<'_> {
    /// Read `sequence_id` and the payload up to the first NUL.
    pub fn message(&self) -> Message {
        // Safety: the flag read Full with acquire ordering, so the writer's
        // fill() is complete and it will not write again until release().
        unsafe {
            let sequence_id = *self.slot.sequence_id.get();
            let buf = &*self.slot.payload.get();
            let len = buf.iter().position(|&b| b == 0).unwrap_or(MAX_MSG_LEN);
            Message::from_slot(sequence_id, &buf[..len])
        }
    }

    /// Hand the slot back to the writer.
    pub fn release(self) {
        self.slot
            .ownership_flag
            .store(Ownership::Empty.raw(), Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Core::spin::SpinStrategy;
    use crate::Slot::layout::FLAG_FULL;
    use std::sync::Arc;

    const NO_WAIT: SpinStrategy = SpinStrategy::Bounded { max_polls: 1 };

    fn region() -> Arc<HandoffRegion> {
        Arc::new(HandoffRegion::create(1024, None).unwrap())
    }

    #[test]
    fn test_fresh_region_is_empty() {
        let region = region();
        assert_eq!(region.ownership(), Some(Ownership::Empty));
        let mut reader = region.reader().unwrap();
        assert!(reader.wait_full(&NO_WAIT).is_err());
    }

    #[test]
    fn test_publish_hands_the_slot_to_the_reader() {
        let region = region();
        let mut writer = region.writer().unwrap();
        let mut reader = region.reader().unwrap();

        let mut turn = writer.wait_empty(&NO_WAIT).unwrap();
        turn.fill(&Message::new(7, "hello").unwrap());
        assert_eq!(region.ownership(), Some(Ownership::Empty));
        turn.publish();
        assert_eq!(region.raw_flag(), FLAG_FULL);

        assert!(writer.wait_empty(&NO_WAIT).is_err());
        let turn = reader.wait_full(&NO_WAIT).unwrap();
        let got = turn.message();
        assert_eq!(got.sequence_id(), 7);
        assert_eq!(got.payload(), "hello");
        turn.release();
        assert_eq!(region.ownership(), Some(Ownership::Empty));
    }

    #[test]
    fn test_shorter_payload_does_not_inherit_previous_bytes() {
        let region = region();
        let mut writer = region.writer().unwrap();
        let mut reader = region.reader().unwrap();

        for (id, text) in [(1, "a much longer first message"), (2, "short")] {
            let mut turn = writer.wait_empty(&NO_WAIT).unwrap();
            turn.fill(&Message::new(id, text).unwrap());
            turn.publish();

            let turn = reader.wait_full(&NO_WAIT).unwrap();
            assert_eq!(turn.message().payload(), text);
            turn.release();
        }
    }

    #[test]
    fn test_full_capacity_payload_round_trips() {
        let region = region();
        let mut writer = region.writer().unwrap();
        let mut reader = region.reader().unwrap();
        let text = "z".repeat(MAX_MSG_LEN - 1);

        let mut turn = writer.wait_empty(&NO_WAIT).unwrap();
        turn.fill(&Message::new(1, text.clone()).unwrap());
        turn.publish();

        let turn = reader.wait_full(&NO_WAIT).unwrap();
        assert_eq!(turn.message().payload(), text);
    }

    #[test]
    fn test_dropped_turn_keeps_the_flag() {
        let region = region();
        let mut writer = region.writer().unwrap();
        {
            let mut turn = writer.wait_empty(&NO_WAIT).unwrap();
            turn.fill(&Message::new(1, "never published").unwrap());
        }
        assert_eq!(region.ownership(), Some(Ownership::Empty));
    }

    #[test]
    fn test_ends_can_only_be_claimed_once() {
        let region = region();
        let _writer = region.writer().unwrap();
        let _reader = region.reader().unwrap();
        assert!(region.writer().is_err());
        assert!(region.reader().is_err());
    }
}

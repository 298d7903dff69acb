// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Per-packet pipeline state threaded through table traversal.

use net::buffer::PacketBufferMut;
use wire::oxm::{Match, OxmField, field_code};

use crate::action_set::ActionSet;

/// Everything the instruction executor and table lookup need about one packet in flight.
///
/// Header parsing and TTL validation happen before a packet reaches the pipeline;
/// [`PacketContext::match_fields`] is the already-extracted summary the caller hands in alongside
/// the raw buffer.
pub struct PacketContext<Buf: PacketBufferMut> {
    buffer: Buf,
    match_fields: Match,
    metadata: u64,
    action_set: ActionSet,
    ttl_expired: bool,
}

impl<Buf: PacketBufferMut> PacketContext<Buf> {
    /// Wrap a raw buffer and its externally-computed match summary for pipeline traversal.
    #[must_use]
    pub fn new(buffer: Buf, match_fields: Match) -> Self {
        Self {
            buffer,
            match_fields,
            metadata: 0,
            action_set: ActionSet::new(),
            ttl_expired: false,
        }
    }

    /// The packet's header-derived match fields, as parsed on entry to the pipeline.
    /// `OFPIT_WRITE_METADATA` does not alter these directly; see [`PacketContext::lookup_fields`]
    /// for the view a table lookup actually sees.
    #[must_use]
    pub fn match_fields(&self) -> &Match {
        &self.match_fields
    }

    /// The fields a `flow_table_lookup` should match against: the header fields plus the current
    /// `metadata` register, so that a `OFPIT_WRITE_METADATA` in an earlier table is visible to a
    /// later table reached via `OFPIT_GOTO_TABLE`.
    #[must_use]
    pub fn lookup_fields(&self) -> Match {
        let mut fields = self.match_fields.clone();
        fields.0.retain(|f| f.field_code() != field_code::METADATA);
        fields.0.push(OxmField::Metadata(self.metadata, None));
        fields
    }

    /// Current pipeline metadata register.
    #[must_use]
    pub fn metadata(&self) -> u64 {
        self.metadata
    }

    pub(crate) fn write_metadata(&mut self, value: u64, mask: u64) {
        self.metadata = (self.metadata & !mask) | (value & mask);
    }

    pub(crate) fn action_set_mut(&mut self) -> &mut ActionSet {
        &mut self.action_set
    }

    /// Drain the accumulated action set, consuming this context's copy of it.
    pub(crate) fn take_action_set(&mut self) -> ActionSet {
        std::mem::take(&mut self.action_set)
    }

    /// Mark this packet's TTL/hop-limit as already expired, set by the caller before pipeline
    /// entry so `OFPC_INVALID_TTL_TO_CONTROLLER` handling (external to table matching) can still
    /// influence whether a match result is honored.
    pub fn set_ttl_expired(&mut self, expired: bool) {
        self.ttl_expired = expired;
    }

    /// `true` if the caller flagged this packet's TTL/hop-limit as already expired.
    #[must_use]
    pub fn ttl_expired(&self) -> bool {
        self.ttl_expired
    }

    /// Access the raw packet buffer.
    #[must_use]
    pub fn buffer(&self) -> &Buf {
        &self.buffer
    }

    /// Mutably access the raw packet buffer (for `OFPAT_SET_FIELD`/TTL-decrement style actions).
    pub fn buffer_mut(&mut self) -> &mut Buf {
        &mut self.buffer
    }

    /// Consume the context, returning the underlying buffer.
    #[must_use]
    pub fn into_buffer(self) -> Buf {
        self.buffer
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#[cfg(test)]
mod tests {
    use net::buffer::test_buffer::TestBuffer;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn lookup_fields_reflects_written_metadata() {
        let mut pkt = PacketContext::new(
            TestBuffer::from_raw_data(b"hello"),
            Match(smallvec::smallvec![OxmField::EthType(0x0800)]),
        );
        pkt.write_metadata(0x42, u64::MAX);
        let fields = pkt.lookup_fields();
        assert!(fields.0.contains(&OxmField::EthType(0x0800)));
        assert!(fields.0.contains(&OxmField::Metadata(0x42, None)));
        assert_eq!(pkt.match_fields().0.len(), 1, "the header-derived fields are untouched");
    }
}

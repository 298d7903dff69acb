// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A single installed flow table entry.

use std::time::Instant;

use wire::instruction::Instruction;
use wire::oxm::Match;

use crate::sync_links::EntryId;

/// One row of a flow table: a match, its instruction set (already sorted into canonical
/// execution order), and the bookkeeping stats replies and expiry require.
#[derive(Debug, Clone)]
pub struct FlowEntry {
    /// This entry's identity, used to resolve table 62/63 mirror cross-links.
    pub id: EntryId,
    /// Controller-assigned opaque identifier, echoed on removal and in stats.
    pub cookie: u64,
    /// Entry priority; higher values are preferred among overlapping matches. Table 61 entries
    /// must have `priority == <destination prefix length>`. A table 62/63 mirror install carries
    /// the priority of the message that triggered it unchanged.
    pub priority: u16,
    /// The match this entry applies to. An entry with an empty match and `priority == 0` is the
    /// table-miss entry.
    pub match_fields: Match,
    /// Instruction set, pre-sorted by [`Instruction::execution_rank`].
    pub instructions: Vec<Instruction>,
    /// Seconds of inactivity before this entry expires; `0` disables idle expiry.
    pub idle_timeout: u16,
    /// Seconds after which this entry expires unconditionally; `0` disables hard expiry.
    pub hard_timeout: u16,
    /// `OFPFF_SEND_FLOW_REM`.
    pub send_flow_rem: bool,
    /// When this entry was installed.
    pub created_at: Instant,
    /// When this entry was last matched; used for idle-timeout expiry.
    pub last_matched_at: Instant,
    /// Cumulative packets matched.
    pub packet_count: u64,
    /// Cumulative bytes matched.
    pub byte_count: u64,
    /// For a table 62/63 mirrored pair: the id of the entry that installed this one.
    pub sync_master: Option<EntryId>,
    /// For a table 62/63 mirrored pair: the id of the entry this one installed in turn.
    pub sync_slave: Option<EntryId>,
}

impl FlowEntry {
    /// `true` if this is the reserved table-miss entry: zero priority and a wildcard-all match
    /// (no OXM TLVs present).
    #[must_use]
    pub fn is_table_miss(&self) -> bool {
        self.priority == 0 && self.match_fields.0.is_empty()
    }

    /// Record a match: bump counters and refresh the idle-timeout clock.
    pub fn record_hit(&mut self, bytes: u64) {
        self.packet_count += 1;
        self.byte_count += bytes;
        self.last_matched_at = Instant::now();
    }

    /// `true` if this entry has exceeded its idle or hard timeout as of `now`.
    #[must_use]
    pub fn expired(&self, now: Instant) -> bool {
        if self.hard_timeout != 0 && now.duration_since(self.created_at).as_secs() >= u64::from(self.hard_timeout) {
            return true;
        }
        if self.idle_timeout != 0 && now.duration_since(self.last_matched_at).as_secs() >= u64::from(self.idle_timeout) {
            return true;
        }
        false
    }
}

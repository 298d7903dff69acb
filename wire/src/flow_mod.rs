// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `OFPT_FLOW_MOD` message body.

use crate::instruction::Instruction;
use crate::oxm::Match;

/// `ofp_flow_mod_command`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowModCommand {
    /// Add a new flow entry, or replace an identical one (`OFPFC_ADD`).
    Add,
    /// Replace all flows matching the given pattern (`OFPFC_MODIFY`).
    Modify,
    /// Replace only the flow strictly matching priority and match (`OFPFC_MODIFY_STRICT`).
    ModifyStrict,
    /// Delete all flows matching the given pattern (`OFPFC_DELETE`).
    Delete,
    /// Delete only the flow strictly matching priority and match (`OFPFC_DELETE_STRICT`).
    DeleteStrict,
}

/// Bitflags on `ofp_flow_mod.flags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlowModFlags {
    /// `OFPFF_SEND_FLOW_REM`: emit `OFPT_FLOW_REMOVED` when this entry expires or is deleted.
    pub send_flow_rem: bool,
    /// `OFPFF_CHECK_OVERLAP`: reject the add if it would overlap an existing entry.
    pub check_overlap: bool,
    /// `OFPFF_RESET_COUNTS`: reset flow counters (`OFPFC_MODIFY*`).
    pub reset_counts: bool,
    /// `OFPFF_NO_PKT_COUNTS` / `OFPFF_NO_BYT_COUNTS`: disable counting for this entry.
    pub no_pkt_counts: bool,
    /// See `no_pkt_counts`.
    pub no_byt_counts: bool,
}

/// A decoded `OFPT_FLOW_MOD` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowMod {
    /// Opaque controller-assigned identifier, echoed back on removal/stats.
    pub cookie: u64,
    /// For `Modify`/`Delete` (non-strict): only touch entries whose cookie matches under
    /// `cookie_mask`.
    pub cookie_mask: u64,
    /// Target table, or `0xff` ("all tables", legal only for `Delete`/`DeleteStrict`).
    pub table_id: u8,
    /// The requested operation.
    pub command: FlowModCommand,
    /// Seconds of inactivity before this entry expires, or `0` for "never".
    pub idle_timeout: u16,
    /// Seconds after which this entry expires unconditionally, or `0` for "never".
    pub hard_timeout: u16,
    /// Entry priority; higher values are preferred on overlapping matches.
    pub priority: u16,
    /// Request buffered-packet replay against this buffer id, or `NO_BUFFER`.
    pub buffer_id: u32,
    /// Restrict `Delete`/`DeleteStrict` to flows that output to this port, or `ANY`.
    pub out_port: u32,
    /// Restrict `Delete`/`DeleteStrict` to flows that forward to this group, or `ANY`.
    pub out_group: u32,
    /// `ofp_flow_mod.flags`.
    pub flags: FlowModFlags,
    /// The match this entry applies to (or matches, for `Modify`/`Delete`).
    pub match_fields: Match,
    /// The instruction set, not yet reordered into canonical execution rank.
    pub instructions: Vec<Instruction>,
}

/// `out_port`/`out_group` sentinel meaning "no restriction."
pub const ANY: u32 = 0xffff_ffff;
/// `buffer_id` sentinel meaning "no buffered packet."
pub const NO_BUFFER: u32 = 0xffff_ffff;

impl FlowMod {
    /// `true` if this is the table-miss entry: priority `0` and an empty (wildcard-all) match
    /// (`priority == 0 && match.length <= 4`, i.e. no OXM TLVs present beyond the zero-length
    /// `oxm_fields` header).
    #[must_use]
    pub fn is_table_miss(&self) -> bool {
        self.priority == 0 && self.match_fields.0.is_empty()
    }
}

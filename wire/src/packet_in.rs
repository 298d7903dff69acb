// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `OFPT_PACKET_IN`, sent to the controller on table-miss or an explicit `OFPAT_OUTPUT` to
//! `PORT_CONTROLLER`.

use crate::oxm::Match;

/// `ofp_packet_in_reason`, restricted to the reasons this pipeline actually emits. A table miss
/// never falls through to `OFPR_NO_MATCH`: an unmatched packet with no table-miss entry installed
/// is hard-dropped instead, so that reason code is unused here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketInReason {
    /// `OFPC_INVALID_TTL_TO_CONTROLLER` is set and this packet's TTL expired (`OFPR_INVALID_TTL`).
    InvalidTtl,
    /// `OFPIT_APPLY_ACTIONS` ran on the table-miss entry (`OFPR_TABLE_MISS`).
    TableMiss,
    /// `OFPIT_APPLY_ACTIONS` output to the controller from any other entry (`OFPR_APPLY_ACTION`).
    ApplyAction,
    /// The accumulated action set output to the controller at the end of table traversal
    /// (`OFPR_ACTION_SET`); carries `NO_MATCH_COOKIE` in place of a real entry's cookie.
    ActionSet,
}

/// A decoded `OFPT_PACKET_IN` message, ready to send to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketIn {
    /// Buffer id the datapath holds this packet under, or `NO_BUFFER` if fully included.
    pub buffer_id: u32,
    /// Original, unmodified packet length, even if `data` was truncated to `miss_send_len`.
    pub total_len: u16,
    /// Why this packet was punted.
    pub reason: PacketInReason,
    /// Table that produced the match (or miss) triggering this packet-in.
    pub table_id: u8,
    /// Cookie of the flow entry that matched, or `NO_MATCH_COOKIE` for an `ActionSet` reason.
    pub cookie: u64,
    /// Out-of-band match summary (ingress port, parsed header fields) carried alongside the
    /// packet, from outside this crate's header-parsing boundary.
    pub match_fields: Match,
    /// Packet bytes, truncated to `miss_send_len` unless `buffer_id == NO_BUFFER`.
    pub data: Vec<u8>,
}

/// Cookie value for a `PACKET_IN` not tied to one owning flow entry: a TTL punt, or the
/// end-of-traversal action-set execution.
pub const NO_MATCH_COOKIE: u64 = 0xffff_ffff_ffff_ffff;

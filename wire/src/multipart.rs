// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `OFPT_MULTIPART_REQUEST`/`OFPT_MULTIPART_REPLY` bodies.
//!
//! Multipart messages may be split across several `OFPT_MULTIPART_REQUEST` parts sharing one
//! `xid`, with `OFPMPF_REQ_MORE` set on every part but the last. [`Fragment`] models that
//! handshake; the actual stitching state machine (one pending buffer per in-flight xid,
//! `MULTIPART_BUFFER_OVERFLOW` on an xid mismatch mid-stream) lives in the `pipeline` crate's
//! multipart handler, which owns the lifetime of "is a request still open."

use crate::instruction::Instruction;
use crate::oxm::Match;
use crate::table_mod::TableConfig;

/// `ofp_multipart_type`, restricted to the types this pipeline answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultipartType {
    /// `OFPMP_DESC`: static switch description strings.
    Desc,
    /// `OFPMP_FLOW`: per-flow-entry statistics, optionally filtered.
    Flow,
    /// `OFPMP_AGGREGATE`: summed statistics across matching entries.
    Aggregate,
    /// `OFPMP_TABLE`: per-table entry counts and lookup/match counters.
    Table,
    /// `OFPMP_TABLE_FEATURES`: table capability descriptors; also used to reconfigure tables.
    TableFeatures,
    /// `OFPMP_TABLE_DESC`: per-table current configuration (introduced in 1.4, carried here as
    /// part of this crate's 1.3+ scope).
    TableDesc,
}

/// One part of a (possibly fragmented) multipart message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Controller transaction id; all parts of one logical request/reply share this.
    pub xid: u32,
    /// Which multipart exchange this is.
    pub kind: MultipartType,
    /// `true` if more parts follow (`OFPMPF_REQ_MORE`/`OFPMPF_REPLY_MORE`).
    pub more: bool,
    /// Raw, not-yet-decoded body bytes for this part.
    pub body: Vec<u8>,
}

/// Filter fields for an `OFPMP_FLOW`/`OFPMP_AGGREGATE` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsFilter {
    /// Restrict to one table, or `0xff` for all tables.
    pub table_id: u8,
    /// Restrict to entries that output to this port, or `ANY`.
    pub out_port: u32,
    /// Restrict to entries that forward to this group, or `ANY`.
    pub out_group: u32,
    /// Restrict to entries whose cookie matches under `cookie_mask`.
    pub cookie: u64,
    /// See `cookie`.
    pub cookie_mask: u64,
    /// Restrict to entries matching at least as specifically as this pattern.
    pub match_fields: Match,
}

/// Per-entry statistics returned by `OFPMP_FLOW`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowStats {
    /// Table this entry lives in.
    pub table_id: u8,
    /// Seconds the entry has existed.
    pub duration_sec: u32,
    /// Nanosecond remainder of `duration_sec`.
    pub duration_nsec: u32,
    /// Entry priority.
    pub priority: u16,
    /// Entry idle timeout, as configured.
    pub idle_timeout: u16,
    /// Entry hard timeout, as configured.
    pub hard_timeout: u16,
    /// Controller-assigned opaque identifier.
    pub cookie: u64,
    /// Packets matched by this entry since creation (or last reset).
    pub packet_count: u64,
    /// Bytes matched by this entry since creation (or last reset).
    pub byte_count: u64,
    /// The entry's match.
    pub match_fields: Match,
    /// The entry's instruction set.
    pub instructions: Vec<Instruction>,
}

/// Summed statistics returned by `OFPMP_AGGREGATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregateStats {
    /// Sum of `packet_count` across every matching entry.
    pub packet_count: u64,
    /// Sum of `byte_count` across every matching entry.
    pub byte_count: u64,
    /// Number of matching entries.
    pub flow_count: u32,
}

/// Per-table statistics returned by `OFPMP_TABLE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    /// Table id.
    pub table_id: u8,
    /// Current number of installed entries.
    pub active_count: u32,
    /// Cumulative packets that reached a lookup in this table.
    pub lookup_count: u64,
    /// Cumulative packets that lookup matched in this table.
    pub matched_count: u64,
}

/// A table's capability advertisement, as carried by `OFPMP_TABLE_FEATURES`.
///
/// The `OFPMP_TABLE_FEATURES` request/reply doubles as a reconfiguration channel: a request
/// carrying a full, valid list of features for every table is applied before the (identical, per
/// the standard's echo requirement) reply is generated. A request that is just read-only queries
/// carries no feature bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFeatures {
    /// Table id this descriptor applies to.
    pub table_id: u8,
    /// Human-readable table name (truncated to 32 bytes on the wire).
    pub name: String,
    /// Bitmask of metadata bits this table can match on.
    pub metadata_match: u64,
    /// Bitmask of metadata bits this table can write (`OFPIT_WRITE_METADATA`).
    pub metadata_write: u64,
    /// `ofp_table_config`.
    pub config: TableConfig,
    /// Maximum number of entries this table will hold.
    pub max_entries: u32,
}

/// `OFPTMPT_VACANCY` as echoed back by `OFPMP_TABLE_DESC`: the configured thresholds plus the
/// table's current vacancy at the time of the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VacancyProperty {
    /// Configured low threshold, percent free entries.
    pub vacancy_down: u8,
    /// Configured high threshold, percent free entries.
    pub vacancy_up: u8,
    /// Percentage of entries currently free, recomputed at emit time.
    pub vacancy: u8,
}

/// A property attached to an `OFPMP_TABLE_DESC` reply entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableDescProperty {
    /// `OFPTMPT_VACANCY`, present only when the table has `OFPTC_VACANCY_EVENTS` configured.
    Vacancy(VacancyProperty),
}

/// A table's current configuration, as carried by `OFPMP_TABLE_DESC`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescEntry {
    /// Table id.
    pub table_id: u8,
    /// `ofp_table_config`.
    pub config: TableConfig,
    /// Vacancy threshold/current-value property, present only if vacancy events are enabled.
    pub properties: Vec<TableDescProperty>,
}

/// A decoded, fully-reassembled multipart request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartRequest {
    /// `OFPMP_DESC`: no body.
    Desc,
    /// `OFPMP_FLOW`.
    Flow(StatsFilter),
    /// `OFPMP_AGGREGATE`.
    Aggregate(StatsFilter),
    /// `OFPMP_TABLE`: no body.
    Table,
    /// `OFPMP_TABLE_FEATURES`: `None` is a query, `Some` reconfigures every listed table.
    TableFeatures(Option<Vec<TableFeatures>>),
    /// `OFPMP_TABLE_DESC`: no body.
    TableDesc,
}

/// Static switch description strings returned by `OFPMP_DESC`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchDesc {
    /// Manufacturer description.
    pub mfr_desc: String,
    /// Hardware description.
    pub hw_desc: String,
    /// Software description.
    pub sw_desc: String,
    /// Serial number.
    pub serial_num: String,
    /// Human-readable datapath description.
    pub dp_desc: String,
}

/// A decoded multipart reply body, chunked at most 8 [`TableFeatures`] entries or 16
/// [`TableDescEntry`] entries per wire part. Every other reply type fits in a single part in this
/// implementation's expected deployments, table counts of 64-254 notwithstanding for
/// `OFPMP_TABLE`/`OFPMP_FLOW`, which this implementation does not chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartReplyChunk {
    /// `OFPMP_DESC`.
    Desc(SwitchDesc),
    /// `OFPMP_FLOW`.
    Flow(Vec<FlowStats>),
    /// `OFPMP_AGGREGATE`.
    Aggregate(AggregateStats),
    /// `OFPMP_TABLE`.
    Table(Vec<TableStats>),
    /// `OFPMP_TABLE_FEATURES`, already split into a chunk of at most 8 entries.
    TableFeatures(Vec<TableFeatures>),
    /// `OFPMP_TABLE_DESC`, already split into a chunk of at most 16 entries.
    TableDesc(Vec<TableDescEntry>),
}

/// Maximum [`TableFeatures`] entries per `OFPMP_TABLE_FEATURES` reply part.
pub const TABLE_FEATURES_CHUNK: usize = 8;
/// Maximum [`TableDescEntry`] entries per `OFPMP_TABLE_DESC` reply part.
pub const TABLE_DESC_CHUNK: usize = 16;

/// Split a full table-features list into wire-sized reply chunks.
#[must_use]
pub fn chunk_table_features(all: &[TableFeatures]) -> Vec<Vec<TableFeatures>> {
    all.chunks(TABLE_FEATURES_CHUNK).map(<[TableFeatures]>::to_vec).collect()
}

/// Split a full table-desc list into wire-sized reply chunks.
#[must_use]
pub fn chunk_table_desc(all: &[TableDescEntry]) -> Vec<Vec<TableDescEntry>> {
    all.chunks(TABLE_DESC_CHUNK).map(<[TableDescEntry]>::to_vec).collect()
}

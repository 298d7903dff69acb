// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! An in-memory reference [`Table`] implementation.
//!
//! The real flow-table entry matcher and eviction policy are treated as an external
//! collaborator elsewhere in a production datapath: the pipeline only ever consumes
//! `lookup`/`flow_mod`/`stats`/`timeout`/`aggregate_stats` through this interface. Exercising the
//! driver, flow-mod handler and multipart logic end-to-end still needs *some* concrete
//! implementation of that interface, so this module provides a linear-scan, priority-sorted one.
//! It is deliberately not a production LPM/hash engine.

use std::time::Instant;

use wire::action::Action;
use wire::flow_mod::{self, FlowMod, FlowModCommand};
use wire::instruction::Instruction;
use wire::multipart::{AggregateStats, FlowStats, StatsFilter, TableDescProperty, TableFeatures, TableStats, VacancyProperty};
use wire::oxm::Match;
use wire::table_mod::{TableConfig, VacancyRequest};

use crate::entry::FlowEntry;
use crate::error::PipelineError;
use crate::sync_links::EntryId;

/// What happened as a result of a [`Table::flow_mod`] call, enough for the pipeline-level
/// flow-mod handler to drive the table-62/63 mirror step and buffered-packet replay without the
/// table re-deriving them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableFlowModResult {
    /// `OFPFC_ADD` installed (or replaced an identically-keyed) entry.
    Added(EntryId),
    /// `OFPFC_MODIFY`/`OFPFC_MODIFY_STRICT` updated the instructions of these entries.
    Modified(Vec<EntryId>),
    /// `OFPFC_DELETE`/`OFPFC_DELETE_STRICT` removed these entries.
    Deleted(Vec<EntryId>),
}

struct VacancyState {
    request: VacancyRequest,
    // whether free-percentage was above the upper threshold as of the last table-mod; stored but
    // not otherwise consumed here since asynchronous vacancy-event delivery is the datapath's
    // concern, not the pipeline's — only computing and storing it is.
    #[allow(dead_code)]
    down_set: bool,
}

/// One flow table: an unordered set of [`FlowEntry`] rows plus the bookkeeping stats, features,
/// and vacancy replies require.
pub struct Table {
    id: u8,
    entries: Vec<FlowEntry>,
    features: TableFeatures,
    saved_features_config: TableConfig,
    desc_config: TableConfig,
    vacancy: Option<VacancyState>,
    lookup_count: u64,
    matched_count: u64,
}

fn cookie_matches(entry_cookie: u64, cookie: u64, cookie_mask: u64) -> bool {
    entry_cookie & cookie_mask == cookie & cookie_mask
}

/// `true` if `entry` is a candidate for a modify/delete request given the request's match
/// pattern and (for the `*_STRICT` commands) its exact priority.
///
/// Non-strict requests match any entry whose own (possibly masked) fields are at least as
/// specific as the request's; strict requests require priority and match to be identical.
fn entry_matches_request(entry: &FlowEntry, filter: &Match, priority: Option<u16>, strict: bool) -> bool {
    if let Some(p) = priority
        && entry.priority != p
    {
        return false;
    }
    if strict {
        entry.match_fields == *filter
    } else {
        filter.is_satisfied_by(&entry.match_fields)
    }
}

/// `true` if `entry` forwards to `out_port`/`out_group` somewhere in its instruction set, or if
/// neither restriction was requested (`ANY`).
fn out_matches(entry: &FlowEntry, out_port: u32, out_group: u32) -> bool {
    if out_port == flow_mod::ANY && out_group == flow_mod::ANY {
        return true;
    }
    entry.instructions.iter().any(|inst| {
        let actions: &[Action] = match inst {
            Instruction::ApplyActions(a) | Instruction::WriteActions(a) => a,
            _ => return false,
        };
        actions.iter().any(|action| match action {
            Action::Output { port, .. } => out_port != flow_mod::ANY && *port == out_port,
            Action::Group(g) => out_group != flow_mod::ANY && *g == out_group,
            _ => false,
        })
    })
}

fn stats_filter_matches(entry: &FlowEntry, filter: &StatsFilter) -> bool {
    filter.match_fields.is_satisfied_by(&entry.match_fields)
        && cookie_matches(entry.cookie, filter.cookie, filter.cookie_mask)
        && out_matches(entry, filter.out_port, filter.out_group)
}

impl Table {
    /// Create an empty table with the given capacity (`max_entries`, used by the vacancy
    /// calculation).
    #[must_use]
    pub fn new(id: u8, max_entries: u32) -> Self {
        Self {
            id,
            entries: Vec::new(),
            features: TableFeatures {
                table_id: id,
                name: format!("table-{id}"),
                metadata_match: u64::MAX,
                metadata_write: u64::MAX,
                config: TableConfig::default(),
                max_entries,
            },
            saved_features_config: TableConfig::default(),
            desc_config: TableConfig::default(),
            vacancy: None,
            lookup_count: 0,
            matched_count: 0,
        }
    }

    /// This table's id.
    #[must_use]
    pub fn id(&self) -> u8 {
        self.id
    }

    /// `flow_table_lookup`: the highest-priority installed entry satisfied by `packet`, or
    /// `None` if none matches (including the table-miss entry, if one was never installed).
    pub fn lookup(&mut self, packet: &Match) -> Option<EntryId> {
        self.lookup_count += 1;
        let hit = self
            .entries
            .iter()
            .filter(|entry| entry.match_fields.is_satisfied_by(packet))
            .max_by_key(|entry| entry.priority)
            .map(|entry| entry.id);
        if hit.is_some() {
            self.matched_count += 1;
        }
        hit
    }

    /// Look up an entry by identity (not by match), e.g. to bump its counters after a lookup.
    #[must_use]
    pub fn entry(&self, id: EntryId) -> Option<&FlowEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Mutable variant of [`Table::entry`].
    pub fn entry_mut(&mut self, id: EntryId) -> Option<&mut FlowEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    /// `flow_table_flow_mod`: apply one flow-mod command. The caller (the pipeline-level
    /// flow-mod handler) is responsible for instruction canonicalization, action validation and
    /// table-61 LPM validation before calling this — this method trusts `msg.instructions` is
    /// already in canonical execution order.
    pub fn flow_mod(&mut self, msg: &FlowMod) -> TableFlowModResult {
        match msg.command {
            FlowModCommand::Add => {
                let existing = self
                    .entries
                    .iter()
                    .position(|e| e.priority == msg.priority && e.match_fields == msg.match_fields);
                let now = Instant::now();
                let id = existing.map_or_else(EntryId::new, |idx| self.entries[idx].id);
                let new_entry = FlowEntry {
                    id,
                    cookie: msg.cookie,
                    priority: msg.priority,
                    match_fields: msg.match_fields.clone(),
                    instructions: msg.instructions.clone(),
                    idle_timeout: msg.idle_timeout,
                    hard_timeout: msg.hard_timeout,
                    send_flow_rem: msg.flags.send_flow_rem,
                    created_at: now,
                    last_matched_at: now,
                    packet_count: 0,
                    byte_count: 0,
                    sync_master: None,
                    sync_slave: None,
                };
                match existing {
                    Some(idx) => self.entries[idx] = new_entry,
                    None => self.entries.push(new_entry),
                }
                TableFlowModResult::Added(id)
            }
            FlowModCommand::Modify | FlowModCommand::ModifyStrict => {
                let strict = msg.command == FlowModCommand::ModifyStrict;
                let priority = strict.then_some(msg.priority);
                let mut touched = Vec::new();
                for entry in &mut self.entries {
                    if entry_matches_request(entry, &msg.match_fields, priority, strict) {
                        entry.instructions = msg.instructions.clone();
                        if msg.flags.reset_counts {
                            entry.packet_count = 0;
                            entry.byte_count = 0;
                        }
                        touched.push(entry.id);
                    }
                }
                TableFlowModResult::Modified(touched)
            }
            FlowModCommand::Delete | FlowModCommand::DeleteStrict => {
                let strict = msg.command == FlowModCommand::DeleteStrict;
                let priority = strict.then_some(msg.priority);
                let mut removed = Vec::new();
                self.entries.retain(|entry| {
                    let hit = entry_matches_request(entry, &msg.match_fields, priority, strict)
                        && cookie_matches(entry.cookie, msg.cookie, msg.cookie_mask)
                        && out_matches(entry, msg.out_port, msg.out_group);
                    if hit {
                        removed.push(entry.id);
                    }
                    !hit
                });
                TableFlowModResult::Deleted(removed)
            }
        }
    }

    /// `flow_table_timeout`: evict and return the ids of every entry past its idle or hard
    /// timeout as of `now`.
    pub fn timeout(&mut self, now: Instant) -> Vec<EntryId> {
        let mut expired = Vec::new();
        self.entries.retain(|entry| {
            if entry.expired(now) {
                expired.push(entry.id);
                false
            } else {
                true
            }
        });
        expired
    }

    /// `OFPMP_FLOW`: per-entry stats for entries matching `filter`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // duration since entry creation fits u32 seconds for any real uptime
    pub fn stats(&self, filter: &StatsFilter, now: Instant) -> Vec<FlowStats> {
        self.entries
            .iter()
            .filter(|entry| stats_filter_matches(entry, filter))
            .map(|entry| {
                let age = now.duration_since(entry.created_at);
                FlowStats {
                    table_id: self.id,
                    duration_sec: age.as_secs() as u32,
                    duration_nsec: age.subsec_nanos(),
                    priority: entry.priority,
                    idle_timeout: entry.idle_timeout,
                    hard_timeout: entry.hard_timeout,
                    cookie: entry.cookie,
                    packet_count: entry.packet_count,
                    byte_count: entry.byte_count,
                    match_fields: entry.match_fields.clone(),
                    instructions: entry.instructions.clone(),
                }
            })
            .collect()
    }

    /// `OFPMP_AGGREGATE`: summed stats across entries matching `filter`.
    #[must_use]
    pub fn aggregate_stats(&self, filter: &StatsFilter) -> AggregateStats {
        let mut agg = AggregateStats::default();
        for entry in self.entries.iter().filter(|entry| stats_filter_matches(entry, filter)) {
            agg.packet_count += entry.packet_count;
            agg.byte_count += entry.byte_count;
            agg.flow_count += 1;
        }
        agg
    }

    /// `OFPMP_TABLE`: this table's occupancy and lookup/match counters.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // table capacity is bounded well under u32::MAX
    pub fn table_stats(&self) -> TableStats {
        TableStats {
            table_id: self.id,
            active_count: self.entries.len() as u32,
            lookup_count: self.lookup_count,
            matched_count: self.matched_count,
        }
    }

    fn free_percent(&self) -> u8 {
        let max = self.features.max_entries.max(1);
        let used = u32::try_from(self.entries.len()).unwrap_or(u32::MAX).min(max);
        #[allow(clippy::cast_possible_truncation)] // a percentage is always 0..=100
        {
            (((max - used) * 100) / max) as u8
        }
    }

    /// `OFPMP_TABLE_DESC`: current config plus a freshly recomputed vacancy property, if vacancy
    /// thresholds were ever set by an `OFPT_TABLE_MOD`.
    #[must_use]
    pub fn desc(&self) -> wire::multipart::TableDescEntry {
        let mut properties = Vec::new();
        if let Some(state) = &self.vacancy {
            properties.push(TableDescProperty::Vacancy(VacancyProperty {
                vacancy_down: state.request.vacancy_down,
                vacancy_up: state.request.vacancy_up,
                vacancy: self.free_percent(),
            }));
        }
        wire::multipart::TableDescEntry { table_id: self.id, config: self.desc_config, properties }
    }

    /// `OFPT_TABLE_MOD`: overwrite this table's `desc.config`.
    pub fn set_config(&mut self, config: TableConfig) {
        self.desc_config = config;
    }

    /// `OFPTMPT_VACANCY` handling for an `OFPT_TABLE_MOD`: reject inverted thresholds, otherwise
    /// store them and recompute `down_set`.
    pub fn apply_vacancy(&mut self, request: VacancyRequest) -> Result<(), PipelineError> {
        if request.vacancy_down > request.vacancy_up {
            return Err(PipelineError::BadTableFeaturesArgument);
        }
        let down_set = u32::from(self.free_percent()) > u32::from(request.vacancy_up);
        self.vacancy = Some(VacancyState { request, down_set });
        Ok(())
    }

    /// This table's current feature descriptor.
    #[must_use]
    pub fn features(&self) -> &TableFeatures {
        &self.features
    }

    /// `OFPMP_TABLE_FEATURES` reconfiguration: overwrite the whole descriptor.
    pub fn set_features(&mut self, features: TableFeatures) {
        self.features = features;
    }

    /// Snapshot `features.config` into `saved_features.config`, bracketing a multi-message
    /// table-features update so a failure partway through can be rolled back.
    pub fn save_features(&mut self) {
        self.saved_features_config = self.features.config;
    }

    /// Restore `features.config` from the last snapshot.
    pub fn restore_features(&mut self) {
        self.features.config = self.saved_features_config;
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use wire::flow_mod::{FlowModFlags, NO_BUFFER};
    use wire::oxm::OxmField;

    use super::*;

    fn add(table_id: u8, priority: u16, match_fields: Match, instructions: Vec<Instruction>) -> FlowMod {
        FlowMod {
            cookie: 0,
            cookie_mask: 0,
            table_id,
            command: FlowModCommand::Add,
            idle_timeout: 0,
            hard_timeout: 0,
            priority,
            buffer_id: NO_BUFFER,
            out_port: flow_mod::ANY,
            out_group: flow_mod::ANY,
            flags: FlowModFlags::default(),
            match_fields,
            instructions,
        }
    }

    #[test]
    fn lookup_prefers_higher_priority() {
        let mut table = Table::new(0, 1024);
        let low = Match(smallvec::smallvec![OxmField::EthType(0x0800)]);
        table.flow_mod(&add(0, 10, low.clone(), vec![]));
        table.flow_mod(&add(0, 20, low.clone(), vec![]));
        let hit = table.lookup(&low).expect("an entry matches");
        let entry = table.entry(hit).expect("hit id is a live entry");
        assert_eq!(entry.priority, 20);
    }

    #[test]
    fn add_replaces_identical_priority_and_match() {
        let mut table = Table::new(0, 1024);
        let m = Match::any();
        table.flow_mod(&add(0, 0, m.clone(), vec![Instruction::ClearActions]));
        let TableFlowModResult::Added(first_id) = table.flow_mod(&add(0, 0, m.clone(), vec![])) else {
            unreachable!("Add always returns Added")
        };
        assert_eq!(table.entry(first_id).unwrap().instructions, vec![]);
        assert_eq!(table.table_stats().active_count, 1);
    }

    #[test]
    fn table_miss_entry_matches_anything() {
        let mut table = Table::new(0, 1024);
        table.flow_mod(&add(0, 0, Match::any(), vec![]));
        let concrete = Match(smallvec::smallvec![OxmField::InPort(7)]);
        let hit = table.lookup(&concrete).expect("table miss matches any packet");
        assert!(table.entry(hit).unwrap().is_table_miss());
    }

    #[test]
    fn delete_by_cookie_mask_leaves_non_matching_entries() {
        let mut table = Table::new(0, 1024);
        let m = Match::any();
        let mut keep = add(0, 0, m.clone(), vec![]);
        keep.cookie = 2;
        let mut drop_it = add(0, 1, m.clone(), vec![]);
        drop_it.cookie = 1;
        table.flow_mod(&keep);
        table.flow_mod(&drop_it);

        let mut delete = add(0, 0, m, vec![]);
        delete.command = FlowModCommand::Delete;
        delete.cookie = 1;
        delete.cookie_mask = u64::MAX;
        let TableFlowModResult::Deleted(removed) = table.flow_mod(&delete) else {
            unreachable!("Delete always returns Deleted")
        };
        assert_eq!(removed.len(), 1);
        assert_eq!(table.table_stats().active_count, 1);
    }

    #[test]
    fn vacancy_rejects_inverted_thresholds() {
        let mut table = Table::new(0, 1024);
        let err = table.apply_vacancy(VacancyRequest { vacancy_down: 50, vacancy_up: 10 }).unwrap_err();
        assert_eq!(err, PipelineError::BadTableFeaturesArgument);
    }

    #[test]
    fn vacancy_property_reflects_live_occupancy() {
        let mut table = Table::new(0, 100);
        table.apply_vacancy(VacancyRequest { vacancy_down: 10, vacancy_up: 90 }).unwrap();
        for i in 0..25u16 {
            table.flow_mod(&add(0, i + 1, Match(smallvec::smallvec![OxmField::InPort(u32::from(i))]), vec![]));
        }
        let desc = table.desc();
        let Some(TableDescProperty::Vacancy(v)) = desc.properties.first() else {
            unreachable!("vacancy property was installed")
        };
        assert_eq!(v.vacancy, 75);
    }
}

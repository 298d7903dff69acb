// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Multipart stats/features/desc handlers.
//!
//! Byte-level fragment reassembly (pending buffer per remote, keyed by xid) lives in
//! [`crate::remote::Remote::merge_fragment`]. Turning a reassembled body into a decoded
//! [`wire::multipart::MultipartRequest`] is an external collaborator's job; the handlers here
//! start from the already decoded request.

use std::time::Instant;

use config::reserved_tables::ALL_TABLES;
use wire::multipart::{
    AggregateStats, FlowStats, StatsFilter, TableDescEntry, TableFeatures, TableStats, chunk_table_desc,
    chunk_table_features,
};

use crate::error::PipelineError;
use crate::pipeline::Pipeline;

fn table_range(pipeline: &Pipeline, table_id: u8) -> Result<std::ops::Range<usize>, PipelineError> {
    let table_count = pipeline.tables().len();
    if table_id == ALL_TABLES {
        Ok(0..table_count)
    } else {
        let id = usize::from(table_id);
        if id >= table_count {
            return Err(PipelineError::BadTableId(table_id));
        }
        Ok(id..id + 1)
    }
}

/// `OFPMP_FLOW`: per-entry stats for one table, or every table when `filter.table_id == 0xff`.
///
/// # Errors
///
/// [`PipelineError::BadTableId`] if `filter.table_id` names a table outside the pipeline.
pub fn stats_request_flow(pipeline: &Pipeline, filter: &StatsFilter, now: Instant) -> Result<Vec<FlowStats>, PipelineError> {
    let range = table_range(pipeline, filter.table_id)?;
    Ok(pipeline.tables()[range].iter().flat_map(|table| table.stats(filter, now)).collect())
}

/// `OFPMP_AGGREGATE`: summed stats for one table, or every table when `filter.table_id == 0xff`.
///
/// # Errors
///
/// [`PipelineError::BadTableId`] if `filter.table_id` names a table outside the pipeline.
pub fn stats_request_aggregate(pipeline: &Pipeline, filter: &StatsFilter) -> Result<AggregateStats, PipelineError> {
    let range = table_range(pipeline, filter.table_id)?;
    let mut total = AggregateStats::default();
    for table in &pipeline.tables()[range] {
        let partial = table.aggregate_stats(filter);
        total.packet_count += partial.packet_count;
        total.byte_count += partial.byte_count;
        total.flow_count += partial.flow_count;
    }
    Ok(total)
}

/// `OFPMP_TABLE`: per-table occupancy/lookup counters for every table in one reply.
#[must_use]
pub fn stats_request_table(pipeline: &Pipeline) -> Vec<TableStats> {
    pipeline.tables().iter().map(super::table::Table::table_stats).collect()
}

/// `OFPMP_TABLE_FEATURES`: if `entries` is `Some` (a reconfiguration, not a bare query),
/// overwrite each named table's feature descriptor.
///
/// # Errors
///
/// [`PipelineError::BadTableId`] if an entry names a table outside the pipeline.
pub fn handle_table_features_request(pipeline: &mut Pipeline, entries: Option<Vec<TableFeatures>>) -> Result<(), PipelineError> {
    let Some(entries) = entries else {
        return Ok(());
    };
    for features in entries {
        let id = usize::from(features.table_id);
        let Some(table) = pipeline.tables_mut().get_mut(id) else {
            return Err(PipelineError::BadTableId(features.table_id));
        };
        table.set_features(features);
    }
    Ok(())
}

/// `OFPMP_TABLE_FEATURES` reply: the current feature descriptor for every table, chunked 8 to a
/// wire part.
#[must_use]
pub fn table_features_reply_chunks(pipeline: &Pipeline) -> Vec<Vec<TableFeatures>> {
    let all: Vec<TableFeatures> = pipeline.tables().iter().map(|t| t.features().clone()).collect();
    chunk_table_features(&all)
}

/// `OFPMP_TABLE_DESC` reply: every table's current config and recomputed vacancy property,
/// chunked 16 to a wire part.
#[must_use]
pub fn table_desc_reply_chunks(pipeline: &Pipeline) -> Vec<Vec<TableDescEntry>> {
    let all: Vec<TableDescEntry> = pipeline.tables().iter().map(super::table::Table::desc).collect();
    chunk_table_desc(&all)
}

/// Bracket a multi-message table-features update: snapshot `features.config` into
/// `saved_features.config` for every table.
pub fn save_table_features(pipeline: &mut Pipeline) {
    for table in pipeline.tables_mut() {
        table.save_features();
    }
}

/// Restore `features.config` from the last [`save_table_features`] snapshot for every table,
/// rolling back a failed multi-message update.
pub fn restore_table_features(pipeline: &mut Pipeline) {
    for table in pipeline.tables_mut() {
        table.restore_features();
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use wire::flow_mod::{self as fm, FlowMod, FlowModCommand, FlowModFlags, NO_BUFFER};
    use wire::oxm::Match;

    use super::*;
    use crate::sync_links::SyncLinks;
    use crate::table::Table;

    fn pipeline_with(tables: u8) -> Pipeline {
        let config = config::DatapathConfigBuilder::default().pipeline_tables(tables).build().unwrap();
        Pipeline::from_parts((0..tables).map(|id| Table::new(id, 1024)).collect(), SyncLinks::new(), config)
    }

    fn filter(table_id: u8) -> StatsFilter {
        StatsFilter {
            table_id,
            out_port: fm::ANY,
            out_group: fm::ANY,
            cookie: 0,
            cookie_mask: 0,
            match_fields: Match::any(),
        }
    }

    fn add(table_id: u8) -> FlowMod {
        FlowMod {
            cookie: 7,
            cookie_mask: 0,
            table_id,
            command: FlowModCommand::Add,
            idle_timeout: 0,
            hard_timeout: 0,
            priority: 0,
            buffer_id: NO_BUFFER,
            out_port: fm::ANY,
            out_group: fm::ANY,
            flags: FlowModFlags::default(),
            match_fields: Match::any(),
            instructions: vec![],
        }
    }

    #[test]
    fn flow_stats_all_tables_aggregates_every_entry() {
        let mut pipeline = pipeline_with(64);
        pipeline.tables_mut()[0].flow_mod(&add(0));
        pipeline.tables_mut()[3].flow_mod(&add(3));
        let stats = stats_request_flow(&pipeline, &filter(ALL_TABLES), Instant::now()).unwrap();
        assert_eq!(stats.len(), 2);
    }

    #[test]
    fn flow_stats_rejects_out_of_range_table() {
        let pipeline = pipeline_with(64);
        let err = stats_request_flow(&pipeline, &filter(200), Instant::now()).unwrap_err();
        assert_eq!(err, PipelineError::BadTableId(200));
    }

    #[test]
    fn aggregate_stats_sums_across_tables() {
        let mut pipeline = pipeline_with(64);
        pipeline.tables_mut()[0].flow_mod(&add(0));
        pipeline.tables_mut()[1].flow_mod(&add(1));
        let agg = stats_request_aggregate(&pipeline, &filter(ALL_TABLES)).unwrap();
        assert_eq!(agg.flow_count, 2);
    }

    #[test]
    fn table_features_reply_covers_every_table_in_chunks_of_eight() {
        let pipeline = pipeline_with(64);
        let chunks = table_features_reply_chunks(&pipeline);
        assert_eq!(chunks.len(), 8);
        assert_eq!(chunks.iter().map(Vec::len).sum::<usize>(), 64);
    }

    #[test]
    fn table_desc_reply_covers_every_table_in_chunks_of_sixteen() {
        let pipeline = pipeline_with(64);
        let chunks = table_desc_reply_chunks(&pipeline);
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks.iter().map(Vec::len).sum::<usize>(), 64);
    }

    #[test]
    fn table_features_request_reconfigures_named_tables() {
        let mut pipeline = pipeline_with(64);
        let mut features = pipeline.tables()[2].features().clone();
        features.name = "renamed".to_string();
        handle_table_features_request(&mut pipeline, Some(vec![features])).unwrap();
        assert_eq!(pipeline.tables()[2].features().name, "renamed");
    }

    #[test]
    fn table_features_query_with_no_body_is_a_noop() {
        let mut pipeline = pipeline_with(64);
        handle_table_features_request(&mut pipeline, None).unwrap();
        assert_eq!(pipeline.tables()[0].features().name, "table-0");
    }

    #[test]
    fn save_then_restore_reverts_config_change() {
        let mut pipeline = pipeline_with(64);
        save_table_features(&mut pipeline);
        let mut features = pipeline.tables()[0].features().clone();
        features.max_entries = 42;
        handle_table_features_request(&mut pipeline, Some(vec![features])).unwrap();
        restore_table_features(&mut pipeline);
        assert_eq!(pipeline.tables()[0].features().config, wire::table_mod::TableConfig::default());
    }
}

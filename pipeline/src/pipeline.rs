// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The pipeline: an ordered array of flow tables plus the cross-table bookkeeping and config
//! every protocol handler needs.

use std::time::Instant;

use config::DatapathConfig;
use config::reserved_tables::{ETH_MIRROR_DST, ETH_MIRROR_SRC};

use crate::sync_links::{EntryId, SyncLinks};
use crate::table::Table;

/// `pipeline_tables` must be a multiple of 8 so that `OFPMP_TABLE_FEATURES`/`OFPMP_TABLE_DESC`
/// replies, which are chunked 8 (features) or 16 (desc) tables at a time, always frame on a
/// boundary.
const TABLE_COUNT_GRANULARITY: u8 = 8;

/// Reasons [`Pipeline::new`] rejects a [`DatapathConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PipelineBuildError {
    /// `pipeline_tables` was not a multiple of 8, or was below the 64-table floor.
    #[error("pipeline_tables ({0}) must be a multiple of {TABLE_COUNT_GRANULARITY} and at least 64")]
    BadTableCount(u8),
}

/// The pipeline: a fixed array of [`Table`]s, the table-62/63 mirror cross-link side table, and
/// the process-wide [`DatapathConfig`] every handler consults.
///
/// Everything outside its own tables is reached through a back-reference to the enclosing
/// datapath: that collaborator is [`crate::host::Datapath`], passed in by the caller of
/// [`crate::driver::process_packet`] rather than stored here, so `Pipeline` itself stays free of
/// any particular transport or buffer-pool implementation.
pub struct Pipeline {
    tables: Vec<Table>,
    links: SyncLinks,
    config: DatapathConfig,
}

impl Pipeline {
    /// Build a pipeline with one freshly-created [`Table`] per `config.pipeline_tables`, each
    /// sized to `config.flow_table_max_entries`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineBuildError::BadTableCount`] if `pipeline_tables` is not a multiple of 8
    /// or is below 64.
    pub fn new(config: DatapathConfig) -> Result<Self, PipelineBuildError> {
        if config.pipeline_tables < 64 || config.pipeline_tables % TABLE_COUNT_GRANULARITY != 0 {
            return Err(PipelineBuildError::BadTableCount(config.pipeline_tables));
        }
        let tables = (0..config.pipeline_tables).map(|id| Table::new(id, config.flow_table_max_entries)).collect();
        Ok(Self { tables, links: SyncLinks::new(), config })
    }

    /// Assemble a pipeline from already-built parts, bypassing the table-count validation in
    /// [`Pipeline::new`]. Exists for tests that want a small table count to exercise
    /// goto-table-out-of-range handling without building 64 tables.
    #[must_use]
    pub fn from_parts(tables: Vec<Table>, links: SyncLinks, config: DatapathConfig) -> Self {
        Self { tables, links, config }
    }

    /// This pipeline's datapath-wide configuration.
    #[must_use]
    pub fn config(&self) -> &DatapathConfig {
        &self.config
    }

    /// Mutably access the datapath-wide configuration (`OFPT_SET_CONFIG`).
    pub fn config_mut(&mut self) -> &mut DatapathConfig {
        &mut self.config
    }

    /// The pipeline's tables, in table-id order.
    #[must_use]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Mutably access the pipeline's tables.
    pub fn tables_mut(&mut self) -> &mut [Table] {
        &mut self.tables
    }

    /// The table 62/63 mirror cross-link side table.
    #[must_use]
    pub fn links(&self) -> &SyncLinks {
        &self.links
    }

    /// Mutably access the table 62/63 mirror cross-link side table.
    pub fn links_mut(&mut self) -> &mut SyncLinks {
        &mut self.links
    }

    /// Evict every expired entry across every table, returning the ids removed.
    ///
    /// The eviction *scan* schedule is left to the caller (a real deployment runs this from a
    /// periodic housekeeping task, out of scope here); this only runs one scan.
    pub fn timeout(&mut self, now: Instant) -> Vec<EntryId> {
        let expired: Vec<EntryId> = self.tables.iter_mut().flat_map(|table| table.timeout(now)).collect();
        for id in &expired {
            self.clear_sync_link(*id);
        }
        expired
    }

    /// Clear the table-62/63 mirror cross-link for a just-deleted or -evicted entry, if it had
    /// one: removes the bidirectional [`SyncLinks`] record and clears the surviving partner's
    /// `sync_master`/`sync_slave` field so it doesn't keep pointing at a now-dead entry.
    pub fn clear_sync_link(&mut self, id: EntryId) {
        let Some(partner) = self.links.unlink(id) else { return };
        for table_id in [ETH_MIRROR_SRC, ETH_MIRROR_DST] {
            let Some(table) = self.tables.get_mut(usize::from(table_id)) else { continue };
            let Some(entry) = table.entry_mut(partner) else { continue };
            if entry.sync_master == Some(id) {
                entry.sync_master = None;
            }
            if entry.sync_slave == Some(id) {
                entry.sync_slave = None;
            }
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn new_rejects_table_count_not_multiple_of_eight() {
        let config = config::DatapathConfigBuilder::default().pipeline_tables(70).build().unwrap();
        let err = Pipeline::new(config).unwrap_err();
        assert_eq!(err, PipelineBuildError::BadTableCount(70));
    }

    #[test]
    fn new_rejects_table_count_below_floor() {
        let config = config::DatapathConfigBuilder::default().pipeline_tables(8).build().unwrap();
        let err = Pipeline::new(config).unwrap_err();
        assert_eq!(err, PipelineBuildError::BadTableCount(8));
    }

    #[test]
    fn new_accepts_default_table_count() {
        let pipeline = Pipeline::new(config::DatapathConfig::default()).unwrap();
        assert_eq!(pipeline.tables().len(), usize::from(config::DEFAULT_PIPELINE_TABLES));
    }
}

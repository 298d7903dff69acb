// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `OFPT_TABLE_MOD` handling: vacancy thresholds and `desc.config`.

use config::reserved_tables::ALL_TABLES;
use wire::table_mod::{TableMod, TableModProperty};

use crate::error::PipelineError;
use crate::pipeline::Pipeline;
use crate::remote::Remote;

/// Apply a table-mod request to one table, or to every table when `table_id == 0xff`.
///
/// A single-table request computes an exclusive `table_id + 1` upper bound rather than
/// `table_id`, so that the single table actually gets touched instead of the range being empty.
///
/// # Errors
///
/// [`PipelineError::IsSlave`] on a slave connection, [`PipelineError::BadTableId`] if `table_id`
/// is out of range, or [`PipelineError::BadTableFeaturesArgument`] if a `VACANCY` property
/// carries inverted thresholds.
pub fn handle_table_mod(pipeline: &mut Pipeline, remote: &Remote, msg: &TableMod) -> Result<(), PipelineError> {
    remote.require_not_slave()?;

    let table_count = pipeline.tables().len();
    let (start, stop) = if msg.table_id == ALL_TABLES {
        (0usize, table_count)
    } else {
        let id = usize::from(msg.table_id);
        if id >= table_count {
            return Err(PipelineError::BadTableId(msg.table_id));
        }
        (id, id + 1)
    };

    for table in &mut pipeline.tables_mut()[start..stop] {
        for property in &msg.properties {
            let TableModProperty::Vacancy(request) = property;
            table.apply_vacancy(*request)?;
        }
        table.set_config(msg.config);
    }
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use wire::multipart::TableDescProperty;
    use wire::table_mod::{TableConfig, VacancyRequest};

    use super::*;
    use crate::sync_links::SyncLinks;
    use crate::table::Table;

    fn pipeline_with(tables: u8) -> Pipeline {
        let config = config::DatapathConfigBuilder::default().pipeline_tables(tables).build().unwrap();
        Pipeline::from_parts((0..tables).map(|id| Table::new(id, 1024)).collect(), SyncLinks::new(), config)
    }

    fn vacancy_mod(table_id: u8) -> TableMod {
        TableMod {
            table_id,
            config: TableConfig::default(),
            properties: vec![TableModProperty::Vacancy(VacancyRequest { vacancy_down: 10, vacancy_up: 90 })],
        }
    }

    #[test]
    fn single_table_request_only_touches_that_table() {
        let mut pipeline = pipeline_with(64);
        let remote = Remote::new();
        handle_table_mod(&mut pipeline, &remote, &vacancy_mod(5)).unwrap();

        assert!(matches!(pipeline.tables()[5].desc().properties.first(), Some(TableDescProperty::Vacancy(_))));
        assert!(pipeline.tables()[4].desc().properties.is_empty());
        assert!(pipeline.tables()[6].desc().properties.is_empty());
    }

    #[test]
    fn all_tables_sentinel_applies_everywhere() {
        let mut pipeline = pipeline_with(64);
        let remote = Remote::new();
        handle_table_mod(&mut pipeline, &remote, &vacancy_mod(ALL_TABLES)).unwrap();

        for table in pipeline.tables() {
            assert!(matches!(table.desc().properties.first(), Some(TableDescProperty::Vacancy(_))));
        }
    }

    #[test]
    fn out_of_range_table_id_is_rejected() {
        let mut pipeline = pipeline_with(64);
        let remote = Remote::new();
        let err = handle_table_mod(&mut pipeline, &remote, &vacancy_mod(200)).unwrap_err();
        assert_eq!(err, PipelineError::BadTableId(200));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let mut pipeline = pipeline_with(64);
        let remote = Remote::new();
        let msg = TableMod {
            table_id: 0,
            config: TableConfig::default(),
            properties: vec![TableModProperty::Vacancy(VacancyRequest { vacancy_down: 90, vacancy_up: 10 })],
        };
        let err = handle_table_mod(&mut pipeline, &remote, &msg).unwrap_err();
        assert_eq!(err, PipelineError::BadTableFeaturesArgument);
    }

    #[test]
    fn slave_connection_is_rejected() {
        let mut pipeline = pipeline_with(64);
        let mut remote = Remote::new();
        remote.role = crate::remote::Role::Slave;
        let err = handle_table_mod(&mut pipeline, &remote, &vacancy_mod(0)).unwrap_err();
        assert_eq!(err, PipelineError::IsSlave);
    }
}

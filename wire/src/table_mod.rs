// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `OFPT_TABLE_MOD` message body.

/// `ofp_table_config`: whether a table continues matching into its own entries on a miss, or is
/// administratively disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableConfig {
    /// `OFPTC_TABLE_MISS_CONTROLLER`-equivalent default for this implementation: a table miss is
    /// a hard drop; there is no per-table controller-punt fallback here.
    #[default]
    Deprecated,
}

/// `OFPTMPT_VACANCY`: ask the table to emit `OFPMP_TABLE_DESC` whenever the fraction of free
/// entries crosses either threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VacancyRequest {
    /// Emit a vacancy event when free entries fall to or below this percentage.
    pub vacancy_down: u8,
    /// Emit a vacancy event when free entries rise to or above this percentage.
    pub vacancy_up: u8,
}

/// A property attached to an `OFPT_TABLE_MOD` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableModProperty {
    /// `OFPTMPT_VACANCY`.
    Vacancy(VacancyRequest),
}

/// A decoded `OFPT_TABLE_MOD` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMod {
    /// Target table id, or `0xff` meaning every table.
    pub table_id: u8,
    /// New table configuration.
    pub config: TableConfig,
    /// Properties attached to this request, currently only ever a single `Vacancy`.
    pub properties: Vec<TableModProperty>,
}

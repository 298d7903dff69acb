// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Datapath-wide configuration for the OpenFlow pipeline.
//!
//! This crate is intentionally small: it holds the handful of values the switch config channel
//! (`OFPT_SET_CONFIG`/`OFPT_FEATURES_REPLY`) and the pipeline's own bring-up need before a single
//! packet can be processed, and nothing about any one flow table's contents.

use derive_builder::Builder;
use tracectl::trace_target;
use tracing::LevelFilter;

trace_target!(LevelFilter::INFO, &["config"]);

/// The number of flow tables this pipeline is built with.
///
/// Must be a multiple of 8 and at least 64, so the features/desc multipart replies (chunked 8 or
/// 16 tables at a time) frame correctly; the pipeline crate's own constructor rejects anything
/// else. This is a plain field rather than a type parameter on the pipeline struct because
/// nothing about the driver's control flow depends on the table count at compile time.
pub const DEFAULT_PIPELINE_TABLES: u8 = 64;

/// Table IDs with pipeline-reserved semantics.
pub mod reserved_tables {
    /// Reserved for IPv4 destination-address longest-prefix-match entries.
    pub const IPV4_LPM: u8 = 61;
    /// Reserved for the ETH_SRC half of the table 62/63 mirror pair.
    pub const ETH_MIRROR_SRC: u8 = 62;
    /// Reserved for the ETH_DST half of the table 62/63 mirror pair.
    pub const ETH_MIRROR_DST: u8 = 63;
    /// Sentinel meaning "all tables" in `OFPT_TABLE_MOD` and flow-mod delete requests.
    pub const ALL_TABLES: u8 = 0xff;
}

/// What a table-miss (or an explicit `OFPCML_*`) send-to-controller should truncate a packet to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissSendLen {
    /// Send at most this many bytes of the packet to the controller, buffering the rest.
    Controller(u16),
    /// Send the entire packet; do not buffer it in the datapath's packet pool.
    NoBuffer,
}

impl MissSendLen {
    /// The wire sentinel (`OFPCML_NO_BUFFER`, `0xffff`) used by `OFPT_SET_CONFIG`.
    pub const NO_BUFFER_WIRE: u16 = 0xffff;

    /// Decode the wire value of `miss_send_len` from an `OFPT_SET_CONFIG`/`OFPT_FEATURES_REPLY`.
    #[must_use]
    pub fn from_wire(value: u16) -> Self {
        if value == Self::NO_BUFFER_WIRE {
            MissSendLen::NoBuffer
        } else {
            MissSendLen::Controller(value)
        }
    }

    /// Re-encode to the wire sentinel representation.
    #[must_use]
    pub fn to_wire(self) -> u16 {
        match self {
            MissSendLen::Controller(n) => n,
            MissSendLen::NoBuffer => Self::NO_BUFFER_WIRE,
        }
    }
}

impl Default for MissSendLen {
    fn default() -> Self {
        // matches the OpenFlow 1.3 default of 128 octets
        MissSendLen::Controller(128)
    }
}

/// Errors raised while building or validating a [`DatapathConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `pipeline_tables` must be non-zero and must not exceed [`reserved_tables::ALL_TABLES`].
    #[error("pipeline_tables must be in 1..=254, got {0}")]
    InvalidTableCount(u16),
    /// `flow_table_max_entries` of zero would make every flow-mod insert fail.
    #[error("flow_table_max_entries must be greater than zero")]
    ZeroCapacity,
    /// The builder was asked to finish without setting a required field.
    #[error("incomplete configuration: {0}")]
    Incomplete(String),
}

impl From<derive_builder::UninitializedFieldError> for ConfigError {
    fn from(err: derive_builder::UninitializedFieldError) -> Self {
        ConfigError::Incomplete(err.to_string())
    }
}

/// Process-wide configuration for a pipeline instance.
///
/// Constructed through [`DatapathConfigBuilder`] so that invalid combinations (zero tables, zero
/// capacity) are rejected at construction rather than discovered the first time a flow-mod or
/// multipart request touches an out-of-range table.
#[derive(Debug, Clone, Builder, PartialEq, Eq)]
#[builder(build_fn(validate = "Self::validate", error = "ConfigError"))]
pub struct DatapathConfig {
    /// Number of flow tables, `1..=254`. See [`DEFAULT_PIPELINE_TABLES`].
    #[builder(default = "DEFAULT_PIPELINE_TABLES")]
    pub pipeline_tables: u8,
    /// Mirrors `OFPC_INVALID_TTL_TO_CONTROLLER`: when set, a TTL-expired packet that would
    /// otherwise just be dropped by an action is instead sent to the controller.
    #[builder(default = "false")]
    pub invalid_ttl_to_controller: bool,
    /// How much of a packet to forward to the controller on table-miss or explicit punt.
    #[builder(default)]
    pub miss_send_len: MissSendLen,
    /// Soft capacity used for the vacancy-percentage calculation. This is a per-table default;
    /// an individual table's `OFPT_TABLE_MOD` vacancy thresholds still override it once set.
    #[builder(default = "65536")]
    pub flow_table_max_entries: u32,
}

impl DatapathConfigBuilder {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(tables) = self.pipeline_tables
            && tables == 0
        {
            return Err(ConfigError::InvalidTableCount(0));
        }
        if let Some(0) = self.flow_table_max_entries {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }
}

impl Default for DatapathConfig {
    fn default() -> Self {
        #[allow(clippy::expect_used)] // the default builder values are always valid
        DatapathConfigBuilder::default()
            .build()
            .expect("default DatapathConfig must validate")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_is_valid() {
        let cfg = DatapathConfig::default();
        assert_eq!(cfg.pipeline_tables, DEFAULT_PIPELINE_TABLES);
        assert_eq!(cfg.miss_send_len, MissSendLen::Controller(128));
    }

    #[test]
    fn rejects_zero_tables() {
        let err = DatapathConfigBuilder::default()
            .pipeline_tables(0)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidTableCount(0));
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = DatapathConfigBuilder::default()
            .flow_table_max_entries(0)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::ZeroCapacity);
    }

    #[test]
    fn miss_send_len_wire_roundtrip() {
        assert_eq!(
            MissSendLen::from_wire(MissSendLen::NO_BUFFER_WIRE),
            MissSendLen::NoBuffer
        );
        assert_eq!(MissSendLen::NoBuffer.to_wire(), MissSendLen::NO_BUFFER_WIRE);
        assert_eq!(MissSendLen::from_wire(64), MissSendLen::Controller(64));
        assert_eq!(MissSendLen::Controller(64).to_wire(), 64);
    }
}

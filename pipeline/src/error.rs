// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Errors the pipeline driver and its handlers can raise.

use wire::error::OflError;

/// Failure to execute a flow-mod, table-mod, or multipart request.
///
/// Every variant here maps to an [`OflError`] the caller sends back to the controller as
/// `OFPT_ERROR`; this type exists separately so internal callers (tests, the driver itself) can
/// match on the condition without going through the wire-level `(type, code)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// The request named a table id outside `0..pipeline_tables` and it wasn't the legal `0xff`
    /// "all tables" sentinel for this request kind.
    #[error("table id {0} is out of range")]
    BadTableId(u8),
    /// A write request (flow-mod, table-mod, table-features reconfiguration) arrived on a
    /// connection in the `Slave` role.
    #[error("request rejected: controller is in the slave role")]
    IsSlave,
    /// A table-61 entry's IPv4 destination mask was not a contiguous run of leading ones.
    #[error("bad netmask for table 61 LPM entry")]
    BadNwAddrMask,
    /// A table-61 entry's priority did not equal the prefix length implied by its mask, or a
    /// table 62/63 entry did not use priority `0`.
    #[error("bad priority for reserved table entry")]
    BadPriority,
    /// The (external) action/instruction validator rejected this entry's instruction list.
    #[error("instruction set rejected by validator")]
    BadInstruction,
    /// A fragmented multipart request's continuation part arrived with a different `xid` than
    /// the one that opened the exchange, or reassembly exceeded the configured bound.
    #[error("multipart reassembly buffer overflow")]
    MultipartBufferOverflow,
    /// A table-features request referenced a property or table id this implementation does not
    /// accept.
    #[error("bad table-features argument")]
    BadTableFeaturesArgument,
}

impl From<PipelineError> for OflError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::BadTableId(_) => OflError::FlowModFailedBadTableId,
            PipelineError::IsSlave => OflError::BadRequestIsSlave,
            PipelineError::BadNwAddrMask => OflError::BadMatchBadNwAddrMask,
            PipelineError::BadPriority => OflError::FlowModFailedBadPriority,
            PipelineError::BadInstruction => OflError::FlowModFailedBadInstruction,
            PipelineError::MultipartBufferOverflow => OflError::BadRequestMultipartBufferOverflow,
            PipelineError::BadTableFeaturesArgument => OflError::TableFeaturesFailedBadArgument,
        }
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `ofp_action_header` variants a flow-mod's instruction lists may carry.
//!
//! Action *validation* (are these actions legal together, do output ports exist) is an external
//! collaborator; this module only carries the decoded action itself so the instruction executor
//! has something concrete to apply.

/// Sentinel output port meaning "send back out the port the packet arrived on."
pub const PORT_IN_PORT: u32 = 0xffff_fff8;
/// Sentinel output port meaning "submit to the controller."
pub const PORT_CONTROLLER: u32 = 0xffff_fffd;
/// Sentinel output port meaning "process through the normal L2/L3 forwarding pipeline."
pub const PORT_NORMAL: u32 = 0xffff_fffa;
/// Sentinel output port meaning "all ports except the input port."
pub const PORT_ALL: u32 = 0xffff_fffb;

/// A single decoded OpenFlow action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send the packet out a port (or to a reserved port such as [`PORT_CONTROLLER`]).
    Output {
        /// Destination port, or a `PORT_*` sentinel.
        port: u32,
        /// For `PORT_CONTROLLER`: how many bytes of the packet to forward; `None` means "all".
        max_len: Option<u16>,
    },
    /// Overwrite one match field on the packet (`OFPAT_SET_FIELD`).
    SetField(crate::oxm::OxmField),
    /// Push a VLAN header with the given TPID.
    PushVlan(u16),
    /// Pop the outermost VLAN header.
    PopVlan,
    /// Decrement the IP TTL / hop limit by one.
    DecNwTtl,
    /// Forward to a group table entry (out of scope to execute; carried for fidelity).
    Group(u32),
    /// Vendor/experimenter-defined action, carried opaquely.
    Experimenter {
        /// Experimenter (vendor) id.
        experimenter: u32,
        /// Opaque experimenter-defined payload.
        data: Vec<u8>,
    },
}

// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `OFPT_FLOW_MOD` handling: role check, instruction canonicalization, action validation,
//! table-61 LPM validation, dispatch, table-62/63 mirroring, and buffered-packet replay.

use config::reserved_tables::{ALL_TABLES, ETH_MIRROR_DST, ETH_MIRROR_SRC, IPV4_LPM};
use net::buffer::PacketBufferMut;
use tracectl::{tdebug, trace_target};
use tracing::LevelFilter;
use wire::action::Action;
use wire::flow_mod::{FlowMod, FlowModCommand};
use wire::instruction::Instruction;
use wire::oxm::{self, OxmField};

use crate::driver::process_packet;
use crate::error::PipelineError;
use crate::host::Datapath;
use crate::packet::PacketContext;
use crate::pipeline::Pipeline;
use crate::remote::Remote;
use crate::table::TableFlowModResult;

trace_target!(LevelFilter::INFO, &["pipeline"]);

/// Install, modify, or delete flow entries per `msg`.
///
/// # Errors
///
/// [`PipelineError::IsSlave`] on a slave connection, [`PipelineError::BadInstruction`] if action
/// validation rejects an instruction, [`PipelineError::BadNwAddrMask`]/[`PipelineError::BadPriority`]
/// on a malformed table-61 LPM entry, and [`PipelineError::BadTableId`] on an out-of-range or
/// illegally-`0xff` table id.
pub fn handle_flow_mod<Buf: PacketBufferMut>(
    pipeline: &mut Pipeline,
    remote: &Remote,
    datapath: &mut impl Datapath<Buf>,
    mut msg: FlowMod,
) -> Result<(), PipelineError> {
    remote.require_not_slave()?;

    msg.instructions.sort_by_key(Instruction::execution_rank);

    for inst in &msg.instructions {
        if let Instruction::ApplyActions(actions) | Instruction::WriteActions(actions) = inst {
            datapath.validate_actions(actions)?;
        }
    }

    if msg.command == FlowModCommand::Add && msg.table_id == IPV4_LPM {
        validate_lpm_entry(&msg)?;
    }

    let buffer_id = msg.buffer_id;
    let command = msg.command;
    let table_id = msg.table_id;

    if table_id == ALL_TABLES {
        if !matches!(command, FlowModCommand::Delete | FlowModCommand::DeleteStrict) {
            return Err(PipelineError::BadTableId(table_id));
        }
        let table_count = pipeline.tables().len();
        let mut deleted = Vec::new();
        for idx in 0..table_count {
            if let TableFlowModResult::Deleted(ids) = pipeline.tables_mut()[idx].flow_mod(&msg) {
                deleted.extend(ids);
            }
        }
        for id in deleted {
            pipeline.clear_sync_link(id);
        }
    } else {
        let table_count = pipeline.tables().len();
        if usize::from(table_id) >= table_count {
            return Err(PipelineError::BadTableId(table_id));
        }
        let result = pipeline.tables_mut()[usize::from(table_id)].flow_mod(&msg);
        match result {
            TableFlowModResult::Added(master_id) if table_id == ETH_MIRROR_SRC && command == FlowModCommand::Add => {
                mirror_into_table_63(pipeline, &msg, master_id);
            }
            TableFlowModResult::Deleted(ids) => {
                for id in ids {
                    pipeline.clear_sync_link(id);
                }
            }
            _ => {}
        }
    }

    if matches!(command, FlowModCommand::Add | FlowModCommand::Modify | FlowModCommand::ModifyStrict)
        && buffer_id != wire::flow_mod::NO_BUFFER
    {
        replay_buffered_packet(pipeline, datapath, buffer_id, &msg.match_fields);
    }

    Ok(())
}

/// `IPV4_DST_W` requires a contiguous mask with `priority == prefix_len`; exact `IPV4_DST`
/// requires `priority == 32`.
fn validate_lpm_entry(msg: &FlowMod) -> Result<(), PipelineError> {
    let Some(field) = msg.match_fields.find(oxm::field_code::IPV4_DST).copied() else {
        return Ok(());
    };
    let OxmField::Ipv4Dst(_, mask) = field else {
        return Ok(());
    };
    match mask {
        Some(mask) => {
            let prefix_len = oxm::mask_prefix_len(mask).ok_or(PipelineError::BadNwAddrMask)?;
            if msg.priority != u16::from(prefix_len) {
                return Err(PipelineError::BadPriority);
            }
        }
        None => {
            if msg.priority != 32 {
                return Err(PipelineError::BadPriority);
            }
        }
    }
    Ok(())
}

/// Clone `msg` into table 63 with every `ETH_SRC`/`ETH_DST` swapped, link the two entries'
/// `sync_master`/`sync_slave`, and suppress any mirror-install failure.
fn mirror_into_table_63(pipeline: &mut Pipeline, msg: &FlowMod, master_id: crate::sync_links::EntryId) {
    let mut mirror = msg.clone();
    mirror.table_id = ETH_MIRROR_DST;
    for field in &mut mirror.match_fields.0 {
        *field = match *field {
            OxmField::EthSrc(addr, mask) => OxmField::EthDst(addr, mask),
            OxmField::EthDst(addr, mask) => OxmField::EthSrc(addr, mask),
            other => other,
        };
    }

    let TableFlowModResult::Added(slave_id) = pipeline.tables_mut()[usize::from(ETH_MIRROR_DST)].flow_mod(&mirror)
    else {
        tdebug!("table 62/63 mirror install did not add an entry");
        return;
    };

    if let Some(master) = pipeline.tables_mut()[usize::from(ETH_MIRROR_SRC)].entry_mut(master_id) {
        master.sync_slave = Some(slave_id);
    }
    if let Some(slave) = pipeline.tables_mut()[usize::from(ETH_MIRROR_DST)].entry_mut(slave_id) {
        slave.sync_master = Some(master_id);
    }
    pipeline.links_mut().link(master_id, slave_id);
}

/// Re-run a previously-buffered packet now that the rule that requested its replay is installed.
/// A missing buffer is logged, not failed.
///
/// The replayed packet's match fields are approximated from the installing flow-mod's own match
/// rather than re-derived from the raw buffer, since header (re-)parsing is out of this crate's
/// scope; see `DESIGN.md`.
fn replay_buffered_packet<Buf: PacketBufferMut>(
    pipeline: &mut Pipeline,
    datapath: &mut impl Datapath<Buf>,
    buffer_id: u32,
    match_fields: &oxm::Match,
) {
    let Some(buffer) = datapath.retrieve_buffer(buffer_id) else {
        tdebug!(buffer_id, "buffered packet replay requested but buffer was already gone");
        return;
    };
    let pkt = PacketContext::new(buffer, match_fields.clone());
    process_packet(pipeline, datapath, pkt);
}

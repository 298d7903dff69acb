// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The packet-processing driver: one packet's walk through the flow tables.

use tracectl::{terror, trace_target};
use tracing::LevelFilter;

use net::buffer::PacketBufferMut;
use wire::instruction::Instruction;
use wire::packet_in::{self, PacketInReason};

use crate::host::{Datapath, Disposition, send_packet_in};
use crate::packet::PacketContext;
use crate::pipeline::Pipeline;

trace_target!(LevelFilter::INFO, &["pipeline"]);

/// Run `pkt` through `pipeline` starting at table 0, dispatching every instruction it collects
/// along the way to `datapath`.
///
/// Entry points and exits:
/// - A TTL-expired packet either hard-drops or is punted with [`PacketInReason::InvalidTtl`],
///   depending on `invalid_ttl_to_controller`, and never reaches table 0.
/// - A table miss with no table-miss entry installed hard-drops with no `PACKET_IN` at all.
/// - `OFPIT_GOTO_TABLE` must always name a later table; a target out of range is a pipeline bug,
///   logged and treated as a drop rather than a panic.
/// - Falling off the end of the last table drains and executes the accumulated action set.
pub fn process_packet<Buf: PacketBufferMut>(
    pipeline: &mut Pipeline,
    datapath: &mut impl Datapath<Buf>,
    mut pkt: PacketContext<Buf>,
) {
    if pkt.ttl_expired() {
        if pipeline.config().invalid_ttl_to_controller {
            let match_fields = pkt.match_fields().clone();
            let buffer = pkt.into_buffer();
            send_packet_in(
                datapath,
                pipeline.config(),
                buffer,
                match_fields,
                PacketInReason::InvalidTtl,
                0,
                packet_in::NO_MATCH_COOKIE,
            );
        }
        return;
    }

    let mut next_table = Some(0u8);
    let mut last_table = 0u8;
    while let Some(table_id) = next_table.take() {
        last_table = table_id;
        let Some(table) = pipeline.tables_mut().get_mut(usize::from(table_id)) else {
            terror!(table_id, "goto-table target is out of range");
            return;
        };
        let Some(entry_id) = table.lookup(&pkt.lookup_fields()) else {
            return;
        };
        let bytes = pkt.buffer().as_ref().len() as u64;
        let Some((cookie, instructions, is_miss)) = table.entry_mut(entry_id).map(|entry| {
            entry.record_hit(bytes);
            (entry.cookie, entry.instructions.clone(), entry.is_table_miss())
        }) else {
            terror!("matched entry vanished before it could be executed");
            return;
        };
        match execute_entry(datapath, &mut pkt, table_id, cookie, is_miss, &instructions) {
            ExecResult::Consumed => return,
            ExecResult::Continue(goto) => next_table = goto,
        }
    }

    let actions = pkt.take_action_set().into_ordered();
    if !actions.is_empty() {
        datapath.execute_action_set(&mut pkt, actions, packet_in::NO_MATCH_COOKIE, last_table);
    }
}

enum ExecResult {
    Consumed,
    Continue(Option<u8>),
}

/// Run one entry's already-sorted instruction set in order, stopping as soon as the packet is
/// consumed by a callout (meter, apply-actions, clear-actions, write-actions, write-metadata,
/// goto-table, experimenter).
fn execute_entry<Buf: PacketBufferMut>(
    datapath: &mut impl Datapath<Buf>,
    pkt: &mut PacketContext<Buf>,
    table_id: u8,
    cookie: u64,
    is_miss: bool,
    instructions: &[Instruction],
) -> ExecResult {
    let mut goto = None;
    for inst in instructions {
        let disposition = match inst {
            Instruction::Meter(meter_id) => datapath.apply_meter(*meter_id, pkt),
            Instruction::ApplyActions(actions) => {
                let reason = if is_miss { PacketInReason::TableMiss } else { PacketInReason::ApplyAction };
                datapath.execute_action_list(pkt, actions, cookie, reason, table_id)
            }
            Instruction::ClearActions => {
                pkt.action_set_mut().clear();
                Disposition::Continue
            }
            Instruction::WriteActions(actions) => {
                pkt.action_set_mut().write(actions.iter().cloned());
                Disposition::Continue
            }
            Instruction::WriteMetadata { value, mask } => {
                pkt.write_metadata(*value, *mask);
                Disposition::Continue
            }
            Instruction::GotoTable(next) => {
                goto = Some(*next);
                Disposition::Continue
            }
            Instruction::Experimenter { experimenter, data } => {
                datapath.dispatch_experimenter(*experimenter, data, pkt)
            }
        };
        if disposition == Disposition::Consumed {
            return ExecResult::Consumed;
        }
    }
    ExecResult::Continue(goto)
}

#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use net::buffer::test_buffer::TestBuffer;
    use pretty_assertions::assert_eq;
    use smallvec::smallvec;
    use wire::action::Action;
    use wire::flow_mod::{self, FlowMod, FlowModCommand, FlowModFlags, NO_BUFFER};
    use wire::oxm::{Match, OxmField};

    use super::*;
    use crate::sync_links::SyncLinks;
    use crate::table::Table;

    #[derive(Default)]
    struct RecordingDatapath {
        packets_in: Vec<(PacketInReason, u64, u8)>,
        action_lists: Vec<Vec<Action>>,
        action_sets: Vec<Vec<Action>>,
        buffers: HashMap<u32, TestBuffer>,
        next_buffer_id: u32,
    }

    impl Datapath<TestBuffer> for RecordingDatapath {
        fn validate_actions(&self, _actions: &[Action]) -> Result<(), crate::error::PipelineError> {
            Ok(())
        }

        fn execute_action_list(
            &mut self,
            _pkt: &mut PacketContext<TestBuffer>,
            actions: &[Action],
            cookie: u64,
            reason: PacketInReason,
            table_id: u8,
        ) -> Disposition {
            self.action_lists.push(actions.to_vec());
            if actions.iter().any(|a| matches!(a, Action::Output { port: wire::action::PORT_CONTROLLER, .. })) {
                self.packets_in.push((reason, cookie, table_id));
                return Disposition::Consumed;
            }
            Disposition::Continue
        }

        fn execute_action_set(
            &mut self,
            _pkt: &mut PacketContext<TestBuffer>,
            actions: Vec<Action>,
            _cookie: u64,
            _table_id: u8,
        ) -> Disposition {
            self.action_sets.push(actions);
            Disposition::Consumed
        }

        fn apply_meter(&mut self, _meter_id: u32, _pkt: &mut PacketContext<TestBuffer>) -> Disposition {
            Disposition::Continue
        }

        fn dispatch_experimenter(
            &mut self,
            _experimenter: u32,
            _data: &[u8],
            _pkt: &mut PacketContext<TestBuffer>,
        ) -> Disposition {
            Disposition::Continue
        }

        fn save_buffer(&mut self, buffer: TestBuffer) -> u32 {
            let id = self.next_buffer_id;
            self.next_buffer_id += 1;
            self.buffers.insert(id, buffer);
            id
        }

        fn retrieve_buffer(&mut self, buffer_id: u32) -> Option<TestBuffer> {
            self.buffers.remove(&buffer_id)
        }

        fn send_packet_in_message(&mut self, packet_in: packet_in::PacketIn) {
            self.packets_in.push((packet_in.reason, packet_in.cookie, packet_in.table_id));
        }
    }

    fn pipeline_with(tables: u8) -> Pipeline {
        let config = config::DatapathConfigBuilder::default()
            .pipeline_tables(tables)
            .build()
            .expect("valid table count");
        Pipeline::from_parts((0..tables).map(|id| Table::new(id, 1024)).collect(), SyncLinks::new(), config)
    }

    fn add(table_id: u8, priority: u16, match_fields: Match, instructions: Vec<Instruction>) -> FlowMod {
        FlowMod {
            cookie: 42,
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
    fn ttl_expired_drops_silently_without_controller_flag() {
        let mut pipeline = pipeline_with(64);
        let mut dp = RecordingDatapath::default();
        let mut pkt = PacketContext::new(TestBuffer::from_raw_data(b"hello"), Match::any());
        pkt.set_ttl_expired(true);
        process_packet(&mut pipeline, &mut dp, pkt);
        assert!(dp.packets_in.is_empty());
    }

    #[test]
    fn ttl_expired_punts_when_configured() {
        let mut pipeline = pipeline_with(64);
        pipeline.config_mut().invalid_ttl_to_controller = true;
        let mut dp = RecordingDatapath::default();
        let mut pkt = PacketContext::new(TestBuffer::from_raw_data(b"hello"), Match::any());
        pkt.set_ttl_expired(true);
        process_packet(&mut pipeline, &mut dp, pkt);
        assert_eq!(dp.packets_in, vec![(PacketInReason::InvalidTtl, packet_in::NO_MATCH_COOKIE, 0)]);
    }

    #[test]
    fn table_miss_with_no_entry_hard_drops() {
        let mut pipeline = pipeline_with(64);
        let mut dp = RecordingDatapath::default();
        let pkt = PacketContext::new(TestBuffer::from_raw_data(b"hello"), Match::any());
        process_packet(&mut pipeline, &mut dp, pkt);
        assert!(dp.packets_in.is_empty());
        assert!(dp.action_lists.is_empty());
    }

    #[test]
    fn apply_actions_runs_immediately_on_match() {
        let mut pipeline = pipeline_with(64);
        pipeline.tables_mut()[0].flow_mod(&add(
            0,
            10,
            Match(smallvec![OxmField::EthType(0x0800)]),
            vec![Instruction::ApplyActions(vec![Action::Output { port: 3, max_len: None }])],
        ));
        let mut dp = RecordingDatapath::default();
        let pkt = PacketContext::new(TestBuffer::from_raw_data(b"hello"), Match(smallvec![OxmField::EthType(0x0800)]));
        process_packet(&mut pipeline, &mut dp, pkt);
        assert_eq!(dp.action_lists, vec![vec![Action::Output { port: 3, max_len: None }]]);
        assert!(dp.packets_in.is_empty());
    }

    #[test]
    fn goto_table_chains_into_next_table() {
        let mut pipeline = pipeline_with(64);
        let any = Match::any();
        pipeline.tables_mut()[0].flow_mod(&add(0, 0, any.clone(), vec![Instruction::GotoTable(5)]));
        pipeline.tables_mut()[5].flow_mod(&add(
            5,
            0,
            any.clone(),
            vec![Instruction::WriteActions(vec![Action::Output { port: 9, max_len: None }])],
        ));
        let mut dp = RecordingDatapath::default();
        let pkt = PacketContext::new(TestBuffer::from_raw_data(b"hello"), any);
        process_packet(&mut pipeline, &mut dp, pkt);
        assert_eq!(dp.action_sets, vec![vec![Action::Output { port: 9, max_len: None }]]);
    }

    #[test]
    fn table_miss_entry_punts_with_table_miss_reason() {
        let mut pipeline = pipeline_with(64);
        pipeline.tables_mut()[0].flow_mod(&add(
            0,
            0,
            Match::any(),
            vec![Instruction::ApplyActions(vec![Action::Output {
                port: wire::action::PORT_CONTROLLER,
                max_len: None,
            }])],
        ));
        let mut dp = RecordingDatapath::default();
        let pkt = PacketContext::new(TestBuffer::from_raw_data(b"hello"), Match::any());
        process_packet(&mut pipeline, &mut dp, pkt);
        assert_eq!(dp.packets_in, vec![(PacketInReason::TableMiss, 42, 0)]);
    }

    #[test]
    fn write_metadata_is_visible_to_a_later_table_lookup() {
        let mut pipeline = pipeline_with(64);
        pipeline.tables_mut()[0].flow_mod(&add(
            0,
            0,
            Match::any(),
            vec![
                Instruction::WriteMetadata { value: 0x7, mask: u64::MAX },
                Instruction::GotoTable(1),
            ],
        ));
        pipeline.tables_mut()[1].flow_mod(&add(
            1,
            10,
            Match(smallvec![OxmField::Metadata(0x7, None)]),
            vec![Instruction::WriteActions(vec![Action::Output { port: 4, max_len: None }])],
        ));
        let mut dp = RecordingDatapath::default();
        let pkt = PacketContext::new(TestBuffer::from_raw_data(b"hello"), Match::any());
        process_packet(&mut pipeline, &mut dp, pkt);
        assert_eq!(dp.action_sets, vec![vec![Action::Output { port: 4, max_len: None }]]);
    }

    #[test]
    fn goto_table_out_of_range_drops_instead_of_panicking() {
        let mut pipeline = pipeline_with(4);
        pipeline.tables_mut()[0].flow_mod(&add(0, 0, Match::any(), vec![Instruction::GotoTable(200)]));
        let mut dp = RecordingDatapath::default();
        let pkt = PacketContext::new(TestBuffer::from_raw_data(b"hello"), Match::any());
        process_packet(&mut pipeline, &mut dp, pkt);
        assert!(dp.packets_in.is_empty());
        assert!(dp.action_sets.is_empty());
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The pipeline's external collaborators: a back-reference used to reach buffers, meters,
//! controller transport, experimenter IDs, and global config. Action/instruction execution,
//! metering, buffering and controller transport are all out of this crate's scope; this trait is
//! the seam the pipeline driver calls through instead of owning any of them.

use config::DatapathConfig;
use net::buffer::PacketBufferMut;
use wire::action::Action;
use wire::packet_in::{PacketIn, PacketInReason};

use crate::error::PipelineError;
use crate::packet::PacketContext;

/// Whether a packet survived a callout into the host (meter, action executor, experimenter
/// hook), or was consumed by it. Models the packet as uniquely owned, observed as destroyed
/// after the fact rather than tracked through a fallible pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The packet is still live; pipeline traversal may continue.
    Continue,
    /// The host consumed (forwarded, buffered, or dropped) the packet.
    Consumed,
}

/// Everything the pipeline driver and its protocol handlers call out to, but do not implement
/// themselves.
pub trait Datapath<Buf: PacketBufferMut> {
    /// `dp_actions_validate`/`dp_actions_check_set_field_req`: reject an instruction's action
    /// list before it is ever installed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::BadInstruction`] if the action list is rejected.
    fn validate_actions(&self, actions: &[Action]) -> Result<(), PipelineError>;

    /// `dp_execute_action_list`: run `actions` against `pkt` immediately, attributing a
    /// `PACKET_IN` (if any action forwards to the controller) to `cookie`/`table_id`/`reason`.
    fn execute_action_list(
        &mut self,
        pkt: &mut PacketContext<Buf>,
        actions: &[Action],
        cookie: u64,
        reason: PacketInReason,
        table_id: u8,
    ) -> Disposition;

    /// `action_set::execute`: drain and run the accumulated action set at the end of table
    /// traversal, with `reason = ACTION_SET` and `cookie = NO_MATCH_COOKIE` fixed by the caller.
    fn execute_action_set(
        &mut self,
        pkt: &mut PacketContext<Buf>,
        actions: Vec<Action>,
        cookie: u64,
        table_id: u8,
    ) -> Disposition;

    /// `meter_table_apply`: subject the packet to a meter band, which may drop it.
    fn apply_meter(&mut self, meter_id: u32, pkt: &mut PacketContext<Buf>) -> Disposition;

    /// The experimenter instruction/action dispatch hook.
    fn dispatch_experimenter(
        &mut self,
        experimenter: u32,
        data: &[u8],
        pkt: &mut PacketContext<Buf>,
    ) -> Disposition;

    /// `dp_buffers_save`: hand the packet to the buffer pool, returning the buffer id the
    /// controller can later replay with a flow-mod.
    fn save_buffer(&mut self, buffer: Buf) -> u32;

    /// `dp_buffers_retrieve`: reclaim a previously-saved buffer for flow-mod replay. `None` if
    /// the buffer id is unknown or already consumed.
    fn retrieve_buffer(&mut self, buffer_id: u32) -> Option<Buf>;

    /// `dp_send_message`: hand a fully-built `PACKET_IN` to the controller transport.
    fn send_packet_in_message(&mut self, packet_in: PacketIn);
}

/// Build and send a `PACKET_IN` for `pkt`, truncating to `config.miss_send_len` and buffering the
/// packet unless `miss_send_len == NoBuffer`.
///
/// The buffer's length (and, when truncating, its first `miss_send_len` bytes) must be read
/// before the buffer is handed to [`Datapath::save_buffer`], which takes ownership of it.
pub fn send_packet_in<Buf: PacketBufferMut>(
    datapath: &mut impl Datapath<Buf>,
    config: &DatapathConfig,
    buffer: Buf,
    match_fields: wire::oxm::Match,
    reason: PacketInReason,
    table_id: u8,
    cookie: u64,
) {
    let total_len = u16::try_from(buffer.as_ref().len()).unwrap_or(u16::MAX);
    let (buffer_id, data) = match config.miss_send_len {
        config::MissSendLen::NoBuffer => {
            let data = buffer.as_ref().to_vec();
            (wire::flow_mod::NO_BUFFER, data)
        }
        config::MissSendLen::Controller(max) => {
            let keep = usize::from(max).min(buffer.as_ref().len());
            let data = buffer.as_ref()[..keep].to_vec();
            (datapath.save_buffer(buffer), data)
        }
    };
    datapath.send_packet_in_message(PacketIn { buffer_id, total_len, reason, table_id, cookie, match_fields, data });
}

// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![allow(rustdoc::private_doc_tests)]
#![deny(
    unsafe_code,
    missing_docs,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]

//! # OpenFlow Pipeline
//!
//! A multi-table OpenFlow 1.3+ packet processing pipeline: flow tables, the per-packet action
//! set, and the protocol handlers (`OFPT_PACKET_IN` traversal, `OFPT_FLOW_MOD`, `OFPT_TABLE_MOD`,
//! multipart stats/features/desc) that drive them. Everything a real switch would also need to
//! own — buffer pools, the action/instruction executor, meters, controller transport — is out of
//! scope and modeled as the [`host::Datapath`] trait instead, so this crate only ever sees it
//! through that seam.
//!
//! ## Processing a packet
//!
//! [`driver::process_packet`] walks [`pipeline::Pipeline`]'s tables starting at table 0, running
//! each matched entry's instructions in canonical order and following `OFPIT_GOTO_TABLE` until a
//! table miss, an instruction consumes the packet, or traversal falls off the end and the
//! accumulated action set is executed.
//!
//! ```rust
//! use config::DatapathConfigBuilder;
//! use net::buffer::test_buffer::TestBuffer;
//! use wire::oxm::Match;
//! use ofswitch_pipeline::driver::process_packet;
//! use ofswitch_pipeline::packet::PacketContext;
//! use ofswitch_pipeline::pipeline::Pipeline;
//! # use ofswitch_pipeline::host::{Datapath, Disposition};
//! # use wire::action::Action;
//! # use wire::packet_in::{PacketIn, PacketInReason};
//! #
//! # struct NullDatapath;
//! # impl Datapath<TestBuffer> for NullDatapath {
//! #     fn validate_actions(&self, _: &[Action]) -> Result<(), ofswitch_pipeline::error::PipelineError> { Ok(()) }
//! #     fn execute_action_list(&mut self, _: &mut PacketContext<TestBuffer>, _: &[Action], _: u64, _: PacketInReason, _: u8) -> Disposition { Disposition::Continue }
//! #     fn execute_action_set(&mut self, _: &mut PacketContext<TestBuffer>, _: Vec<Action>, _: u64, _: u8) -> Disposition { Disposition::Continue }
//! #     fn apply_meter(&mut self, _: u32, _: &mut PacketContext<TestBuffer>) -> Disposition { Disposition::Continue }
//! #     fn dispatch_experimenter(&mut self, _: u32, _: &[u8], _: &mut PacketContext<TestBuffer>) -> Disposition { Disposition::Continue }
//! #     fn save_buffer(&mut self, _: TestBuffer) -> u32 { 0 }
//! #     fn retrieve_buffer(&mut self, _: u32) -> Option<TestBuffer> { None }
//! #     fn send_packet_in_message(&mut self, _: PacketIn) {}
//! # }
//!
//! let config = DatapathConfigBuilder::default().build().unwrap();
//! let mut pipeline = Pipeline::new(config).unwrap();
//! let mut datapath = NullDatapath;
//! let pkt = PacketContext::new(TestBuffer::from_raw_data(&[0u8; 64]), Match::any());
//! process_packet(&mut pipeline, &mut datapath, pkt);
//! ```

pub mod action_set;
pub mod driver;
pub mod entry;
pub mod error;
pub mod flow_mod;
pub mod host;
pub mod multipart;
pub mod packet;
pub mod pipeline;
pub mod remote;
pub mod sync_links;
pub mod table;
pub mod table_mod;

pub use driver::process_packet;
pub use error::PipelineError;
pub use flow_mod::handle_flow_mod;
pub use host::{Datapath, Disposition, send_packet_in};
pub use packet::PacketContext;
pub use pipeline::{Pipeline, PipelineBuildError};
pub use remote::{Remote, Role};
pub use table::Table;
pub use table_mod::handle_table_mod;

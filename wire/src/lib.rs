#![forbid(unsafe_code)]
#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(clippy::module_name_repetitions)]

//! Wire types for the OpenFlow 1.3+ messages this pipeline handles directly: OXM match TLVs,
//! flow-mod/table-mod requests, multipart stats/table-features/table-desc bodies, and
//! packet-in. Framing (the 8-byte `ofp_header`, TCP/TLS transport to the controller) is an
//! external collaborator and is not modeled here.

pub mod action;
pub mod error;
pub mod instruction;
pub mod multipart;
pub mod oxm;
pub mod packet_in;
pub mod flow_mod;
pub mod table_mod;

// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Crate to control tracing dynamically at runtime.
//!
//! Every other crate in this workspace declares its logging targets with [`trace_target!`] and
//! logs through [`tinfo!`]/[`tdebug!`]/[`twarn!`]/[`terror!`]/[`ttrace!`] instead of the bare
//! `tracing` macros, so that a process built from this workspace can list, tag and re-level every
//! target at runtime through a single [`TracingControl`] handle without a restart.

pub mod control;
pub mod display;
pub mod ratelimit;
pub mod targets;

pub use control::{TracingControl, get_trace_ctl};
pub use ratelimit::{RateDecision, RateLimiter};
pub use tracing_subscriber::filter::LevelFilter;

trace_target!(LevelFilter::INFO, &["tracectl"]);

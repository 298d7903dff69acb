#![forbid(unsafe_code)] // Validation logic should always be strictly safe
#![deny(missing_docs, clippy::all, clippy::pedantic)] // yeah, I'm that guy. I'm not sorry.
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Do you know where your towel is?

//! Packet buffer primitives shared by the pipeline and its collaborators.
//!
//! This crate only defines the [`buffer`] abstraction: a minimal, allocation-owning view over the
//! raw octets of a packet with headroom/tailroom bookkeeping. Header parsing, TTL validation and
//! match-field extraction live outside this crate's scope; the pipeline receives an
//! already-parsed [`crate::buffer::PacketBufferMut`] plus an out-of-band match summary.

pub mod buffer;

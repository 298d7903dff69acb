// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A controller connection's role and in-flight multipart reassembly state.

use std::time::{Duration, Instant};

use wire::multipart::{Fragment, MultipartType};

use crate::error::PipelineError;

/// `ofp_controller_role`, restricted to what this pipeline checks: only `Slave` ever changes
/// behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// Read-write, exclusive.
    Master,
    /// Read-write, non-exclusive (the OpenFlow 1.3 default before any `OFPT_ROLE_REQUEST`).
    #[default]
    Equal,
    /// Read-only; state-mutating requests are rejected with `BAD_REQUEST/IS_SLAVE`.
    Slave,
}

struct Pending {
    xid: u32,
    // kept for parity with the wire fragment even though this implementation only ever
    // fragments OFPMP_TABLE_FEATURES requests
    #[allow(dead_code)]
    kind: MultipartType,
    body: Vec<u8>,
    last_seen: Instant,
}

/// One controller connection: its role, plus at most one pending fragmented multipart request.
///
/// At most one pending request per remote is tracked; a second pending request under a
/// different `xid` is a protocol error rather than a second reassembly slot.
pub struct Remote {
    /// This connection's current role.
    pub role: Role,
    pending: Option<Pending>,
}

impl Remote {
    /// A new connection, starting in the default `Equal` role.
    #[must_use]
    pub fn new() -> Self {
        Self { role: Role::default(), pending: None }
    }

    /// `true` if this connection may not mutate pipeline state.
    #[must_use]
    pub fn is_slave(&self) -> bool {
        self.role == Role::Slave
    }

    /// `BAD_REQUEST/IS_SLAVE` if this connection is a slave, else `Ok`.
    pub fn require_not_slave(&self) -> Result<(), PipelineError> {
        if self.is_slave() { Err(PipelineError::IsSlave) } else { Ok(()) }
    }

    /// How long a pending reassembly has sat without a new fragment, i.e. `mp_req_lasttime`'s
    /// role in the source: a caller can use this to time out and drop a stalled reassembly.
    #[must_use]
    pub fn pending_age(&self, now: Instant) -> Option<Duration> {
        self.pending.as_ref().map(|p| now.duration_since(p.last_seen))
    }

    /// Merge one multipart request fragment into this connection's reassembly state.
    ///
    /// Returns `Ok(Some(body))` once the full request body has arrived (immediately, for a
    /// single, unfragmented request), `Ok(None)` while more fragments are still expected, and
    /// `Err(MultipartBufferOverflow)` if a fragment with a different `xid` arrives while a
    /// request is already pending.
    pub fn merge_fragment(&mut self, fragment: Fragment) -> Result<Option<Vec<u8>>, PipelineError> {
        match &mut self.pending {
            Some(pending) => {
                if pending.xid != fragment.xid {
                    return Err(PipelineError::MultipartBufferOverflow);
                }
                pending.body.extend_from_slice(&fragment.body);
                pending.last_seen = Instant::now();
                if fragment.more {
                    Ok(None)
                } else {
                    let body = std::mem::take(&mut pending.body);
                    self.pending = None;
                    Ok(Some(body))
                }
            }
            None => {
                if fragment.more {
                    self.pending = Some(Pending {
                        xid: fragment.xid,
                        kind: fragment.kind,
                        body: fragment.body,
                        last_seen: Instant::now(),
                    });
                    Ok(None)
                } else {
                    Ok(Some(fragment.body))
                }
            }
        }
    }
}

impl Default for Remote {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn frag(xid: u32, more: bool, body: &[u8]) -> Fragment {
        Fragment { xid, kind: MultipartType::TableFeatures, more, body: body.to_vec() }
    }

    #[test]
    fn single_fragment_completes_immediately() {
        let mut remote = Remote::new();
        let result = remote.merge_fragment(frag(1, false, b"abc")).unwrap();
        assert_eq!(result, Some(b"abc".to_vec()));
    }

    #[test]
    fn split_request_reassembles_in_order() {
        let mut remote = Remote::new();
        assert_eq!(remote.merge_fragment(frag(7, true, b"ab")).unwrap(), None);
        assert_eq!(remote.merge_fragment(frag(7, true, b"cd")).unwrap(), None);
        let body = remote.merge_fragment(frag(7, false, b"ef")).unwrap();
        assert_eq!(body, Some(b"abcdef".to_vec()));
    }

    #[test]
    fn mismatched_xid_overflows() {
        let mut remote = Remote::new();
        remote.merge_fragment(frag(1, true, b"a")).unwrap();
        let err = remote.merge_fragment(frag(2, false, b"b")).unwrap_err();
        assert_eq!(err, PipelineError::MultipartBufferOverflow);
    }

    #[test]
    fn slave_role_rejects_mutation() {
        let mut remote = Remote::new();
        remote.role = Role::Slave;
        assert_eq!(remote.require_not_slave(), Err(PipelineError::IsSlave));
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Weak cross-links between a table 62 entry and its mirrored table 63 counterpart.
//!
//! A table 62 (ETH_SRC) install is mirrored into table 63 (ETH_DST) with the source and
//! destination match fields swapped; this side table records each half's partner so that
//! deleting one side can clear the other's `sync_master`/`sync_slave` field rather than leaving
//! it dangling. The link is a typed [`Id`] rather than an owning reference or raw pointer,
//! following this workspace's convention for weak cross-references between independently-owned
//! records.

use id::Id;

use crate::entry::FlowEntry;

/// Opaque identity of one flow entry, used only to resolve mirror cross-links; not a hash of the
/// entry's contents.
pub type EntryId = Id<FlowEntry>;

/// Side-table tracking the bidirectional `sync_master`/`sync_slave` mirror relationship between
/// table 62 and table 63 entries. Kept separate from [`crate::table::Table`] because a link
/// spans two distinct tables.
#[derive(Debug, Default)]
pub struct SyncLinks {
    // maps one side's id to the other side's id; always inserted as a pair
    links: std::collections::HashMap<EntryId, EntryId>,
}

impl SyncLinks {
    /// Create an empty link table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `a` and `b` mirror one another.
    pub fn link(&mut self, a: EntryId, b: EntryId) {
        self.links.insert(a, b);
        self.links.insert(b, a);
    }

    /// This entry's mirror partner, if any.
    #[must_use]
    pub fn partner_of(&self, id: EntryId) -> Option<EntryId> {
        self.links.get(&id).copied()
    }

    /// Remove `id` and its partner's link back to `id`, returning the partner if one existed.
    /// Called when `id`'s entry is deleted so the survivor doesn't keep pointing at a dead entry.
    pub fn unlink(&mut self, id: EntryId) -> Option<EntryId> {
        let partner = self.links.remove(&id)?;
        self.links.remove(&partner);
        Some(partner)
    }
}

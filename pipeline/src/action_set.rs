// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The per-packet action set accumulated by `OFPIT_WRITE_ACTIONS` and drained at the end of
//! pipeline traversal.
//!
//! OpenFlow 1.3 defines the action set as one slot per action *type*: writing a second action of
//! a type already present replaces the first, and at execution time the slots run in a fixed
//! order regardless of write order, with `Output` always last. This implementation only needs
//! the subset of that order relevant to the actions [`wire::action::Action`] actually models.

use wire::action::Action;

fn slot(action: &Action) -> u8 {
    match action {
        Action::SetField(_) => 0,
        Action::PushVlan(_) | Action::PopVlan => 1,
        Action::DecNwTtl => 2,
        Action::Group(_) => 3,
        Action::Experimenter { .. } => 4,
        Action::Output { .. } => 5,
    }
}

/// An action set: at most one action per slot, drained in canonical execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSet {
    slots: Vec<Action>,
}

impl ActionSet {
    /// An empty action set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `OFPIT_WRITE_ACTIONS`: merge `actions` into the set, replacing any existing action that
    /// occupies the same slot.
    pub fn write(&mut self, actions: impl IntoIterator<Item = Action>) {
        for action in actions {
            let s = slot(&action);
            self.slots.retain(|existing| slot(existing) != s);
            self.slots.push(action);
        }
    }

    /// `OFPIT_CLEAR_ACTIONS`: empty the set.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Drain the set in canonical execution order (`Output` last).
    #[must_use]
    pub fn into_ordered(mut self) -> Vec<Action> {
        self.slots.sort_by_key(slot);
        self.slots
    }

    /// `true` if no action is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_replaces_same_slot() {
        let mut set = ActionSet::new();
        set.write([Action::Output { port: 1, max_len: None }]);
        set.write([Action::Output { port: 2, max_len: None }]);
        let ordered = set.into_ordered();
        assert_eq!(ordered, vec![Action::Output { port: 2, max_len: None }]);
    }

    #[test]
    fn output_always_executes_last() {
        let mut set = ActionSet::new();
        set.write([
            Action::Output { port: 1, max_len: None },
            Action::DecNwTtl,
            Action::PopVlan,
        ]);
        let ordered = set.into_ordered();
        assert_eq!(ordered.last(), Some(&Action::Output { port: 1, max_len: None }));
    }

    #[test]
    fn clear_empties_set() {
        let mut set = ActionSet::new();
        set.write([Action::DecNwTtl]);
        set.clear();
        assert!(set.is_empty());
    }
}

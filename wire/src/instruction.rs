// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `ofp_instruction` variants, decoded from a flow entry's instruction set.
//!
//! The canonical execution order is fixed regardless of the order instructions appear on the
//! wire: Meter, then Apply-Actions, then Clear-Actions, then Write-Actions, then Write-Metadata,
//! then Goto-Table. [`Instruction::execution_rank`] encodes that order so the executor can sort
//! once per entry instead of re-deriving it per packet.

use crate::action::Action;

/// One decoded instruction from a flow entry's instruction set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `OFPIT_METER`: direct the packet through a meter band before anything else runs.
    Meter(u32),
    /// `OFPIT_APPLY_ACTIONS`: execute actions immediately, in list order, against the packet.
    ApplyActions(Vec<Action>),
    /// `OFPIT_CLEAR_ACTIONS`: empty the action set accumulated so far.
    ClearActions,
    /// `OFPIT_WRITE_ACTIONS`: merge actions into the action set (by type; later writes of the
    /// same type replace earlier ones).
    WriteActions(Vec<Action>),
    /// `OFPIT_WRITE_METADATA`: `metadata = (metadata & !mask) | (value & mask)`.
    WriteMetadata {
        /// Value bits to write.
        value: u64,
        /// Mask selecting which bits of `value` apply.
        mask: u64,
    },
    /// `OFPIT_GOTO_TABLE`: continue pipeline processing at a later table.
    GotoTable(u8),
    /// `OFPIT_EXPERIMENTER`: vendor-defined instruction, carried opaquely.
    Experimenter {
        /// Experimenter (vendor) id.
        experimenter: u32,
        /// Opaque experimenter-defined payload.
        data: Vec<u8>,
    },
}

impl Instruction {
    /// This instruction's position in the canonical execution order. Lower sorts first.
    #[must_use]
    pub fn execution_rank(&self) -> u8 {
        match self {
            Instruction::Meter(_) => 0,
            Instruction::ApplyActions(_) => 1,
            Instruction::ClearActions => 2,
            Instruction::WriteActions(_) => 3,
            Instruction::WriteMetadata { .. } => 4,
            Instruction::GotoTable(_) => 5,
            // experimenter instructions run last; this implementation never interprets their
            // payload, so ordering relative to the standard set is not externally observable
            Instruction::Experimenter { .. } => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_rank_matches_canonical_order() {
        let mut instructions = vec![
            Instruction::GotoTable(2),
            Instruction::WriteMetadata { value: 1, mask: 1 },
            Instruction::ApplyActions(vec![]),
            Instruction::Meter(1),
            Instruction::ClearActions,
            Instruction::WriteActions(vec![]),
        ];
        instructions.sort_by_key(Instruction::execution_rank);
        let ranks: Vec<u8> = instructions.iter().map(Instruction::execution_rank).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4, 5]);
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Display implementations for the tracing target table.

use crate::control::{TargetCfg, TargetCfgDb};
use std::fmt::Display;

macro_rules! target_fmt {
    () => {
        "{:<48} │ {:>6} │ {:>5} │ {}"
    };
}

fn fmt_heading(f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    writeln!(f, "{}", format_args!(target_fmt!(), "TARGET", "LEVEL", "CUSTOM", "TAGS"))
}

impl Display for TargetCfg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            format_args!(
                target_fmt!(),
                self.target,
                self.level,
                if self.custom { "yes" } else { "" },
                self.tags.join(",")
            )
        )
    }
}

impl Display for TargetCfgDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "───────────── tracing configuration ─────────────")?;
        fmt_heading(f)?;
        for unit in self.targets.values() {
            writeln!(f, "{unit}")?;
        }
        write!(f, "{}", format_args!(target_fmt!(), "(default)", self.default, "", "--"))
    }
}

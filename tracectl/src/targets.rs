// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Automated, static registry of tracing targets across all linked crates

use crate::LevelFilter;
use linkme::distributed_slice;

/// A statically-registered tracing target: one module (or custom label) with a default level
/// and a set of tags a caller can use to adjust many targets at once.
pub struct STarget {
    pub(crate) target: &'static str,
    pub(crate) level: LevelFilter,
    pub(crate) tags: &'static [&'static str],
    pub(crate) custom: bool,
}
impl STarget {
    pub const fn new(
        target: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
        custom: bool,
    ) -> Self {
        Self {
            target,
            level,
            tags,
            custom,
        }
    }
}

#[distributed_slice]
pub static TRACING_TARGETS: [STarget];

#[doc(hidden)]
#[macro_export]
macro_rules! trace_target_deps {
    () => {
        use linkme::distributed_slice;
        use $crate::LevelFilter;
        use $crate::targets::{STarget, TRACING_TARGETS};
    };
}

/// Declare the calling module as a tracing target with a default level and a set of tags.
///
/// Call once per module near the top of the file, e.g. `trace_target!(LevelFilter::DEBUG,
/// &["pipeline"]);`. The target name is always `module_path!()`; use [`custom_target`] to
/// register a label that isn't a module path.
#[macro_export]
macro_rules! trace_target {
    ($level:expr, $tags:expr) => {
        const _: () = {
            use $crate::trace_target_deps;
            trace_target_deps!();

            #[distributed_slice(TRACING_TARGETS)]
            static TRACE_TGT: STarget = STarget::new(module_path!(), $level, $tags, false);
        };
    };
}

/// Declare a tracing target under an explicit label rather than the calling module's path.
#[macro_export]
macro_rules! custom_target {
    ($target:expr, $level:expr, $tags:expr) => {
        const _: () = {
            use $crate::trace_target_deps;
            trace_target_deps!();

            #[distributed_slice(TRACING_TARGETS)]
            static TRACE_TGT: STarget = STarget::new($target, $level, $tags, true);
        };
    };
}

/// Emit an error-level event tagged with the calling module's registered target.
#[macro_export]
macro_rules! terror {
    ($($args:tt)*) => {
        tracing::error!(target: module_path!(), $($args)*)
    };
}
/// Emit a warn-level event tagged with the calling module's registered target.
#[macro_export]
macro_rules! twarn {
    ($($args:tt)*) => {
        tracing::warn!(target: module_path!(), $($args)*)
    };
}
/// Emit an info-level event tagged with the calling module's registered target.
#[macro_export]
macro_rules! tinfo {
    ($($args:tt)*) => {
        tracing::info!(target: module_path!(), $($args)*)
    };
}
/// Emit a debug-level event tagged with the calling module's registered target.
#[macro_export]
macro_rules! tdebug {
    ($($args:tt)*) => {
        tracing::debug!(target: module_path!(), $($args)*)
    };
}
/// Emit a trace-level event tagged with the calling module's registered target.
#[macro_export]
macro_rules! ttrace {
    ($($args:tt)*) => {
        tracing::trace!(target: module_path!(), $($args)*)
    };
}

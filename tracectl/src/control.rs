// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Tracing runtime control.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, OnceLock};

use crate::targets::TRACING_TARGETS;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, Registry, filter::LevelFilter, prelude::*, reload};

/// Runtime-adjustable configuration for a single registered target.
#[derive(Debug)]
pub struct TargetCfg {
    pub(crate) target: &'static str,
    pub(crate) level: LevelFilter,
    pub(crate) tags: &'static [&'static str],
    pub(crate) custom: bool,
}
impl TargetCfg {
    const fn new(
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

#[derive(Debug)]
pub(crate) struct TargetCfgDb {
    pub(crate) default: LevelFilter,
    pub(crate) targets: HashMap<&'static str, TargetCfg>,
}

impl TargetCfgDb {
    fn new(default: LevelFilter) -> Self {
        Self {
            default,
            targets: HashMap::new(),
        }
    }

    fn register(
        &mut self,
        target: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
        custom: bool,
    ) {
        debug!("registering target {target} level={level} tags={tags:?}");
        let unit = TargetCfg::new(target, level, tags, custom);
        if let Some(exist) = self.targets.insert(target, unit) {
            warn!("target {} has been multiply defined", exist.target);
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::new(self.default.to_string());
        for unit in self.targets.values() {
            let directive = format!("{}={}", unit.target, unit.level);
            if let Ok(directive) = directive.parse() {
                filter = filter.add_directive(directive);
            }
        }
        filter
    }
}

/// Process-wide handle for adjusting log levels at runtime without recompiling or restarting.
#[derive(Debug)]
pub struct TracingControl {
    db: Mutex<TargetCfgDb>,
    reload_handle: reload::Handle<EnvFilter, Registry>,
}

impl TracingControl {
    fn new() -> Self {
        let mut db = TargetCfgDb::new(LevelFilter::INFO);
        for t in TRACING_TARGETS {
            db.register(t.target, t.level, t.tags, t.custom);
        }

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_line_number(true)
            .with_target(true)
            .with_thread_names(true)
            .with_level(true);

        let (filter, reload_handle) = reload::Layer::new(db.env_filter());
        let subscriber = Registry::default().with(filter).with(fmt_layer);
        // a second call_once elsewhere in the process (e.g. a test harness already holding the
        // global default) is not an error here; ignore it rather than panic
        let _ = tracing::subscriber::set_global_default(subscriber);

        info!("initialized tracing control, default level is {}", db.default);
        Self {
            db: Mutex::new(db),
            reload_handle,
        }
    }

    fn reload(&self, filter: EnvFilter) {
        let _ = self.reload_handle.reload(filter);
    }
}

static TRACING_CTL: OnceLock<TracingControl> = OnceLock::new();

/// Get a reference to the process-wide [`TracingControl`], initializing it on first call.
pub fn get_trace_ctl() -> &'static TracingControl {
    TRACING_CTL.get_or_init(TracingControl::new)
}

impl TracingControl {
    /// Initialize the global tracing subscriber. Idempotent; safe to call from multiple crates.
    pub fn init() {
        get_trace_ctl();
    }

    /// Set the level for every target carrying the given tag.
    pub fn set_tag_level(&self, tag: &str, level: LevelFilter) {
        let mut changed = false;
        let Ok(mut db) = self.db.lock() else {
            return;
        };
        for unit in db.targets.values_mut() {
            if unit.tags.contains(&tag) && unit.level != level {
                changed = true;
                unit.level = level;
            }
        }
        if changed {
            info!("set log level for tag {tag} to {level}");
            self.reload(db.env_filter());
        }
    }

    /// Set the default level applied to targets with no more specific override.
    pub fn set_default_level(&self, level: LevelFilter) {
        let Ok(mut db) = self.db.lock() else {
            return;
        };
        if db.default != level {
            db.default = level;
            info!("set default log level to {level}");
            self.reload(db.env_filter());
        }
    }

    /// The current default level.
    #[must_use]
    pub fn get_default_level(&self) -> LevelFilter {
        self.db.lock().map(|db| db.default).unwrap_or(LevelFilter::INFO)
    }

    /// Register (or overwrite) a single target outside of the static `trace_target!` registry.
    pub fn register(&self, target: &'static str, level: LevelFilter, tags: &'static [&'static str]) {
        if let Ok(mut db) = self.db.lock() {
            db.register(target, level, tags, true);
            self.reload(db.env_filter());
        }
    }

    /// All distinct tags known across every registered target.
    pub fn get_tags(&self) -> impl Iterator<Item = &'static str> + use<> {
        let mut set = HashSet::new();
        for target in TRACING_TARGETS {
            for tag in target.tags {
                set.insert(*tag);
            }
        }
        set.into_iter()
    }

    /// Print the current target table at info level.
    pub fn dump(&self) {
        if let Ok(db) = self.db.lock() {
            info!("{}", &*db);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn set_default_level_reflected_by_getter() {
        let ctl = get_trace_ctl();
        ctl.set_default_level(LevelFilter::WARN);
        assert_eq!(ctl.get_default_level(), LevelFilter::WARN);
        ctl.set_default_level(LevelFilter::INFO);
        assert_eq!(ctl.get_default_level(), LevelFilter::INFO);
    }

    #[test]
    #[serial]
    fn tracectl_registers_its_own_target() {
        let ctl = get_trace_ctl();
        assert!(ctl.get_tags().any(|t| t == "tracectl"));
    }
}

// Copyright 2026 the Adapter Forms Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Engine tuning knobs.

use std::sync::OnceLock;

/// Process-wide engine configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Interpreted invocations of a form before it is compiled. `0` compiles on first use.
    pub compile_threshold: u32,
    /// Invocations a guard branch runs through a counting wrapper. Negative disables wrapping.
    pub dont_inline_threshold: i32,
    /// Whether guards record branch profiles.
    pub profile_guards: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            compile_threshold: 30,
            dont_inline_threshold: 30,
            profile_guards: true,
        }
    }
}

/// Environment variable overriding [`EngineConfig::compile_threshold`].
pub const COMPILE_THRESHOLD_VAR: &str = "ADAPTER_FORMS_COMPILE_THRESHOLD";
/// Environment variable overriding [`EngineConfig::dont_inline_threshold`].
pub const DONT_INLINE_THRESHOLD_VAR: &str = "ADAPTER_FORMS_DONT_INLINE_THRESHOLD";
/// Environment variable overriding [`EngineConfig::profile_guards`].
pub const PROFILE_GUARDS_VAR: &str = "ADAPTER_FORMS_PROFILE_GUARDS";

impl EngineConfig {
    /// Reads overrides from the environment; unset or malformed variables keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`EngineConfig::from_env`] with an explicit variable source.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(v) = parse(&lookup, COMPILE_THRESHOLD_VAR) {
            cfg.compile_threshold = v;
        }
        if let Some(v) = parse(&lookup, DONT_INLINE_THRESHOLD_VAR) {
            cfg.dont_inline_threshold = v;
        }
        if let Some(v) = parse(&lookup, PROFILE_GUARDS_VAR) {
            cfg.profile_guards = v;
        }
        cfg
    }
}

fn parse<T: core::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("ignoring malformed {key}={raw:?}");
            None
        }
    }
}

static CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Installs the process configuration.
///
/// The first installation wins (including the implicit one made by [`get`]); a later call
/// returns the configuration already in effect.
pub fn install(cfg: EngineConfig) -> Result<(), EngineConfig> {
    CONFIG.set(cfg).map_err(|_| *get())
}

/// Returns the process configuration, installing [`EngineConfig::from_env`] on first use.
pub fn get() -> &'static EngineConfig {
    CONFIG.get_or_init(|| {
        let cfg = EngineConfig::from_env();
        log::debug!("engine config: {cfg:?}");
        cfg
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_overrides_defaults() {
        let cfg = EngineConfig::from_lookup(|key| match key {
            COMPILE_THRESHOLD_VAR => Some("0".into()),
            DONT_INLINE_THRESHOLD_VAR => Some(" -1 ".into()),
            _ => None,
        });
        assert_eq!(cfg.compile_threshold, 0);
        assert_eq!(cfg.dont_inline_threshold, -1);
        assert!(cfg.profile_guards);
    }

    #[test]
    fn malformed_values_are_ignored() {
        let cfg = EngineConfig::from_lookup(|key| match key {
            PROFILE_GUARDS_VAR => Some("maybe".into()),
            COMPILE_THRESHOLD_VAR => Some("-3".into()),
            _ => None,
        });
        assert_eq!(cfg, EngineConfig::default());
    }
}

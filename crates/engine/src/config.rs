use std::collections::BTreeMap;
use std::fmt;

use tracing::warn;

pub const FEATURES_ENV_VAR: &str = "KEYQUEST_FEATURES";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureFlag {
    OriginStoryCutscenes,
    DebugOverlay,
}

impl FeatureFlag {
    pub const ALL: [FeatureFlag; 2] = [FeatureFlag::OriginStoryCutscenes, FeatureFlag::DebugOverlay];

    pub const fn name(self) -> &'static str {
        match self {
            Self::OriginStoryCutscenes => "origin_story_cutscenes",
            Self::DebugOverlay => "debug_overlay",
        }
    }

    pub const fn default_enabled(self) -> bool {
        match self {
            Self::OriginStoryCutscenes => true,
            Self::DebugOverlay => false,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|flag| flag.name() == name)
    }
}

impl fmt::Display for FeatureFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compile-time defaults plus runtime overrides. Created once at startup and
/// handed to every consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    overrides: BTreeMap<FeatureFlag, bool>,
}

impl FeatureFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        match std::env::var(FEATURES_ENV_VAR) {
            Ok(raw) => Self::from_env_value(&raw),
            Err(std::env::VarError::NotPresent) => Self::default(),
            Err(error) => {
                warn!(var = FEATURES_ENV_VAR, error = %error, "feature_flags_env_unreadable");
                Self::default()
            }
        }
    }

    /// Parses `name=on|off` pairs separated by commas. Bad entries are
    /// logged and skipped.
    pub fn from_env_value(raw: &str) -> Self {
        let mut flags = Self::default();
        for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            let Some((name, value)) = entry.split_once('=') else {
                warn!(entry, "feature_flag_entry_malformed");
                continue;
            };
            let Some(flag) = FeatureFlag::from_name(name.trim()) else {
                warn!(flag = name.trim(), "feature_flag_unknown");
                continue;
            };
            match parse_switch(value.trim()) {
                Some(enabled) => flags.set(flag, enabled),
                None => warn!(flag = flag.name(), value = value.trim(), "feature_flag_value_invalid"),
            }
        }
        flags
    }

    pub fn is_enabled(&self, flag: FeatureFlag) -> bool {
        self.overrides
            .get(&flag)
            .copied()
            .unwrap_or_else(|| flag.default_enabled())
    }

    pub fn set(&mut self, flag: FeatureFlag, enabled: bool) {
        self.overrides.insert(flag, enabled);
    }

    pub fn with(mut self, flag: FeatureFlag, enabled: bool) -> Self {
        self.set(flag, enabled);
        self
    }

    pub fn clear_override(&mut self, flag: FeatureFlag) {
        self.overrides.remove(&flag);
    }
}

fn parse_switch(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "on" | "1" | "true" => Some(true),
        "off" | "0" | "false" => Some(false),
        _ => None,
    }
}

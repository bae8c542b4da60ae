//! User preference and resolved backend identifiers.
//!
//! The preference is whatever the user asked for (`rust`, `cython` or `auto`);
//! the active implementation is what the selector settled on and is never
//! `auto`. Preference values come from a [`PreferenceSource`] so the selector
//! can be fed either the process environment or an explicit value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default environment variable holding the backend preference.
pub const PREFERENCE_ENV: &str = "GRPC_PYTHON_IMPLEMENTATION";

/// User-declared backend preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preference {
    /// Rust bindings first
    Rust,
    /// Cython extension first
    Cython,
    /// Let the selector choose (rust wins when both load)
    #[default]
    Auto,
}

impl Preference {
    /// Every preference, in the order the switching matrix reports them.
    pub const ALL: [Preference; 3] = [Preference::Rust, Preference::Cython, Preference::Auto];

    /// Parses a raw configuration value.
    ///
    /// Matching is case-insensitive. Missing or unrecognized values map to
    /// [`Preference::Auto`]; this never fails.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Preference::Auto;
        };
        match raw.to_lowercase().as_str() {
            "rust" => Preference::Rust,
            "cython" => Preference::Cython,
            _ => Preference::Auto,
        }
    }

    /// Canonical lowercase name, also the value written into child environments.
    pub fn as_str(&self) -> &'static str {
        match self {
            Preference::Rust => "rust",
            Preference::Cython => "cython",
            Preference::Auto => "auto",
        }
    }

    /// The backend this preference asks for, if it names one.
    pub fn requested(&self) -> Option<ActiveImplementation> {
        match self {
            Preference::Rust => Some(ActiveImplementation::Rust),
            Preference::Cython => Some(ActiveImplementation::Cython),
            Preference::Auto => None,
        }
    }
}

impl fmt::Display for Preference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend chosen by the selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveImplementation {
    Rust,
    Cython,
}

impl ActiveImplementation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActiveImplementation::Rust => "rust",
            ActiveImplementation::Cython => "cython",
        }
    }

    /// Human-readable backend name used in reports and warnings.
    pub fn display_name(&self) -> &'static str {
        match self {
            ActiveImplementation::Rust => "Rust",
            ActiveImplementation::Cython => "Cython",
        }
    }

    /// The other backend.
    pub fn other(&self) -> Self {
        match self {
            ActiveImplementation::Rust => ActiveImplementation::Cython,
            ActiveImplementation::Cython => ActiveImplementation::Rust,
        }
    }

    /// QPS worker launcher script for this backend.
    pub fn worker_script(&self) -> &'static str {
        match self {
            ActiveImplementation::Rust => "run_worker_rust.sh",
            ActiveImplementation::Cython => "run_worker_cython.sh",
        }
    }
}

impl fmt::Display for ActiveImplementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the raw preference string comes from.
///
/// Implementations are queried on every selector call and must not cache.
pub trait PreferenceSource: Send + Sync {
    /// Raw configured value, `None` when nothing is set.
    fn raw_preference(&self) -> Option<String>;

    /// Name of the environment variable a child process should receive,
    /// if this source is environment-backed.
    fn env_var(&self) -> Option<&str> {
        None
    }
}

/// Reads the preference from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvPreference {
    var: String,
}

impl EnvPreference {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvPreference {
    fn default() -> Self {
        Self::new(PREFERENCE_ENV)
    }
}

impl PreferenceSource for EnvPreference {
    fn raw_preference(&self) -> Option<String> {
        // Non-unicode values are treated as unset
        std::env::var(&self.var).ok()
    }

    fn env_var(&self) -> Option<&str> {
        Some(&self.var)
    }
}

/// Explicit preference value, used by the CLI override and by tests.
#[derive(Debug, Clone, Default)]
pub struct FixedPreference(Option<String>);

impl FixedPreference {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(Some(raw.into()))
    }

    /// A source with no value configured.
    pub fn unset() -> Self {
        Self(None)
    }
}

impl PreferenceSource for FixedPreference {
    fn raw_preference(&self) -> Option<String> {
        self.0.clone()
    }
}

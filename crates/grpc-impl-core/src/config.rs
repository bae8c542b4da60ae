//! Selector configuration.
//!
//! Provides serde-based TOML configuration for the selector: which
//! environment variables to read and where each backend library lives.
//! Every field has a default, so an empty file is a valid configuration.

use crate::build_gate::{BuildGate, BUILD_ENV};
use crate::errors::ConfigError;
use crate::preference::{EnvPreference, PREFERENCE_ENV};
use crate::probe::LibraryProbe;
use crate::selector::Selector;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Base name of the rust backend library.
pub const RUST_LIBRARY: &str = "grpc_rust_bindings";

/// Base name of the cython backend library.
pub const CYTHON_LIBRARY: &str = "cygrpc";

/// Symbol the cython backend must export to count as available.
pub const CYTHON_REQUIRED_SYMBOL: &str = "PyInit_cygrpc";

/// Root configuration for the selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Environment variable holding the backend preference
    #[serde(default = "default_preference_env")]
    pub preference_env: String,

    /// Environment variable gating the rust backend build
    #[serde(default = "default_build_env")]
    pub build_env: String,

    #[serde(default = "BackendConfig::rust")]
    pub rust: BackendConfig,

    #[serde(default = "BackendConfig::cython")]
    pub cython: BackendConfig,
}

fn default_preference_env() -> String {
    PREFERENCE_ENV.to_string()
}

fn default_build_env() -> String {
    BUILD_ENV.to_string()
}

/// Location of one backend library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Path, or bare file name resolved by the platform loader
    pub library: PathBuf,

    /// Symbol that must be exported for the backend to be usable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_symbol: Option<String>,
}

impl BackendConfig {
    /// Default rust backend: platform-decorated `grpc_rust_bindings`.
    pub fn rust() -> Self {
        Self {
            library: libloading::library_filename(RUST_LIBRARY).into(),
            required_symbol: None,
        }
    }

    /// Default cython backend: platform-decorated `cygrpc` exporting `PyInit_cygrpc`.
    pub fn cython() -> Self {
        Self {
            library: libloading::library_filename(CYTHON_LIBRARY).into(),
            required_symbol: Some(CYTHON_REQUIRED_SYMBOL.to_string()),
        }
    }

    fn probe(&self, name: &str) -> LibraryProbe {
        let probe = LibraryProbe::new(name, self.library.clone());
        match &self.required_symbol {
            Some(symbol) => probe.with_required_symbol(symbol.clone()),
            None => probe,
        }
    }

    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        if self.library.as_os_str().is_empty() {
            return Err(ConfigError::invalid(format!(
                "[{section}] library must not be empty"
            )));
        }
        if matches!(&self.required_symbol, Some(s) if s.is_empty()) {
            return Err(ConfigError::invalid(format!(
                "[{section}] required_symbol must not be empty when set"
            )));
        }
        Ok(())
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            preference_env: default_preference_env(),
            build_env: default_build_env(),
            rust: BackendConfig::rust(),
            cython: BackendConfig::cython(),
        }
    }
}

impl SelectorConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preference_env.is_empty() {
            return Err(ConfigError::invalid("preference_env must not be empty"));
        }
        if self.build_env.is_empty() {
            return Err(ConfigError::invalid("build_env must not be empty"));
        }
        self.rust.validate("rust")?;
        self.cython.validate("cython")?;
        Ok(())
    }

    pub fn rust_probe(&self) -> LibraryProbe {
        self.rust.probe("rust")
    }

    pub fn cython_probe(&self) -> LibraryProbe {
        self.cython.probe("cython")
    }

    pub fn build_gate(&self) -> BuildGate {
        BuildGate::new(self.build_env.clone())
    }
}

impl Selector {
    /// Selector reading the configured environment variable and probing the
    /// configured libraries.
    pub fn from_config(config: &SelectorConfig) -> Self {
        Selector::new(
            EnvPreference::new(config.preference_env.clone()),
            config.rust_probe(),
            config.cython_probe(),
        )
    }
}

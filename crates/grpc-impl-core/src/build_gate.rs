//! Decides whether the rust backend should be built.
//!
//! Building requires both an opt-in flag and a working toolchain. The flag
//! defaults to off; toolchain presence comes from a [`ToolchainProbe`].

use std::process::{Command, Stdio};

/// Default environment variable opting into the rust backend build.
pub const BUILD_ENV: &str = "GRPC_PYTHON_BUILD_WITH_RUST";

const TRUTHY: [&str; 3] = ["true", "1", "yes"];

/// Reports whether a Rust toolchain can be invoked.
pub trait ToolchainProbe: Send + Sync {
    fn toolchain_available(&self) -> bool;
}

/// Runs `cargo --version`; spawn errors and non-zero exits mean no toolchain.
#[derive(Debug, Clone)]
pub struct CargoToolchain {
    program: String,
}

impl CargoToolchain {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for CargoToolchain {
    fn default() -> Self {
        Self::new("cargo")
    }
}

impl ToolchainProbe for CargoToolchain {
    fn toolchain_available(&self) -> bool {
        match Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) if status.success() => true,
            Ok(status) => {
                log::debug!("{} --version exited with {}", self.program, status);
                false
            }
            Err(e) => {
                log::debug!("{} not runnable: {}", self.program, e);
                false
            }
        }
    }
}

/// Toolchain probe with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticToolchain(pub bool);

impl ToolchainProbe for StaticToolchain {
    fn toolchain_available(&self) -> bool {
        self.0
    }
}

/// True when the flag value is one of `true`, `1`, `yes` (any case).
pub fn build_flag_enabled(flag: Option<&str>) -> bool {
    flag.map(|v| TRUTHY.contains(&v.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Whether the rust backend should be built.
///
/// The toolchain is only probed when the flag is enabled.
pub fn should_build_rust(flag: Option<&str>, toolchain: &dyn ToolchainProbe) -> bool {
    build_flag_enabled(flag) && toolchain.toolchain_available()
}

/// Build flag source plus toolchain probe.
pub struct BuildGate {
    env_var: String,
    toolchain: Box<dyn ToolchainProbe>,
}

impl BuildGate {
    /// Gate reading `env_var` and probing `cargo` on `PATH`.
    pub fn new(env_var: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
            toolchain: Box::new(CargoToolchain::default()),
        }
    }

    pub fn with_toolchain(mut self, toolchain: impl ToolchainProbe + 'static) -> Self {
        self.toolchain = Box::new(toolchain);
        self
    }

    pub fn env_var(&self) -> &str {
        &self.env_var
    }

    /// Reads the flag from the environment and applies [`should_build_rust`].
    pub fn should_build_rust(&self) -> bool {
        let flag = std::env::var(&self.env_var).ok();
        let decision = should_build_rust(flag.as_deref(), self.toolchain.as_ref());
        log::info!(
            "Rust backend build {} ({}={})",
            if decision { "enabled" } else { "disabled" },
            self.env_var,
            flag.as_deref().unwrap_or("<unset>")
        );
        decision
    }
}

impl Default for BuildGate {
    fn default() -> Self {
        Self::new(BUILD_ENV)
    }
}

//! # grpc-impl-core
//!
//! Selects which native backend of gRPC Python is active: the Rust bindings
//! or the Cython extension.
//!
//! The crate is organized around one decision:
//! - **Preference**: what the user asked for (`GRPC_PYTHON_IMPLEMENTATION`),
//!   read fresh on every query
//! - **Probes**: whether each backend library can be loaded right now
//! - **Selector**: the decision table combining the two, with fallback
//!
//! ## Resolution
//! ```text
//! preference ──┐
//!              ├──► resolve() ──► Resolution { active, fallback }
//! probes ──────┘                        │
//!                                       └──► ImplementationInfo / describe()
//! ```
//!
//! ## Usage
//! ```rust
//! use grpc_impl_core::{ActiveImplementation, FixedPreference, Selector, StaticProbe};
//!
//! let selector = Selector::new(
//!     FixedPreference::new("rust"),
//!     StaticProbe::new("rust", false),
//!     StaticProbe::new("cython", true),
//! );
//!
//! let resolution = selector.resolve_active()?;
//! assert_eq!(resolution.active, ActiveImplementation::Cython);
//! assert!(resolution.is_fallback());
//! # Ok::<(), grpc_impl_core::SelectorError>(())
//! ```

pub mod build_gate;
pub mod config;
pub mod errors;
pub mod preference;
pub mod probe;
pub mod selector;

// Re-export commonly used items
pub use build_gate::{
    should_build_rust, BuildGate, CargoToolchain, StaticToolchain, ToolchainProbe, BUILD_ENV,
};
pub use config::{BackendConfig, SelectorConfig};
pub use errors::{ConfigError, Result, SelectorError};
pub use preference::{
    ActiveImplementation, EnvPreference, FixedPreference, Preference, PreferenceSource,
    PREFERENCE_ENV,
};
pub use probe::{BackendProbe, LibraryProbe, StaticProbe};
pub use selector::{
    describe, resolve, Availability, Fallback, ImplementationInfo, MatrixRow, Resolution,
    Selector,
};

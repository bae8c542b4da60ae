//! Backend selection.
//!
//! [`resolve`] is the decision table: a pure function of the preference and
//! the two availability bits. [`Selector`] wires that table to a preference
//! source and two probes, re-reading both on every call. Fallback warnings
//! are reported as data ([`Resolution::fallback`]); only [`Selector::active`]
//! turns them into log output.

use crate::errors::{Result, SelectorError};
use crate::preference::{ActiveImplementation, Preference, PreferenceSource};
use crate::probe::BackendProbe;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Availability of both backends at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Availability {
    pub rust: bool,
    pub cython: bool,
}

impl Availability {
    pub fn new(rust: bool, cython: bool) -> Self {
        Self { rust, cython }
    }

    pub fn is_available(&self, implementation: ActiveImplementation) -> bool {
        match implementation {
            ActiveImplementation::Rust => self.rust,
            ActiveImplementation::Cython => self.cython,
        }
    }
}

/// An explicitly requested backend was unavailable and the other one was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fallback {
    pub requested: ActiveImplementation,
    pub used: ActiveImplementation,
}

impl Fallback {
    /// Warning text for this fallback.
    pub fn warning(&self) -> String {
        format!(
            "{} implementation requested but not available. Falling back to {}.",
            self.requested.display_name(),
            self.used.display_name()
        )
    }
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub active: ActiveImplementation,
    /// Set when the preference named the other backend.
    pub fallback: Option<Fallback>,
}

impl Resolution {
    fn direct(active: ActiveImplementation) -> Self {
        Self {
            active,
            fallback: None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Applies the selection table.
///
/// An explicit preference is honoured when its backend is available and
/// otherwise falls back to the other backend. `auto` tries rust first, then
/// cython, without flagging a fallback. Fails only when neither backend is
/// available.
pub fn resolve(preference: Preference, availability: Availability) -> Result<Resolution> {
    match preference.requested() {
        Some(requested) => {
            if availability.is_available(requested) {
                Ok(Resolution::direct(requested))
            } else if availability.is_available(requested.other()) {
                Ok(Resolution {
                    active: requested.other(),
                    fallback: Some(Fallback {
                        requested,
                        used: requested.other(),
                    }),
                })
            } else {
                Err(SelectorError::unavailable(preference))
            }
        }
        None => {
            if availability.rust {
                Ok(Resolution::direct(ActiveImplementation::Rust))
            } else if availability.cython {
                Ok(Resolution::direct(ActiveImplementation::Cython))
            } else {
                Err(SelectorError::unavailable(preference))
            }
        }
    }
}

/// Snapshot of the selector's inputs and decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationInfo {
    pub preference: Preference,
    pub rust_available: bool,
    pub cython_available: bool,
    pub active: ActiveImplementation,
}

impl ImplementationInfo {
    pub fn availability(&self) -> Availability {
        Availability::new(self.rust_available, self.cython_available)
    }

    /// Fallback implied by the snapshot, if the preference named the other backend.
    pub fn fallback(&self) -> Option<Fallback> {
        self.preference
            .requested()
            .filter(|requested| *requested != self.active)
            .map(|requested| Fallback {
                requested,
                used: self.active,
            })
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback().is_some()
    }
}

/// Renders an info snapshot for humans.
pub fn describe(info: &ImplementationInfo) -> String {
    let availability = info.availability();
    let mut out = String::new();
    let _ = writeln!(out, "gRPC Python Implementation Info:");
    let _ = writeln!(out, "  Preference: {}", info.preference);
    let _ = writeln!(out, "  Rust available: {}", availability.rust);
    let _ = writeln!(out, "  Cython available: {}", availability.cython);
    let _ = writeln!(out, "  Active implementation: {}", info.active);
    if info.is_fallback() {
        let _ = write!(
            out,
            "  ✓ Using {} implementation (fallback from {})",
            info.active.display_name(),
            info.preference
        );
    } else {
        let _ = write!(out, "  ✓ Using {} implementation", info.active.display_name());
    }
    out
}

/// One line of the preference switching matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixRow {
    pub preference: Preference,
    pub outcome: Result<Resolution>,
}

/// Resolves the active backend from a preference source and two probes.
pub struct Selector {
    source: Box<dyn PreferenceSource>,
    rust: Box<dyn BackendProbe>,
    cython: Box<dyn BackendProbe>,
}

impl Selector {
    pub fn new(
        source: impl PreferenceSource + 'static,
        rust: impl BackendProbe + 'static,
        cython: impl BackendProbe + 'static,
    ) -> Self {
        Self {
            source: Box::new(source),
            rust: Box::new(rust),
            cython: Box::new(cython),
        }
    }

    /// Swaps the preference source, keeping the probes.
    pub fn with_source(mut self, source: impl PreferenceSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    /// Current preference, read fresh from the source.
    pub fn get_preference(&self) -> Preference {
        Preference::parse(self.source.raw_preference().as_deref())
    }

    pub fn probe_rust_available(&self) -> bool {
        self.rust.is_available()
    }

    pub fn probe_cython_available(&self) -> bool {
        self.cython.is_available()
    }

    /// Probes both backends once.
    pub fn availability(&self) -> Availability {
        Availability::new(self.probe_rust_available(), self.probe_cython_available())
    }

    /// Reads the preference, probes both backends and applies the table.
    ///
    /// No warning is emitted; inspect [`Resolution::fallback`].
    pub fn resolve_active(&self) -> Result<Resolution> {
        let preference = self.get_preference();
        let availability = self.availability();
        log::debug!(
            "Resolving backend: preference={}, rust={}, cython={}",
            preference,
            availability.rust,
            availability.cython
        );
        resolve(preference, availability)
    }

    /// Like [`Selector::resolve_active`], logging a warning on fallback.
    pub fn active(&self) -> Result<ActiveImplementation> {
        let resolution = self.resolve_active()?;
        if let Some(fallback) = resolution.fallback {
            log::warn!("{}", fallback.warning());
        }
        Ok(resolution.active)
    }

    /// Snapshot of preference, availability and active backend.
    ///
    /// Each input is read exactly once so the snapshot is self-consistent.
    pub fn get_info(&self) -> Result<ImplementationInfo> {
        let preference = self.get_preference();
        let availability = self.availability();
        let resolution = resolve(preference, availability)?;
        Ok(ImplementationInfo {
            preference,
            rust_available: availability.rust,
            cython_available: availability.cython,
            active: resolution.active,
        })
    }

    /// Resolves every preference against a single availability snapshot.
    pub fn switching_matrix(&self) -> Vec<MatrixRow> {
        let availability = self.availability();
        Preference::ALL
            .iter()
            .map(|&preference| MatrixRow {
                preference,
                outcome: resolve(preference, availability),
            })
            .collect()
    }

    /// Environment pair that forces `preference` in a child process.
    ///
    /// Uses the source's variable name when it is environment-backed and the
    /// default [`crate::PREFERENCE_ENV`] otherwise.
    pub fn child_env(&self, preference: Preference) -> (String, String) {
        let var = self
            .source
            .env_var()
            .unwrap_or(crate::preference::PREFERENCE_ENV);
        (var.to_string(), preference.as_str().to_string())
    }
}

impl std::fmt::Debug for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector")
            .field("env_var", &self.source.env_var())
            .field("rust", &self.rust.name())
            .field("cython", &self.cython.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preference::FixedPreference;
    use crate::probe::StaticProbe;
    use std::sync::Arc;

    fn selector(pref: Option<&str>, rust: bool, cython: bool) -> Selector {
        let source = match pref {
            Some(p) => FixedPreference::new(p),
            None => FixedPreference::unset(),
        };
        Selector::new(
            source,
            StaticProbe::new("rust", rust),
            StaticProbe::new("cython", cython),
        )
    }

    #[test]
    fn test_resolution_table() {
        use ActiveImplementation::{Cython, Rust};
        // (preference, rust, cython, expected active, fallback expected)
        let cases = [
            (Preference::Rust, true, true, Some(Rust), false),
            (Preference::Rust, true, false, Some(Rust), false),
            (Preference::Rust, false, true, Some(Cython), true),
            (Preference::Rust, false, false, None, false),
            (Preference::Cython, true, true, Some(Cython), false),
            (Preference::Cython, false, true, Some(Cython), false),
            (Preference::Cython, true, false, Some(Rust), true),
            (Preference::Cython, false, false, None, false),
            (Preference::Auto, true, true, Some(Rust), false),
            (Preference::Auto, true, false, Some(Rust), false),
            (Preference::Auto, false, true, Some(Cython), false),
            (Preference::Auto, false, false, None, false),
        ];

        for (preference, rust, cython, expected, fallback) in cases {
            let outcome = resolve(preference, Availability::new(rust, cython));
            match expected {
                Some(active) => {
                    let resolution = outcome.expect("resolution should succeed");
                    assert_eq!(resolution.active, active, "{preference} {rust} {cython}");
                    assert_eq!(resolution.is_fallback(), fallback);
                }
                None => {
                    assert_eq!(outcome, Err(SelectorError::unavailable(preference)));
                }
            }
        }
    }

    #[test]
    fn test_fallback_records_requested_and_used() {
        let resolution = resolve(Preference::Rust, Availability::new(false, true)).unwrap();
        assert_eq!(
            resolution.fallback,
            Some(Fallback {
                requested: ActiveImplementation::Rust,
                used: ActiveImplementation::Cython,
            })
        );
        assert_eq!(
            resolution.fallback.unwrap().warning(),
            "Rust implementation requested but not available. Falling back to Cython."
        );
    }

    #[test]
    fn test_scenario_rust_preferred_and_available() {
        let resolution = selector(Some("rust"), true, false).resolve_active().unwrap();
        assert_eq!(resolution.active, ActiveImplementation::Rust);
        assert!(resolution.fallback.is_none());
    }

    #[test]
    fn test_scenario_rust_preferred_falls_back_once() {
        let resolution = selector(Some("rust"), false, true).resolve_active().unwrap();
        assert_eq!(resolution.active, ActiveImplementation::Cython);
        assert!(resolution.fallback.is_some());
    }

    #[test]
    fn test_scenario_cython_preferred_nothing_available() {
        let err = selector(Some("cython"), false, false)
            .resolve_active()
            .unwrap_err();
        assert_eq!(err, SelectorError::unavailable(Preference::Cython));
    }

    #[test]
    fn test_scenario_auto_prefers_rust() {
        let active = selector(Some("auto"), true, true).active().unwrap();
        assert_eq!(active, ActiveImplementation::Rust);
    }

    #[test]
    fn test_unset_and_bogus_behave_like_auto() {
        for (rust, cython) in [(true, true), (true, false), (false, true), (false, false)] {
            let auto = selector(Some("auto"), rust, cython).get_info();
            assert_eq!(selector(None, rust, cython).get_info(), auto);
            assert_eq!(selector(Some("BOGUS"), rust, cython).get_info(), auto);
        }
        assert_eq!(selector(None, true, true).get_preference(), Preference::Auto);
        assert_eq!(
            selector(Some("BOGUS"), true, true).get_preference(),
            Preference::Auto
        );
    }

    #[test]
    fn test_get_info_fields() {
        let info = selector(Some("Cython"), true, false).get_info().unwrap();
        assert_eq!(
            info,
            ImplementationInfo {
                preference: Preference::Cython,
                rust_available: true,
                cython_available: false,
                active: ActiveImplementation::Rust,
            }
        );
        assert!(info.is_fallback());
    }

    #[test]
    fn test_get_info_fails_exactly_when_resolution_fails() {
        for preference in ["rust", "cython", "auto"] {
            for (rust, cython) in [(true, true), (true, false), (false, true), (false, false)] {
                let sel = selector(Some(preference), rust, cython);
                assert_eq!(sel.get_info().is_err(), sel.resolve_active().is_err());
                assert_eq!(sel.get_info().is_err(), !rust && !cython);
            }
        }
    }

    #[test]
    fn test_get_info_is_idempotent() {
        let sel = selector(Some("rust"), false, true);
        let first = sel.get_info().unwrap();
        for _ in 0..5 {
            assert_eq!(sel.get_info().unwrap(), first);
        }
    }

    #[test]
    fn test_probes_are_not_cached_across_calls() {
        let rust = Arc::new(StaticProbe::new("rust", true));
        let cython = Arc::new(StaticProbe::new("cython", true));
        let sel = Selector::new(FixedPreference::unset(), rust.clone(), cython.clone());

        sel.get_info().unwrap();
        assert_eq!((rust.calls(), cython.calls()), (1, 1));

        sel.get_info().unwrap();
        sel.resolve_active().unwrap();
        assert_eq!((rust.calls(), cython.calls()), (3, 3));
    }

    #[test]
    fn test_switching_matrix_probes_once() {
        let rust = Arc::new(StaticProbe::new("rust", false));
        let cython = Arc::new(StaticProbe::new("cython", true));
        let sel = Selector::new(FixedPreference::unset(), rust.clone(), cython.clone());

        let rows = sel.switching_matrix();
        assert_eq!(rows.len(), 3);
        assert_eq!((rust.calls(), cython.calls()), (1, 1));

        let actives: Vec<_> = rows
            .iter()
            .map(|row| (row.preference, row.outcome.as_ref().map(|r| r.active).ok()))
            .collect();
        assert_eq!(
            actives,
            vec![
                (Preference::Rust, Some(ActiveImplementation::Cython)),
                (Preference::Cython, Some(ActiveImplementation::Cython)),
                (Preference::Auto, Some(ActiveImplementation::Cython)),
            ]
        );
        assert!(rows[0].outcome.as_ref().unwrap().is_fallback());
    }

    #[test]
    fn test_child_env_defaults_to_standard_variable() {
        let sel = selector(None, true, true);
        assert_eq!(
            sel.child_env(Preference::Cython),
            (
                "GRPC_PYTHON_IMPLEMENTATION".to_string(),
                "cython".to_string()
            )
        );
    }

    #[test]
    fn test_describe_verdicts() {
        let info = ImplementationInfo {
            preference: Preference::Auto,
            rust_available: true,
            cython_available: true,
            active: ActiveImplementation::Rust,
        };
        let text = describe(&info);
        assert!(text.starts_with("gRPC Python Implementation Info:"));
        assert!(text.contains("  Preference: auto"));
        assert!(text.contains("  Rust available: true"));
        assert!(text.contains("  Cython available: true"));
        assert!(text.contains("  Active implementation: rust"));
        assert!(text.ends_with("✓ Using Rust implementation"));

        let fallback = ImplementationInfo {
            preference: Preference::Rust,
            rust_available: false,
            cython_available: true,
            active: ActiveImplementation::Cython,
        };
        assert!(describe(&fallback).ends_with("✓ Using Cython implementation (fallback from rust)"));
    }
}

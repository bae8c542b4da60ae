//! Availability probes for the native backends.
//!
//! A probe answers "can this backend be loaded right now". The real probe
//! attempts a dynamic library load (and optionally resolves a required
//! symbol); the static probe returns a fixed answer so every availability
//! combination can be exercised without native backends on disk.
//!
//! Probes never fail: every loader error is logged at debug level and
//! reported as `false`.

use libloading::Library;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Capability check for one backend.
pub trait BackendProbe: Send + Sync {
    /// Short label used in log lines.
    fn name(&self) -> &str;

    /// Returns true when the backend can be loaded and used.
    fn is_available(&self) -> bool;
}

/// Probes a backend by loading its dynamic library.
#[derive(Debug, Clone)]
pub struct LibraryProbe {
    name: String,
    library: PathBuf,
    required_symbol: Option<String>,
}

impl LibraryProbe {
    /// Probe that only requires the library to load.
    pub fn new(name: impl Into<String>, library: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            library: library.into(),
            required_symbol: None,
        }
    }

    /// Also require the loaded library to export `symbol`.
    pub fn with_required_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.required_symbol = Some(symbol.into());
        self
    }

    pub fn required_symbol(&self) -> Option<&str> {
        self.required_symbol.as_deref()
    }

    fn try_load(&self) -> Result<(), String> {
        // SAFETY: loading runs the library's initializers. Backend libraries
        // are trusted build artifacts; running their init is the probe cost.
        let lib = unsafe { Library::new(&self.library) }
            .map_err(|e| format!("failed to load {}: {}", self.library.display(), e))?;

        if let Some(symbol) = &self.required_symbol {
            // SAFETY: the symbol is only looked up, never dereferenced or called.
            unsafe { lib.get::<*const std::ffi::c_void>(symbol.as_bytes()) }
                .map_err(|e| format!("symbol {} not found: {}", symbol, e))?;
        }

        Ok(())
    }
}

impl BackendProbe for LibraryProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        match self.try_load() {
            Ok(()) => {
                log::debug!("{} backend available ({})", self.name, self.library.display());
                true
            }
            Err(e) => {
                log::debug!("{} backend unavailable: {}", self.name, e);
                false
            }
        }
    }
}

/// Fixed-answer probe that counts how often it was queried.
#[derive(Debug)]
pub struct StaticProbe {
    name: String,
    available: bool,
    calls: AtomicUsize,
}

impl StaticProbe {
    pub fn new(name: impl Into<String>, available: bool) -> Self {
        Self {
            name: name.into(),
            available,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of times `is_available` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl BackendProbe for StaticProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.available
    }
}

impl<P: BackendProbe + ?Sized> BackendProbe for std::sync::Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

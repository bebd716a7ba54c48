#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # Hybrid Backend Detection
//!
//! Decides once per process whether hybrid key exchange can be negotiated.
//!
//! The probe asks the hybrid-capable rustls provider which key-exchange
//! groups it implements and reports the backend as available iff at least
//! one of them is a registered hybrid group. Detection never fails: any
//! problem, including a panic inside the probe, is reported through
//! [`DetectionResult::error`].
//!
//! A native liboqs install is looked up for diagnostics only. Finding one
//! says nothing about what this process is linked against.

use std::any::Any;
use std::env;
use std::fmt;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use rustls::crypto::CryptoProvider;
use serde::Serialize;

use crate::kex;
use crate::registry::HYBRID_GROUP_NAMES;

/// Identity of the linked hybrid-capable backend.
pub const BACKEND_VERSION: &str = "aws-lc-rs (rustls-post-quantum 0.2)";

/// Environment variable naming a liboqs install prefix.
pub const OQS_INSTALL_PATH_ENV: &str = "OQS_INSTALL_PATH";

const STANDARD_LIBRARY_DIRS: [&str; 5] =
    ["/usr/local/lib", "/usr/lib", "/opt/oqs/lib", "/usr/lib/x86_64-linux-gnu", "/usr/lib64"];

const LIBRARY_FILE_NAMES: [&str; 3] = ["liboqs.so", "liboqs.dylib", "liboqs.a"];

/// Outcome of probing for a hybrid-capable backend.
///
/// `available` is false exactly when `error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionResult {
    available: bool,
    backend_path: Option<PathBuf>,
    supported_groups: Vec<String>,
    backend_version: String,
    error: Option<String>,
}

impl DetectionResult {
    /// A usable backend.
    #[must_use]
    pub fn available(backend_path: Option<PathBuf>, backend_version: impl Into<String>) -> Self {
        Self {
            available: true,
            backend_path,
            supported_groups: list_supported_groups(),
            backend_version: backend_version.into(),
            error: None,
        }
    }

    /// No usable backend, with the reason.
    #[must_use]
    pub fn unavailable(
        error: impl Into<String>,
        backend_path: Option<PathBuf>,
        backend_version: impl Into<String>,
    ) -> Self {
        Self {
            available: false,
            backend_path,
            supported_groups: list_supported_groups(),
            backend_version: backend_version.into(),
            error: Some(error.into()),
        }
    }

    /// Whether hybrid groups can be negotiated.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// liboqs install found on disk, if any.
    #[must_use]
    pub fn backend_path(&self) -> Option<&Path> {
        self.backend_path.as_deref()
    }

    /// Canonical registry names. Never empty.
    #[must_use]
    pub fn supported_groups(&self) -> &[String] {
        &self.supported_groups
    }

    /// See [`BACKEND_VERSION`].
    #[must_use]
    pub fn backend_version(&self) -> &str {
        &self.backend_version
    }

    /// Why the backend is unavailable.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Source of detection results.
pub trait Detector: Send + Sync + fmt::Debug {
    /// Report backend availability. Must not panic.
    fn detect(&self) -> DetectionResult;
}

/// Process-wide cached probe; see [`verify_hybrid_support`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CachedDetector;

impl Detector for CachedDetector {
    fn detect(&self) -> DetectionResult {
        verify_hybrid_support().clone()
    }
}

/// Uncached probe.
#[derive(Clone)]
pub struct BackendDetector {
    search_dirs: Vec<PathBuf>,
    backend: fn() -> CryptoProvider,
}

impl fmt::Debug for BackendDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendDetector").field("search_dirs", &self.search_dirs).finish_non_exhaustive()
    }
}

impl Default for BackendDetector {
    fn default() -> Self {
        Self { search_dirs: default_search_dirs(), backend: kex::hybrid_backend }
    }
}

impl BackendDetector {
    /// Probe the linked backend, searching the default library directories.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the library search directories.
    #[must_use]
    pub fn with_search_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_dirs = dirs;
        self
    }

    /// Probe a different provider constructor.
    #[must_use]
    pub fn with_backend(mut self, backend: fn() -> CryptoProvider) -> Self {
        self.backend = backend;
        self
    }
}

impl Detector for BackendDetector {
    fn detect(&self) -> DetectionResult {
        let backend_path = locate_in(&self.search_dirs);
        let backend = self.backend;

        let result = match panic::catch_unwind(|| kex::offered_hybrid_groups(&backend())) {
            Ok(groups) if !groups.is_empty() => {
                let names: Vec<&str> = groups.iter().map(|g| g.name()).collect();
                tracing::info!(groups = ?names, "hybrid key exchange available");
                DetectionResult::available(backend_path, BACKEND_VERSION)
            }
            Ok(_) => DetectionResult::unavailable(
                "backend offers no registered hybrid group",
                backend_path,
                BACKEND_VERSION,
            ),
            Err(payload) => DetectionResult::unavailable(
                format!("backend probe panicked: {}", panic_message(payload.as_ref())),
                backend_path,
                BACKEND_VERSION,
            ),
        };

        if let Some(error) = result.error() {
            tracing::info!(error, "hybrid key exchange unavailable");
        }
        result
    }
}

/// Fixed answer, for forcing either outcome.
#[derive(Debug, Clone)]
pub struct FixedDetector(DetectionResult);

impl FixedDetector {
    /// Always reports `result`.
    #[must_use]
    pub fn new(result: DetectionResult) -> Self {
        Self(result)
    }

    /// Always available.
    #[must_use]
    pub fn available() -> Self {
        Self(DetectionResult::available(None, BACKEND_VERSION))
    }

    /// Always unavailable for `reason`.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self(DetectionResult::unavailable(reason, None, BACKEND_VERSION))
    }
}

impl Detector for FixedDetector {
    fn detect(&self) -> DetectionResult {
        self.0.clone()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

/// Probe once and cache the result for the life of the process.
///
/// Concurrent first callers all observe the same result.
pub fn verify_hybrid_support() -> &'static DetectionResult {
    static DETECTION: OnceLock<DetectionResult> = OnceLock::new();
    DETECTION.get_or_init(|| BackendDetector::default().detect())
}

/// Location of a liboqs library in the default search directories.
#[must_use]
pub fn locate_backend_path() -> Option<PathBuf> {
    locate_in(&default_search_dirs())
}

/// The six canonical registry names, regardless of availability.
#[must_use]
pub fn list_supported_groups() -> Vec<String> {
    HYBRID_GROUP_NAMES.iter().map(|name| (*name).to_string()).collect()
}

fn default_search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(root) = env::var_os(OQS_INSTALL_PATH_ENV).filter(|v| !v.is_empty()) {
        let root = PathBuf::from(root);
        dirs.push(root.join("lib"));
        dirs.push(root);
    }
    dirs.extend(STANDARD_LIBRARY_DIRS.iter().map(PathBuf::from));
    dirs
}

fn locate_in(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| LIBRARY_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

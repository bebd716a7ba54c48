#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # Fallback Coordinator
//!
//! The one place that decides between hybrid and standard TLS. Integration
//! points call [`FallbackCoordinator::setup_context`] and always get a usable
//! [`ContextHandle`] back:
//!
//! 1. quantum-safe not requested: standard context, no detection
//! 2. backend unavailable: standard context
//! 3. hybrid construction fails (or panics): warning, standard context
//! 4. otherwise: the hybrid context
//!
//! ```no_run
//! use hybrid_tls::builder::Endpoint;
//! use hybrid_tls::fallback::FallbackCoordinator;
//!
//! let handle = FallbackCoordinator::new().setup_context(true, None, &Endpoint::Client);
//! println!("{} ({:?})", handle.mode(), handle.fallback_reason());
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::builder::{ContextFactory, Endpoint, HybridContextFactory};
use crate::config::HybridTlsConfig;
use crate::context::{ContextHandle, FallbackReason};
use crate::detect::{CachedDetector, Detector};
use crate::error::TlsError;
use crate::tracing::ContextSpan;

/// Chooses between hybrid and standard contexts.
#[derive(Debug, Clone)]
pub struct FallbackCoordinator {
    detector: Arc<dyn Detector>,
    factory: Arc<dyn ContextFactory>,
}

impl Default for FallbackCoordinator {
    fn default() -> Self {
        Self { detector: Arc::new(CachedDetector), factory: Arc::new(HybridContextFactory) }
    }
}

impl FallbackCoordinator {
    /// Process-wide cached detection and the real builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the detector.
    #[must_use]
    pub fn with_detector(mut self, detector: impl Detector + 'static) -> Self {
        self.detector = Arc::new(detector);
        self
    }

    /// Replace the context factory.
    #[must_use]
    pub fn with_factory(mut self, factory: impl ContextFactory + 'static) -> Self {
        self.factory = Arc::new(factory);
        self
    }

    /// Build a context for `endpoint`. Never fails.
    ///
    /// `config` defaults to [`HybridTlsConfig::default`] and is also used for
    /// the standard context (minimum version, verification, CA path).
    #[must_use]
    pub fn setup_context(
        &self,
        use_quantum_safe: bool,
        config: Option<&HybridTlsConfig>,
        endpoint: &Endpoint,
    ) -> ContextHandle {
        let default_config;
        let config = match config {
            Some(config) => config,
            None => {
                default_config = HybridTlsConfig::default();
                &default_config
            }
        };

        let span = ContextSpan::new(endpoint_name(endpoint), use_quantum_safe);
        let handle = span.in_scope(|| self.decide(use_quantum_safe, config, endpoint, &span));
        span.complete(&handle);
        handle
    }

    fn decide(
        &self,
        use_quantum_safe: bool,
        config: &HybridTlsConfig,
        endpoint: &Endpoint,
        span: &ContextSpan,
    ) -> ContextHandle {
        if !use_quantum_safe {
            return self.standard(config, endpoint, FallbackReason::Disabled);
        }

        let detection = self.detector.detect();
        if !detection.is_available() {
            let detail = detection.error().unwrap_or("unknown").to_string();
            return self.standard(config, endpoint, FallbackReason::BackendUnavailable { detail });
        }

        let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
            self.factory.hybrid(config, endpoint, &detection)
        }))
        .unwrap_or_else(|_| Err(TlsError::internal("hybrid context construction panicked")));

        match attempt {
            Ok(handle) => handle,
            Err(error) => {
                span.absorbed(&error);
                let reason = FallbackReason::ConstructionFailed {
                    code: error.code(),
                    message: error.to_string(),
                };
                self.standard(config, endpoint, reason)
            }
        }
    }

    fn standard(
        &self,
        config: &HybridTlsConfig,
        endpoint: &Endpoint,
        reason: FallbackReason,
    ) -> ContextHandle {
        self.factory.standard(config, endpoint).with_fallback_reason(reason)
    }
}

fn endpoint_name(endpoint: &Endpoint) -> &'static str {
    match endpoint {
        Endpoint::Client => "client",
        Endpoint::Server(_) => "server",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::context::ContextMode;
    use crate::detect::{DetectionResult, FixedDetector};
    use crate::error::ErrorCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingFactory {
        hybrid_calls: AtomicUsize,
    }

    impl ContextFactory for CountingFactory {
        fn hybrid(
            &self,
            config: &HybridTlsConfig,
            endpoint: &Endpoint,
            detection: &DetectionResult,
        ) -> Result<ContextHandle, TlsError> {
            self.hybrid_calls.fetch_add(1, Ordering::SeqCst);
            HybridContextFactory.hybrid(config, endpoint, detection)
        }
    }

    #[derive(Debug)]
    struct PanickingFactory;

    impl ContextFactory for PanickingFactory {
        fn hybrid(
            &self,
            _config: &HybridTlsConfig,
            _endpoint: &Endpoint,
            _detection: &DetectionResult,
        ) -> Result<ContextHandle, TlsError> {
            panic!("simulated fault")
        }
    }

    fn unverified() -> HybridTlsConfig {
        HybridTlsConfig::without_verification()
    }

    #[test]
    fn test_disabled_never_detects_or_builds_hybrid() {
        let factory = Arc::new(CountingFactory::default());
        let coordinator = FallbackCoordinator {
            detector: Arc::new(FixedDetector::available()),
            factory: factory.clone(),
        };
        let handle = coordinator.setup_context(false, Some(&unverified()), &Endpoint::Client);
        assert_eq!(handle.mode(), ContextMode::Standard);
        assert_eq!(handle.fallback_reason(), Some(&FallbackReason::Disabled));
        assert_eq!(factory.hybrid_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unavailable_backend() {
        let coordinator =
            FallbackCoordinator::new().with_detector(FixedDetector::unavailable("forced"));
        let handle = coordinator.setup_context(true, Some(&unverified()), &Endpoint::Client);
        assert_eq!(handle.mode(), ContextMode::Standard);
        assert!(matches!(
            handle.fallback_reason(),
            Some(FallbackReason::BackendUnavailable { detail }) if detail == "forced"
        ));
    }

    #[test]
    fn test_hybrid_success() {
        let coordinator = FallbackCoordinator::new().with_detector(FixedDetector::available());
        let handle = coordinator.setup_context(true, Some(&unverified()), &Endpoint::Client);
        assert_eq!(handle.mode(), ContextMode::Hybrid);
        assert!(handle.fallback_reason().is_none());
    }

    #[test]
    fn test_construction_error_is_absorbed() {
        let config = unverified().to_builder().with_classical_curve("p384").build().unwrap();
        let coordinator = FallbackCoordinator::new().with_detector(FixedDetector::available());
        let handle = coordinator.setup_context(true, Some(&config), &Endpoint::Client);
        assert_eq!(handle.mode(), ContextMode::Standard);
        assert!(matches!(
            handle.fallback_reason(),
            Some(FallbackReason::ConstructionFailed { code: ErrorCode::UnsupportedCombination, .. })
        ));
    }

    #[test]
    fn test_panic_is_absorbed() {
        let coordinator = FallbackCoordinator::new()
            .with_detector(FixedDetector::available())
            .with_factory(PanickingFactory);
        let handle = coordinator.setup_context(true, Some(&unverified()), &Endpoint::Client);
        assert_eq!(handle.mode(), ContextMode::Standard);
        assert!(matches!(
            handle.fallback_reason(),
            Some(FallbackReason::ConstructionFailed { code: ErrorCode::InternalError, .. })
        ));
    }
}

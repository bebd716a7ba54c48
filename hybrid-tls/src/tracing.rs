#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # Structured Tracing for Context Construction
//!
//! Subscriber setup for binaries and tests, and [`ContextSpan`], which wraps
//! one `setup_context` call so that its outcome (hybrid or fallback) and
//! duration are logged under a single span.

use std::time::{Duration, Instant};

use tracing::{Level, Span, debug, info, span, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::context::{ContextHandle, FallbackReason};
use crate::error::TlsError;

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Default level when `RUST_LOG` is unset
    pub log_level: Level,
    /// Include the event target
    pub with_target: bool,
    /// Include thread ids
    pub with_thread_ids: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self { log_level: Level::INFO, with_target: true, with_thread_ids: false }
    }
}

impl TracingConfig {
    /// Debug level, thread ids on.
    #[must_use]
    pub fn debug() -> Self {
        Self { log_level: Level::DEBUG, with_thread_ids: true, ..Default::default() }
    }
}

/// Install a global fmt subscriber filtered by `RUST_LOG`.
///
/// # Errors
///
/// Returns [`TlsError::Internal`] if a global subscriber is already set.
///
/// # Example
/// ```no_run
/// use hybrid_tls::tracing::{init_tracing, TracingConfig};
///
/// init_tracing(&TracingConfig::default())?;
/// # Ok::<(), hybrid_tls::TlsError>(())
/// ```
pub fn init_tracing(config: &TracingConfig) -> Result<(), TlsError> {
    let filter =
        EnvFilter::builder().with_default_directive(config.log_level.into()).from_env_lossy();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(config.with_target).with_thread_ids(config.with_thread_ids))
        .with(filter)
        .try_init()
        .map_err(|e| TlsError::internal(format!("tracing subscriber already installed: {e}")))
}

/// Span around one context setup.
#[derive(Debug)]
pub struct ContextSpan {
    span: Span,
    start_time: Instant,
}

impl ContextSpan {
    /// Open a span for `endpoint` (`"client"` or `"server"`).
    pub fn new(endpoint: &str, use_quantum_safe: bool) -> Self {
        let span = span!(
            Level::INFO,
            "tls_context_setup",
            endpoint = %endpoint,
            use_quantum_safe,
        );

        span.in_scope(|| {
            debug!("setting up TLS context");
        });

        Self { span, start_time: Instant::now() }
    }

    /// Time since the span was opened.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Run `f` inside the span.
    pub fn in_scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.span.in_scope(f)
    }

    /// Log an absorbed hybrid construction error.
    pub fn absorbed(&self, error: &TlsError) {
        self.span.in_scope(|| {
            warn!(
                code = %error.code(),
                error_id = %error.context().error_id,
                recovery = ?error.recovery_hint(),
                "hybrid context construction failed, falling back: {error}"
            );
        });
    }

    /// Close the span with the handle that was handed out.
    pub fn complete(self, handle: &ContextHandle) {
        let duration = self.start_time.elapsed();
        self.span.in_scope(|| match handle.fallback_reason() {
            Some(FallbackReason::Disabled) | None => info!(
                context_id = %handle.id(),
                mode = %handle.mode(),
                group = handle.group().map(|g| g.name()).unwrap_or("none"),
                "TLS context ready in {:?}",
                duration
            ),
            Some(reason) => warn!(
                context_id = %handle.id(),
                mode = %handle.mode(),
                "{}",
                reason.description()
            ),
        });
    }
}

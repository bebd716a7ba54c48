#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # Error Handling for Hybrid TLS Context Construction
//!
//! Every failure this crate can produce while building a TLS context is a
//! [`TlsError`]. Each variant carries:
//! - an [`ErrorCode`] for classification,
//! - an [`ErrorContext`] (id, severity, phase, timestamp, extra fields),
//! - a [`RecoveryHint`] telling the caller what to do about it.
//!
//! The coarse taxonomy used by the fallback coordinator is exposed through
//! [`TlsError::kind`].

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Error severity levels for categorizing TLS errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Warning - operation completed but with potential issues
    Warning,
    /// Error - operation failed but may be recoverable
    Error,
    /// Critical - operation failed and requires intervention
    Critical,
}

/// Phase of context construction where the error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationPhase {
    /// Backend capability probing
    Detection,
    /// Configuration validation
    Configuration,
    /// Group registry lookup
    GroupResolution,
    /// Loading certificates, keys and trust anchors
    MaterialLoading,
    /// Assembling the rustls client or server config
    ContextConstruction,
}

/// Stable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Certificate errors (3000-3099)
    /// Failed to parse certificate.
    CertificateParseError = 3001,
    /// Certificate is invalid.
    CertificateInvalid = 3005,

    // Key exchange errors (4000-4099)
    /// Hybrid-capable backend is not present or not usable.
    BackendUnavailable = 4007,
    /// Curve/variant pair is not a registered hybrid group.
    UnsupportedCombination = 4009,
    /// Backend does not offer the requested key exchange group.
    GroupNotOffered = 4010,

    // Crypto provider errors (5000-5099)
    /// Crypto provider initialization failed.
    CryptoProviderInitFailed = 5001,

    // IO errors (6000-6099)
    /// General I/O error.
    IoError = 6001,

    // Configuration errors (7000-7099)
    /// Invalid configuration.
    InvalidConfig = 7001,
    /// Required certificate is missing.
    MissingCertificate = 7002,
    /// Required private key is missing.
    MissingPrivateKey = 7003,
    /// No trust anchors could be loaded.
    MissingTrustAnchors = 7006,

    // Internal errors (9000-9099)
    /// Internal error occurred.
    InternalError = 9001,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::CertificateParseError => write!(f, "CERTIFICATE_PARSE_ERROR"),
            ErrorCode::CertificateInvalid => write!(f, "CERTIFICATE_INVALID"),

            ErrorCode::BackendUnavailable => write!(f, "BACKEND_UNAVAILABLE"),
            ErrorCode::UnsupportedCombination => write!(f, "UNSUPPORTED_COMBINATION"),
            ErrorCode::GroupNotOffered => write!(f, "GROUP_NOT_OFFERED"),

            ErrorCode::CryptoProviderInitFailed => write!(f, "CRYPTO_PROVIDER_INIT_FAILED"),

            ErrorCode::IoError => write!(f, "IO_ERROR"),

            ErrorCode::InvalidConfig => write!(f, "INVALID_CONFIG"),
            ErrorCode::MissingCertificate => write!(f, "MISSING_CERTIFICATE"),
            ErrorCode::MissingPrivateKey => write!(f, "MISSING_PRIVATE_KEY"),
            ErrorCode::MissingTrustAnchors => write!(f, "MISSING_TRUST_ANCHORS"),

            ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

/// Recovery hints for error handling
#[derive(Debug, Clone)]
pub enum RecoveryHint {
    /// No recovery possible
    NoRecovery,
    /// Fall back to a different mode (hybrid -> standard)
    Fallback {
        /// Description of the fallback strategy.
        description: String,
    },
    /// Reconfigure and retry
    Reconfigure {
        /// Configuration field to modify.
        field: String,
        /// Suggested new value or approach.
        suggestion: String,
    },
    /// Verify certificate, key and CA files
    VerifyMaterial,
}

/// Coarse error taxonomy used to decide fallback policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Hybrid-capable library not present or not usable
    BackendUnavailable,
    /// Curve/variant pair not in the registry
    UnsupportedCombination,
    /// Malformed configuration (user error, never absorbed)
    ConfigInvalid,
    /// CA, certificate or key path unreadable or unparsable
    MaterialLoad,
    /// Anything rustls rejected or an internal fault
    Internal,
}

/// Detailed TLS error context
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Error code
    pub code: ErrorCode,
    /// Error severity
    pub severity: ErrorSeverity,
    /// Phase where the error occurred
    pub phase: OperationPhase,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Additional context fields
    pub extra: std::collections::HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            error_id: generate_error_id(),
            code: ErrorCode::InternalError,
            severity: ErrorSeverity::Error,
            phase: OperationPhase::ContextConstruction,
            timestamp: Utc::now(),
            extra: std::collections::HashMap::new(),
        }
    }
}

impl ErrorContext {
    fn new(code: ErrorCode, severity: ErrorSeverity, phase: OperationPhase) -> Self {
        Self { code, severity, phase, ..Default::default() }
    }
}

/// Generate unique error ID
fn generate_error_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static ERROR_COUNTER: AtomicU64 = AtomicU64::new(1);
    let counter = ERROR_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("HTLSERR_{:016x}", counter)
}

/// Hybrid TLS error type
#[derive(Error, Debug)]
pub enum TlsError {
    /// Hybrid-capable backend not present or not usable
    #[error("Hybrid key exchange backend unavailable: {message}")]
    BackendUnavailable {
        /// Human-readable error message.
        message: String,
        /// Error code for classification.
        code: ErrorCode,
        /// Detailed error context (boxed to reduce enum size).
        context: Box<ErrorContext>,
        /// Recovery hint for handling.
        recovery: Box<RecoveryHint>,
    },

    /// Curve/variant pair is not one of the registered hybrid groups
    #[error("Unsupported hybrid combination: {curve} with Kyber-{variant}")]
    UnsupportedCombination {
        /// Requested classical curve.
        curve: String,
        /// Requested Kyber variant.
        variant: u16,
        /// Error code for classification.
        code: ErrorCode,
        /// Detailed error context (boxed to reduce enum size).
        context: Box<ErrorContext>,
        /// Recovery hint for handling.
        recovery: Box<RecoveryHint>,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigInvalid {
        /// Human-readable error message.
        message: String,
        /// Configuration field that caused the error.
        field: Option<String>,
        /// Error code for classification.
        code: ErrorCode,
        /// Detailed error context (boxed to reduce enum size).
        context: Box<ErrorContext>,
        /// Recovery hint for handling.
        recovery: Box<RecoveryHint>,
    },

    /// Certificate, key or CA material could not be loaded
    #[error("Failed to load TLS material from '{}': {message}", .path.display())]
    MaterialLoad {
        /// Human-readable error message.
        message: String,
        /// Path that was being loaded.
        path: PathBuf,
        /// Underlying source error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        /// Error code for classification.
        code: ErrorCode,
        /// Detailed error context (boxed to reduce enum size).
        context: Box<ErrorContext>,
        /// Recovery hint for handling.
        recovery: Box<RecoveryHint>,
    },

    /// rustls rejected the configuration
    #[error("TLS error: {message}")]
    Tls {
        /// Human-readable error message.
        message: String,
        /// Error code for classification.
        code: ErrorCode,
        /// Detailed error context (boxed to reduce enum size).
        context: Box<ErrorContext>,
        /// Recovery hint for handling.
        recovery: Box<RecoveryHint>,
    },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// Error code for classification.
        code: ErrorCode,
        /// Detailed error context (boxed to reduce enum size).
        context: Box<ErrorContext>,
        /// Recovery hint for handling.
        recovery: Box<RecoveryHint>,
    },
}

impl TlsError {
    /// Backend missing, or missing the requested group.
    pub(crate) fn backend_unavailable(code: ErrorCode, message: impl Into<String>) -> Self {
        TlsError::BackendUnavailable {
            message: message.into(),
            code,
            context: Box::new(ErrorContext::new(
                code,
                ErrorSeverity::Warning,
                OperationPhase::Detection,
            )),
            recovery: Box::new(RecoveryHint::Fallback {
                description: "Use standard TLS 1.3 with classical key exchange".to_string(),
            }),
        }
    }

    pub(crate) fn unsupported_combination(curve: impl Into<String>, variant: u16) -> Self {
        let curve = curve.into();
        let mut context = ErrorContext::new(
            ErrorCode::UnsupportedCombination,
            ErrorSeverity::Warning,
            OperationPhase::GroupResolution,
        );
        context.extra.insert("curve".to_string(), curve.clone());
        context.extra.insert("variant".to_string(), variant.to_string());

        TlsError::UnsupportedCombination {
            curve,
            variant,
            code: ErrorCode::UnsupportedCombination,
            context: Box::new(context),
            recovery: Box::new(RecoveryHint::Fallback {
                description: "Use a registered pair: p256 or x25519 with Kyber-512/768/1024"
                    .to_string(),
            }),
        }
    }

    pub(crate) fn config_invalid(
        code: ErrorCode,
        field: &str,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        TlsError::ConfigInvalid {
            message: message.into(),
            field: Some(field.to_string()),
            code,
            context: Box::new(ErrorContext::new(
                code,
                ErrorSeverity::Error,
                OperationPhase::Configuration,
            )),
            recovery: Box::new(RecoveryHint::Reconfigure {
                field: field.to_string(),
                suggestion: suggestion.into(),
            }),
        }
    }

    pub(crate) fn material_load(
        code: ErrorCode,
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        let path = path.into();
        let mut context =
            ErrorContext::new(code, ErrorSeverity::Error, OperationPhase::MaterialLoading);
        context.extra.insert("path".to_string(), path.display().to_string());

        TlsError::MaterialLoad {
            message: message.into(),
            path,
            source,
            code,
            context: Box::new(context),
            recovery: Box::new(RecoveryHint::VerifyMaterial),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        TlsError::Internal {
            message: message.into(),
            code: ErrorCode::InternalError,
            context: Box::new(ErrorContext::new(
                ErrorCode::InternalError,
                ErrorSeverity::Critical,
                OperationPhase::ContextConstruction,
            )),
            recovery: Box::new(RecoveryHint::NoRecovery),
        }
    }

    /// Get error code
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            TlsError::BackendUnavailable { code, .. } => *code,
            TlsError::UnsupportedCombination { code, .. } => *code,
            TlsError::ConfigInvalid { code, .. } => *code,
            TlsError::MaterialLoad { code, .. } => *code,
            TlsError::Tls { code, .. } => *code,
            TlsError::Internal { code, .. } => *code,
        }
    }

    /// Coarse error kind
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            TlsError::BackendUnavailable { .. } => ErrorKind::BackendUnavailable,
            TlsError::UnsupportedCombination { .. } => ErrorKind::UnsupportedCombination,
            TlsError::ConfigInvalid { .. } => ErrorKind::ConfigInvalid,
            TlsError::MaterialLoad { .. } => ErrorKind::MaterialLoad,
            TlsError::Tls { .. } | TlsError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Get error severity
    #[must_use]
    pub fn severity(&self) -> ErrorSeverity {
        self.context().severity
    }

    /// Get error context
    #[must_use]
    pub fn context(&self) -> &ErrorContext {
        match self {
            TlsError::BackendUnavailable { context, .. }
            | TlsError::UnsupportedCombination { context, .. }
            | TlsError::ConfigInvalid { context, .. }
            | TlsError::MaterialLoad { context, .. }
            | TlsError::Tls { context, .. }
            | TlsError::Internal { context, .. } => context,
        }
    }

    /// Get recovery hint
    #[must_use]
    pub fn recovery_hint(&self) -> &RecoveryHint {
        match self {
            TlsError::BackendUnavailable { recovery, .. }
            | TlsError::UnsupportedCombination { recovery, .. }
            | TlsError::ConfigInvalid { recovery, .. }
            | TlsError::MaterialLoad { recovery, .. }
            | TlsError::Tls { recovery, .. }
            | TlsError::Internal { recovery, .. } => recovery,
        }
    }

    /// Whether the coordinator may absorb this error by degrading to standard TLS.
    ///
    /// Configuration errors are the caller's mistake and are never absorbed.
    #[must_use]
    pub fn supports_fallback(&self) -> bool {
        !matches!(self.kind(), ErrorKind::ConfigInvalid)
    }
}

impl From<std::io::Error> for TlsError {
    fn from(err: std::io::Error) -> Self {
        let mut context =
            ErrorContext::new(ErrorCode::IoError, ErrorSeverity::Error, OperationPhase::MaterialLoading);
        context.extra.insert("io_kind".to_string(), format!("{:?}", err.kind()));

        TlsError::MaterialLoad {
            message: err.to_string(),
            path: PathBuf::new(),
            source: Some(Box::new(err)),
            code: ErrorCode::IoError,
            context: Box::new(context),
            recovery: Box::new(RecoveryHint::VerifyMaterial),
        }
    }
}

impl From<rustls::Error> for TlsError {
    fn from(err: rustls::Error) -> Self {
        let (code, phase, recovery) = match &err {
            rustls::Error::InvalidCertificate(_) => (
                ErrorCode::CertificateInvalid,
                OperationPhase::MaterialLoading,
                RecoveryHint::VerifyMaterial,
            ),
            rustls::Error::NoCertificatesPresented => (
                ErrorCode::MissingCertificate,
                OperationPhase::MaterialLoading,
                RecoveryHint::VerifyMaterial,
            ),
            rustls::Error::General(_) => (
                ErrorCode::CryptoProviderInitFailed,
                OperationPhase::ContextConstruction,
                RecoveryHint::Fallback {
                    description: "Use the classical crypto provider".to_string(),
                },
            ),
            _ => (
                ErrorCode::InternalError,
                OperationPhase::ContextConstruction,
                RecoveryHint::Fallback {
                    description: "Use standard TLS 1.3".to_string(),
                },
            ),
        };

        let mut context = ErrorContext::new(code, ErrorSeverity::Error, phase);
        context.extra.insert("rustls_error".to_string(), err.to_string());

        TlsError::Tls {
            message: err.to_string(),
            code,
            context: Box::new(context),
            recovery: Box::new(recovery),
        }
    }
}

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # Context Handles
//!
//! A [`ContextHandle`] is what an integration point gets back: the rustls
//! client or server config, plus a record of how it was produced (mode,
//! pinned group, policy and, for degraded contexts, why).

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rustls::{ClientConfig, NamedGroup, ServerConfig};
use tokio_rustls::{TlsAcceptor, TlsConnector};
use uuid::Uuid;

use crate::config::{TlsVersion, VerifyMode};
use crate::error::ErrorCode;
use crate::material::KeyMaterial;
use crate::registry::HybridGroup;

/// Which construction path produced a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextMode {
    /// One pinned hybrid group, classical groups as negotiation fallback
    Hybrid,
    /// Every hybrid group the backend offers, classical groups as negotiation fallback
    QuantumSafe,
    /// Classical groups only
    Standard,
}

impl fmt::Display for ContextMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextMode::Hybrid => write!(f, "HYBRID"),
            ContextMode::QuantumSafe => write!(f, "QUANTUM_SAFE"),
            ContextMode::Standard => write!(f, "STANDARD"),
        }
    }
}

/// Why a standard context was handed out instead of a hybrid one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// Caller did not ask for quantum-safe mode
    Disabled,
    /// Detection reported no usable backend
    BackendUnavailable {
        /// Detector's error text
        detail: String,
    },
    /// Hybrid construction returned an error
    ConstructionFailed {
        /// Code of the absorbed error
        code: ErrorCode,
        /// Its message
        message: String,
    },
}

impl FallbackReason {
    /// Human-readable explanation.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            FallbackReason::Disabled => "Quantum-safe mode disabled by caller".to_string(),
            FallbackReason::BackendUnavailable { detail } => {
                format!("Hybrid backend unavailable ({detail}), using standard TLS")
            }
            FallbackReason::ConstructionFailed { code, message } => {
                format!("Hybrid context construction failed [{code}]: {message}; using standard TLS")
            }
        }
    }
}

/// Server policy handed back when key material could not be loaded here.
///
/// The external server loads the paths itself and reports the real error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDescriptor {
    /// Paths as supplied by the caller
    pub material: KeyMaterial,
    /// Minimum protocol version to enforce
    pub minimum_version: TlsVersion,
    /// Client certificate policy
    pub verify_mode: VerifyMode,
    /// What went wrong loading the material
    pub load_error: String,
}

/// The rustls side of a handle.
#[derive(Debug, Clone)]
pub enum ContextConfig {
    /// Outgoing connections
    Client(Arc<ClientConfig>),
    /// Incoming connections
    Server(Arc<ServerConfig>),
    /// Incoming connections, material not loaded
    ServerDescriptor(ServerDescriptor),
    /// Outgoing connections; rustls rejected even a classical TLS 1.3 config
    Unbuilt {
        /// Why construction failed
        error: String,
    },
}

/// Policy a context was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Policy {
    pub(crate) minimum_version: TlsVersion,
    pub(crate) verify_mode: VerifyMode,
    pub(crate) check_hostname: bool,
}

/// A ready-to-use TLS context and how it was made.
#[derive(Debug, Clone)]
pub struct ContextHandle {
    id: Uuid,
    created_at: DateTime<Utc>,
    mode: ContextMode,
    group: Option<&'static HybridGroup>,
    policy: Policy,
    offered_groups: Vec<NamedGroup>,
    fallback_reason: Option<FallbackReason>,
    config: ContextConfig,
}

impl ContextHandle {
    pub(crate) fn new(
        mode: ContextMode,
        group: Option<&'static HybridGroup>,
        policy: Policy,
        offered_groups: Vec<NamedGroup>,
        config: ContextConfig,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            mode,
            group,
            policy,
            offered_groups,
            fallback_reason: None,
            config,
        }
    }

    pub(crate) fn with_fallback_reason(mut self, reason: FallbackReason) -> Self {
        self.fallback_reason = Some(reason);
        self
    }

    /// Unique id, for correlating logs.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Creation time.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time since creation.
    #[must_use]
    pub fn age(&self) -> std::time::Duration {
        Utc::now().signed_duration_since(self.created_at).to_std().unwrap_or(std::time::Duration::ZERO)
    }

    /// Construction path.
    #[must_use]
    pub fn mode(&self) -> ContextMode {
        self.mode
    }

    /// Whether any hybrid group is offered.
    #[must_use]
    pub fn is_hybrid(&self) -> bool {
        self.mode != ContextMode::Standard
    }

    /// Pinned registry group (hybrid mode only).
    #[must_use]
    pub fn group(&self) -> Option<&'static HybridGroup> {
        self.group
    }

    /// Lowest protocol version the context accepts.
    #[must_use]
    pub fn minimum_version(&self) -> TlsVersion {
        self.policy.minimum_version
    }

    /// Peer verification policy.
    #[must_use]
    pub fn verify_mode(&self) -> VerifyMode {
        self.policy.verify_mode
    }

    /// Whether the server name is checked.
    #[must_use]
    pub fn check_hostname(&self) -> bool {
        self.policy.check_hostname
    }

    /// Key-exchange groups in preference order. Empty for descriptors.
    #[must_use]
    pub fn offered_groups(&self) -> &[NamedGroup] {
        &self.offered_groups
    }

    /// Set when a standard context replaced a requested hybrid one.
    #[must_use]
    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        self.fallback_reason.as_ref()
    }

    /// Underlying config.
    #[must_use]
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Client config, if this is a client context.
    #[must_use]
    pub fn client_config(&self) -> Option<Arc<ClientConfig>> {
        match &self.config {
            ContextConfig::Client(config) => Some(Arc::clone(config)),
            _ => None,
        }
    }

    /// Server config, if this is a loaded server context.
    #[must_use]
    pub fn server_config(&self) -> Option<Arc<ServerConfig>> {
        match &self.config {
            ContextConfig::Server(config) => Some(Arc::clone(config)),
            _ => None,
        }
    }

    /// Descriptor, if server material was left for the caller to load.
    #[must_use]
    pub fn server_descriptor(&self) -> Option<&ServerDescriptor> {
        match &self.config {
            ContextConfig::ServerDescriptor(descriptor) => Some(descriptor),
            _ => None,
        }
    }

    /// `tokio-rustls` connector for a client context.
    #[must_use]
    pub fn tls_connector(&self) -> Option<TlsConnector> {
        self.client_config().map(TlsConnector::from)
    }

    /// `tokio-rustls` acceptor for a loaded server context.
    #[must_use]
    pub fn tls_acceptor(&self) -> Option<TlsAcceptor> {
        self.server_config().map(TlsAcceptor::from)
    }
}

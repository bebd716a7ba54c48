#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # Hybrid TLS
//!
//! TLS context factory that upgrades connections to post-quantum hybrid key
//! exchange (ECDHE + Kyber/ML-KEM) when the linked backend supports it, and
//! hands out a standard TLS context otherwise. Callers never branch on
//! availability.
//!
//! ## Quick Start
//!
//! ```no_run
//! use hybrid_tls::*;
//!
//! // client: always a usable context
//! let handle = FallbackCoordinator::new().setup_context(true, None, &Endpoint::Client);
//! let connector = handle.tls_connector();
//!
//! // server: a descriptor comes back if the key material cannot be loaded here
//! let material = KeyMaterial::new("server.crt", "server.key");
//! let server = FallbackCoordinator::new().setup_context(true, None, &Endpoint::Server(material));
//! let acceptor = server.tls_acceptor();
//! ```
//!
//! ## Hybrid groups
//!
//! | curve  | Kyber-512         | Kyber-768         | Kyber-1024         |
//! |--------|-------------------|-------------------|--------------------|
//! | p256   | `p256_kyber512`   | `p256_kyber768`   | `p256_kyber1024`   |
//! | x25519 | `x25519_kyber512` | `x25519_kyber768` | `x25519_kyber1024` |
//!
//! Only groups with an assigned ML-KEM codepoint can be negotiated
//! (`x25519_kyber768` is X25519MLKEM768). Asking for any other group makes
//! hybrid construction fail, and the coordinator falls back.
//!
//! ## Modules
//!
//! - [`detect`]: one-time backend probe
//! - [`registry`]: the six hybrid groups
//! - [`config`]: validated policy
//! - [`builder`]: context construction
//! - [`fallback`]: the coordinator
//! - [`error`]: error taxonomy with recovery hints

pub mod builder;
pub mod config;
pub mod context;
pub mod detect;
pub mod error;
pub mod fallback;
pub mod kex;
pub mod material;
pub mod registry;
pub mod tracing;
pub mod verifier;

pub use builder::{
    ContextFactory, Endpoint, HybridContextFactory, create_hybrid_context,
    create_hybrid_server_context, create_quantum_safe_context, create_standard_context,
};
pub use config::{HybridTlsConfig, HybridTlsConfigBuilder, HybridTlsSettings, TlsVersion, VerifyMode};
pub use context::{ContextConfig, ContextHandle, ContextMode, FallbackReason, ServerDescriptor};
pub use detect::{
    BackendDetector, CachedDetector, DetectionResult, Detector, FixedDetector,
    list_supported_groups, locate_backend_path, verify_hybrid_support,
};
pub use error::{ErrorCode, ErrorKind, RecoveryHint, TlsError};
pub use fallback::FallbackCoordinator;
pub use material::KeyMaterial;
pub use registry::{
    ClassicalCurve, HYBRID_GROUP_NAMES, HYBRID_KEX_GROUPS, HybridGroup, KexInfo, KyberVariant,
    resolve_group,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

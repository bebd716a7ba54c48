#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # Context Builder
//!
//! Turns a [`HybridTlsConfig`] and a [`DetectionResult`] into a rustls
//! config wrapped in a [`ContextHandle`].
//!
//! Hybrid and quantum-safe contexts always require TLS 1.3, since hybrid
//! key-exchange groups do not exist in earlier versions. Standard contexts
//! honour the configured minimum and cannot fail: problems with trust or key
//! material are logged and degrade the context instead.
//!
//! ```no_run
//! use hybrid_tls::builder::create_hybrid_context;
//! use hybrid_tls::config::HybridTlsConfig;
//! use hybrid_tls::detect::verify_hybrid_support;
//!
//! let handle = create_hybrid_context(&HybridTlsConfig::default(), verify_hybrid_support())?;
//! let connector = handle.tls_connector();
//! # Ok::<(), hybrid_tls::TlsError>(())
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::{ClientConfig, RootCertStore, ServerConfig};

use crate::config::{HybridTlsConfig, TlsVersion, VerifyMode};
use crate::context::{ContextConfig, ContextHandle, ContextMode, Policy, ServerDescriptor};
use crate::detect::DetectionResult;
use crate::error::{ErrorCode, TlsError};
use crate::kex;
use crate::material::{self, KeyMaterial};
use crate::registry::{self, HybridGroup};
use crate::verifier::{client_verifier, server_verifier};

/// Which side of the connection a context is for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Endpoint {
    /// Outgoing connections
    #[default]
    Client,
    /// Incoming connections with this key material
    Server(KeyMaterial),
}

/// Builds contexts on behalf of the fallback coordinator.
pub trait ContextFactory: Send + Sync + fmt::Debug {
    /// Hybrid context for `endpoint`.
    ///
    /// # Errors
    ///
    /// Any [`TlsError`]; the coordinator substitutes a standard context.
    fn hybrid(
        &self,
        config: &HybridTlsConfig,
        endpoint: &Endpoint,
        detection: &DetectionResult,
    ) -> Result<ContextHandle, TlsError>;

    /// Classical context for `endpoint`. Infallible.
    fn standard(&self, config: &HybridTlsConfig, endpoint: &Endpoint) -> ContextHandle {
        create_standard_context(config, endpoint)
    }
}

/// The real builder functions behind [`ContextFactory`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HybridContextFactory;

impl ContextFactory for HybridContextFactory {
    fn hybrid(
        &self,
        config: &HybridTlsConfig,
        endpoint: &Endpoint,
        detection: &DetectionResult,
    ) -> Result<ContextHandle, TlsError> {
        match endpoint {
            Endpoint::Client => create_hybrid_context(config, detection),
            Endpoint::Server(material) => create_hybrid_server_context(config, detection, material),
        }
    }
}

fn require_backend(detection: &DetectionResult) -> Result<(), TlsError> {
    if detection.is_available() {
        return Ok(());
    }
    Err(TlsError::backend_unavailable(
        ErrorCode::BackendUnavailable,
        detection.error().unwrap_or("backend reported unavailable"),
    ))
}

fn hybrid_policy(config: &HybridTlsConfig) -> Policy {
    Policy {
        minimum_version: config.min_tls_version().max(TlsVersion::Tls13),
        verify_mode: config.verify_mode(),
        check_hostname: config.check_hostname(),
    }
}

/// Client context offering every hybrid group the backend supports.
///
/// With `verify_ssl = false` the server certificate is not verified and the
/// host name is not checked. Otherwise the platform trust store is used.
///
/// # Errors
///
/// - `BackendUnavailable` if detection says so or the backend offers no
///   registered group
pub fn create_quantum_safe_context(
    verify_ssl: bool,
    detection: &DetectionResult,
) -> Result<ContextHandle, TlsError> {
    require_backend(detection)?;

    let policy = Policy {
        minimum_version: TlsVersion::Tls13,
        verify_mode: if verify_ssl { VerifyMode::Required } else { VerifyMode::None },
        check_hostname: verify_ssl,
    };
    let provider = Arc::new(kex::quantum_safe_provider()?);
    let offered = kex::group_names(&provider);
    let roots = trust_store(policy.verify_mode, None)?;
    let client = client_config(provider, policy, roots)?;

    tracing::debug!(groups = ?offered, verify_ssl, "built quantum-safe client context");
    Ok(ContextHandle::new(
        ContextMode::QuantumSafe,
        None,
        policy,
        offered,
        ContextConfig::Client(Arc::new(client)),
    ))
}

/// Client context pinned to the configured hybrid group.
///
/// # Errors
///
/// - `BackendUnavailable` if detection says so or the backend cannot
///   negotiate the resolved group
/// - `UnsupportedCombination` if the curve/variant pair is not registered
/// - `MaterialLoad` if `ca_cert_path` cannot be read or holds no anchors
pub fn create_hybrid_context(
    config: &HybridTlsConfig,
    detection: &DetectionResult,
) -> Result<ContextHandle, TlsError> {
    let (group, provider) = pinned(config, detection)?;
    let policy = hybrid_policy(config);
    let offered = kex::group_names(&provider);
    let roots = trust_store(policy.verify_mode, config.ca_cert_path())?;
    let client = client_config(provider, policy, roots)?;

    tracing::debug!(group = %group, "built hybrid client context");
    Ok(ContextHandle::new(
        ContextMode::Hybrid,
        Some(group),
        policy,
        offered,
        ContextConfig::Client(Arc::new(client)),
    ))
}

/// Server context pinned to the configured hybrid group.
///
/// Client certificates are required when `material.ca_certs` is set and the
/// config's verify mode is [`VerifyMode::Required`].
///
/// # Errors
///
/// As [`create_hybrid_context`], plus `MaterialLoad` for the certificate
/// chain, private key or client CA bundle, and `Tls` if rustls rejects the
/// key for the certificate.
pub fn create_hybrid_server_context(
    config: &HybridTlsConfig,
    detection: &DetectionResult,
    material: &KeyMaterial,
) -> Result<ContextHandle, TlsError> {
    let (group, provider) = pinned(config, detection)?;
    let policy = server_policy(config.min_tls_version().max(TlsVersion::Tls13), config, material);
    let offered = kex::group_names(&provider);
    let server = server_config(provider, policy, material)?;

    tracing::debug!(group = %group, "built hybrid server context");
    Ok(ContextHandle::new(
        ContextMode::Hybrid,
        Some(group),
        policy,
        offered,
        ContextConfig::Server(Arc::new(server)),
    ))
}

/// Classical context honouring the configured minimum version.
///
/// Never fails. An unreadable CA bundle or an empty platform store leaves
/// the client with no trust anchors (every server is rejected at handshake
/// time). A server whose key material cannot be loaded gets a
/// [`ServerDescriptor`] so that the real server reports the load error.
#[must_use]
pub fn create_standard_context(config: &HybridTlsConfig, endpoint: &Endpoint) -> ContextHandle {
    let provider = Arc::new(kex::classical_provider(Some(config.classical_curve())));
    let offered = kex::group_names(&provider);

    match endpoint {
        Endpoint::Client => {
            let policy = Policy {
                minimum_version: config.min_tls_version(),
                verify_mode: config.verify_mode(),
                check_hostname: config.check_hostname(),
            };
            let roots = match policy.verify_mode {
                VerifyMode::None => RootCertStore::empty(),
                VerifyMode::Required => lenient_trust_store(config.ca_cert_path()),
            };
            let client = client_config(Arc::clone(&provider), policy, roots).or_else(|e| {
                tracing::error!(code = %e.code(), "standard client config rejected: {e}");
                last_resort_client(provider)
            });
            match client {
                Ok(client) => ContextHandle::new(
                    ContextMode::Standard,
                    None,
                    policy,
                    offered,
                    ContextConfig::Client(Arc::new(client)),
                ),
                Err(e) => {
                    tracing::error!(code = %e.code(), "no classical client config could be built: {e}");
                    ContextHandle::new(
                        ContextMode::Standard,
                        None,
                        policy,
                        Vec::new(),
                        ContextConfig::Unbuilt { error: e.to_string() },
                    )
                }
            }
        }
        Endpoint::Server(material) => {
            let policy = server_policy(config.min_tls_version(), config, material);
            match server_config(provider, policy, material) {
                Ok(server) => ContextHandle::new(
                    ContextMode::Standard,
                    None,
                    policy,
                    offered,
                    ContextConfig::Server(Arc::new(server)),
                ),
                Err(e) => {
                    tracing::warn!(code = %e.code(), "server material not loaded, returning descriptor: {e}");
                    let descriptor = ServerDescriptor {
                        material: material.clone(),
                        minimum_version: policy.minimum_version,
                        verify_mode: policy.verify_mode,
                        load_error: e.to_string(),
                    };
                    ContextHandle::new(
                        ContextMode::Standard,
                        None,
                        policy,
                        Vec::new(),
                        ContextConfig::ServerDescriptor(descriptor),
                    )
                }
            }
        }
    }
}

fn pinned(
    config: &HybridTlsConfig,
    detection: &DetectionResult,
) -> Result<(&'static HybridGroup, Arc<CryptoProvider>), TlsError> {
    require_backend(detection)?;
    let group = registry::resolve_group(config.classical_curve(), config.kyber_variant())?;
    tracing::debug!(group = %group, codepoint = ?group.codepoint(), "resolved hybrid group");
    let provider = kex::pinned_provider(group, config.classical_curve())?;
    Ok((group, Arc::new(provider)))
}

fn server_policy(minimum_version: TlsVersion, config: &HybridTlsConfig, material: &KeyMaterial) -> Policy {
    let client_auth = material.ca_certs.is_some() && config.verify_mode() == VerifyMode::Required;
    Policy {
        minimum_version,
        verify_mode: if client_auth { VerifyMode::Required } else { VerifyMode::None },
        check_hostname: false,
    }
}

fn trust_store(verify_mode: VerifyMode, ca_cert_path: Option<&Path>) -> Result<RootCertStore, TlsError> {
    match verify_mode {
        VerifyMode::None => Ok(RootCertStore::empty()),
        VerifyMode::Required => material::load_trust_store(ca_cert_path),
    }
}

fn lenient_trust_store(ca_cert_path: Option<&Path>) -> RootCertStore {
    match material::load_trust_store(ca_cert_path) {
        Ok(roots) => roots,
        Err(e) => {
            tracing::warn!(code = %e.code(), "no trust anchors for standard context: {e}");
            RootCertStore::empty()
        }
    }
}

fn client_config(
    provider: Arc<CryptoProvider>,
    policy: Policy,
    roots: RootCertStore,
) -> Result<ClientConfig, TlsError> {
    let builder = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_protocol_versions(policy.minimum_version.enabled_versions())?;

    let builder = if policy.verify_mode == VerifyMode::Required && roots.is_empty() {
        tracing::warn!("client context has no trust anchors; server certificates will be rejected");
        builder.with_root_certificates(roots)
    } else {
        let verifier = server_verifier(policy.verify_mode, policy.check_hostname, roots, provider)?;
        builder.dangerous().with_custom_certificate_verifier(verifier)
    };
    Ok(builder.with_no_client_auth())
}

fn server_config(
    provider: Arc<CryptoProvider>,
    policy: Policy,
    material: &KeyMaterial,
) -> Result<ServerConfig, TlsError> {
    let (chain, key) = material.load_identity()?;
    let builder = ServerConfig::builder_with_provider(Arc::clone(&provider))
        .with_protocol_versions(policy.minimum_version.enabled_versions())?;

    let builder = match (&material.ca_certs, policy.verify_mode) {
        (Some(ca_certs), VerifyMode::Required) => {
            let roots = material::load_ca_bundle(ca_certs)?;
            builder.with_client_cert_verifier(client_verifier(roots, provider)?)
        }
        _ => builder.with_no_client_auth(),
    };
    Ok(builder.with_single_cert(chain, key)?)
}

/// TLS 1.3 on the classical provider with no trust anchors: rejects every
/// server, but never offers a hybrid group.
fn last_resort_client(provider: Arc<CryptoProvider>) -> Result<ClientConfig, TlsError> {
    Ok(ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(TlsVersion::Tls13.enabled_versions())?
        .with_root_certificates(RootCertStore::empty())
        .with_no_client_auth())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::detect::FixedDetector;
    use crate::detect::Detector;
    use crate::error::ErrorKind;

    fn available() -> DetectionResult {
        FixedDetector::available().detect()
    }

    fn unavailable() -> DetectionResult {
        FixedDetector::unavailable("forced").detect()
    }

    #[test]
    fn test_quantum_safe_requires_backend() {
        let err = create_quantum_safe_context(false, &unavailable()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
        assert!(err.to_string().contains("forced"));
    }

    #[test]
    fn test_quantum_safe_without_verification() {
        let handle = create_quantum_safe_context(false, &available()).unwrap();
        assert_eq!(handle.mode(), ContextMode::QuantumSafe);
        assert_eq!(handle.minimum_version(), TlsVersion::Tls13);
        assert!(!handle.check_hostname());
        assert_eq!(handle.verify_mode(), VerifyMode::None);
        assert!(handle.tls_connector().is_some());
    }

    #[test]
    fn test_quantum_safe_with_verification() {
        let handle = create_quantum_safe_context(true, &available()).unwrap();
        assert_eq!(handle.mode(), ContextMode::QuantumSafe);
        assert_eq!(handle.minimum_version(), TlsVersion::Tls13);
        assert_eq!(handle.verify_mode(), VerifyMode::Required);
        assert!(handle.check_hostname());
        assert!(handle.tls_connector().is_some());
    }

    #[test]
    fn test_last_resort_client_is_classical() {
        let client = last_resort_client(Arc::new(kex::classical_provider(None))).unwrap();
        let groups = &client.crypto_provider().kx_groups;
        assert!(!groups.is_empty());
        assert!(groups.iter().all(|g| kex::is_classical(*g)));
    }

    #[test]
    fn test_hybrid_floor_is_tls13() {
        let config = HybridTlsConfig::without_verification()
            .to_builder()
            .with_min_tls_version(TlsVersion::Tls12)
            .build()
            .unwrap();
        let handle = create_hybrid_context(&config, &available()).unwrap();
        assert_eq!(handle.minimum_version(), TlsVersion::Tls13);
        assert_eq!(handle.group().map(HybridGroup::name), Some("x25519_kyber768"));
        assert_eq!(u16::from(handle.offered_groups()[0]), 0x11EC);
    }

    #[test]
    fn test_unregistered_curve() {
        let config = HybridTlsConfig::without_verification()
            .to_builder()
            .with_classical_curve("p384")
            .build()
            .unwrap();
        let err = create_hybrid_context(&config, &available()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedCombination);
    }

    #[test]
    fn test_group_without_codepoint() {
        let config =
            HybridTlsConfig::without_verification().to_builder().with_kyber_variant(512).build().unwrap();
        let err = create_hybrid_context(&config, &available()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
        assert_eq!(err.code(), ErrorCode::GroupNotOffered);
    }

    #[test]
    fn test_unreadable_ca_path() {
        let config = HybridTlsConfig::builder().with_ca_cert_path("/nonexistent/ca.pem").build().unwrap();
        let err = create_hybrid_context(&config, &available()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MaterialLoad);

        // the standard path absorbs the same problem
        let handle = create_standard_context(&config, &Endpoint::Client);
        assert_eq!(handle.mode(), ContextMode::Standard);
        assert!(handle.client_config().is_some());
    }

    #[test]
    fn test_standard_context_is_classical() {
        let config = HybridTlsConfig::without_verification()
            .to_builder()
            .with_min_tls_version(TlsVersion::Tls12)
            .build()
            .unwrap();
        let handle = create_standard_context(&config, &Endpoint::Client);
        assert_eq!(handle.minimum_version(), TlsVersion::Tls12);
        assert!(handle.group().is_none());
        assert!(handle.offered_groups().iter().all(|g| kex::CLASSICAL_CODEPOINTS.contains(&u16::from(*g))));
    }

    #[test]
    fn test_standard_server_without_material_is_descriptor() {
        let material = KeyMaterial::new("/nonexistent/server.crt", "/nonexistent/server.key");
        let handle = create_standard_context(&HybridTlsConfig::default(), &Endpoint::Server(material.clone()));
        let descriptor = handle.server_descriptor().unwrap();
        assert_eq!(descriptor.material, material);
        assert!(descriptor.load_error.contains("server.crt"));
        assert!(handle.tls_acceptor().is_none());
    }
}

#![deny(unsafe_code)]
// Test files use unwrap() for simplicity
#![allow(clippy::unwrap_used)]

//! Context builder tests

mod common;

use hybrid_tls::*;

fn available() -> DetectionResult {
    DetectionResult::available(None, "test backend")
}

fn codepoints(handle: &ContextHandle) -> Vec<u16> {
    handle.offered_groups().iter().map(|g| u16::from(*g)).collect()
}

#[test]
fn test_quantum_safe_context_policy() {
    let handle = create_quantum_safe_context(false, &available()).unwrap();
    assert_eq!(handle.mode(), ContextMode::QuantumSafe);
    assert_eq!(handle.minimum_version(), TlsVersion::Tls13);
    assert_eq!(handle.verify_mode(), VerifyMode::None);
    assert!(!handle.check_hostname());
    assert!(handle.group().is_none());
    assert!(codepoints(&handle).contains(&0x11EC));
    assert!(codepoints(&handle).contains(&0x001D));
}

#[test]
fn test_hybrid_context_with_ca_bundle() {
    let pki = common::generate_pki();
    let config = HybridTlsConfig::builder().with_ca_cert_path(&pki.ca_path).build().unwrap();
    let handle = create_hybrid_context(&config, &available()).unwrap();

    assert_eq!(handle.mode(), ContextMode::Hybrid);
    assert_eq!(handle.group().unwrap().name(), "x25519_kyber768");
    assert_eq!(handle.minimum_version(), TlsVersion::Tls13);
    assert_eq!(handle.verify_mode(), VerifyMode::Required);
    assert!(handle.check_hostname());
    assert_eq!(codepoints(&handle)[0], 0x11EC);
    assert!(handle.client_config().is_some());
}

#[test]
fn test_hybrid_context_prefers_configured_curve_for_classical_fallback() {
    let config = HybridTlsConfig::without_verification();
    let handle = create_hybrid_context(&config, &available()).unwrap();
    assert_eq!(&codepoints(&handle)[..2], &[0x11EC_u16, 0x001D]);
}

#[test]
fn test_hybrid_context_requires_backend() {
    let unavailable = DetectionResult::unavailable("not linked", None, "test backend");
    let err = create_hybrid_context(&HybridTlsConfig::without_verification(), &unavailable)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BackendUnavailable);
    assert!(matches!(err.recovery_hint(), RecoveryHint::Fallback { .. }));
}

#[test]
fn test_hybrid_context_with_garbage_ca_bundle() {
    let pki = common::generate_pki();
    let garbage = pki.dir().join("garbage.pem");
    std::fs::write(&garbage, "-----BEGIN CERTIFICATE-----\n!!!\n-----END CERTIFICATE-----\n").unwrap();

    let config = HybridTlsConfig::builder().with_ca_cert_path(&garbage).build().unwrap();
    let err = create_hybrid_context(&config, &available()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MaterialLoad);
}

#[test]
fn test_hybrid_server_context() {
    let pki = common::generate_pki();
    let material = KeyMaterial::new(&pki.cert_path, &pki.key_path);
    let handle =
        create_hybrid_server_context(&HybridTlsConfig::default(), &available(), &material).unwrap();

    assert_eq!(handle.mode(), ContextMode::Hybrid);
    assert_eq!(handle.minimum_version(), TlsVersion::Tls13);
    assert_eq!(handle.verify_mode(), VerifyMode::None);
    assert!(handle.tls_acceptor().is_some());
}

#[test]
fn test_hybrid_server_context_requires_client_certs_with_ca() {
    let pki = common::generate_pki();
    let material = KeyMaterial::new(&pki.cert_path, &pki.key_path).with_ca_certs(&pki.ca_path);
    let handle =
        create_hybrid_server_context(&HybridTlsConfig::default(), &available(), &material).unwrap();
    assert_eq!(handle.verify_mode(), VerifyMode::Required);

    let relaxed = HybridTlsConfig::without_verification();
    let handle = create_hybrid_server_context(&relaxed, &available(), &material).unwrap();
    assert_eq!(handle.verify_mode(), VerifyMode::None);
}

#[test]
fn test_hybrid_server_context_with_mismatched_key() {
    let pki = common::generate_pki();
    let material = KeyMaterial::new(&pki.cert_path, &pki.client_key_path);
    let err = create_hybrid_server_context(&HybridTlsConfig::default(), &available(), &material)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(err.supports_fallback());
}

#[test]
fn test_standard_context_never_offers_hybrid_groups() {
    let pki = common::generate_pki();
    let config = HybridTlsConfig::builder()
        .with_min_tls_version(TlsVersion::Tls12)
        .with_ca_cert_path(&pki.ca_path)
        .build()
        .unwrap();

    for endpoint in [Endpoint::Client, Endpoint::Server(KeyMaterial::new(&pki.cert_path, &pki.key_path))] {
        let handle = create_standard_context(&config, &endpoint);
        assert_eq!(handle.mode(), ContextMode::Standard);
        assert_eq!(handle.minimum_version(), TlsVersion::Tls12);
        assert!(!codepoints(&handle).is_empty());
        assert!(codepoints(&handle).iter().all(|cp| kex::CLASSICAL_CODEPOINTS.contains(cp)));
    }
}

#[test]
fn test_standard_server_descriptor_keeps_policy() {
    let material = KeyMaterial::new("/does/not/exist.crt", "/does/not/exist.key")
        .with_ca_certs("/does/not/exist-ca.pem");
    let handle = create_standard_context(&HybridTlsConfig::default(), &Endpoint::Server(material.clone()));

    let descriptor = handle.server_descriptor().unwrap();
    assert_eq!(descriptor.material, material);
    assert_eq!(descriptor.minimum_version, TlsVersion::Tls13);
    assert_eq!(descriptor.verify_mode, VerifyMode::Required);
    assert!(handle.offered_groups().is_empty());
}

#[test]
fn test_handles_are_independent() {
    let config = HybridTlsConfig::without_verification();
    let a = create_hybrid_context(&config, &available()).unwrap();
    let b = create_hybrid_context(&config, &available()).unwrap();
    assert_ne!(a.id(), b.id());
    assert!(!std::sync::Arc::ptr_eq(&a.client_config().unwrap(), &b.client_config().unwrap()));
}

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Certificate verifiers for each verification policy.
//!
//! | verify_mode | check_hostname | verifier                        |
//! |-------------|----------------|---------------------------------|
//! | Required    | true           | [`WebPkiServerVerifier`]        |
//! | Required    | false          | [`HostnameAgnosticVerifier`]    |
//! | None        | false          | [`AcceptAnyServerCert`]         |
//!
//! Handshake signatures are checked in every case; only certificate
//! validation is relaxed.

use std::sync::Arc;

use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::server::WebPkiClientVerifier;
use rustls::server::danger::ClientCertVerifier;
use rustls::{CertificateError, DigitallySignedStruct, RootCertStore, SignatureScheme};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};

use crate::TlsError;
use crate::config::VerifyMode;
use crate::error::ErrorCode;

/// Accepts any server certificate.
#[derive(Debug)]
pub struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl AcceptAnyServerCert {
    /// Verifier that checks signatures with `provider`'s algorithms.
    #[must_use]
    pub fn new(provider: Arc<CryptoProvider>) -> Self {
        Self { provider }
    }
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}

/// Full webpki chain validation, but a name mismatch is not an error.
#[derive(Debug)]
pub struct HostnameAgnosticVerifier {
    inner: Arc<WebPkiServerVerifier>,
}

impl HostnameAgnosticVerifier {
    /// Wrap a webpki verifier.
    #[must_use]
    pub fn new(inner: Arc<WebPkiServerVerifier>) -> Self {
        Self { inner }
    }
}

impl ServerCertVerifier for HostnameAgnosticVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        // webpki checks the chain before the name, so a name error means the chain is good
        match self.inner.verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
        {
            Err(rustls::Error::InvalidCertificate(
                CertificateError::NotValidForName | CertificateError::NotValidForNameContext { .. },
            )) => Ok(ServerCertVerified::assertion()),
            other => other,
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// Pick the server certificate verifier for a policy.
///
/// `roots` is ignored for [`VerifyMode::None`].
///
/// # Errors
///
/// `MaterialLoad` if webpki refuses the trust store (for example when it is
/// empty).
pub fn server_verifier(
    verify_mode: VerifyMode,
    check_hostname: bool,
    roots: RootCertStore,
    provider: Arc<CryptoProvider>,
) -> Result<Arc<dyn ServerCertVerifier>, TlsError> {
    if verify_mode == VerifyMode::None {
        return Ok(Arc::new(AcceptAnyServerCert::new(provider)));
    }

    let webpki = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider)
        .build()
        .map_err(|e| {
            TlsError::material_load(
                ErrorCode::MissingTrustAnchors,
                std::path::PathBuf::new(),
                format!("cannot build server verifier: {e}"),
                Some(Box::new(e)),
            )
        })?;

    if check_hostname {
        Ok(webpki)
    } else {
        Ok(Arc::new(HostnameAgnosticVerifier::new(webpki)))
    }
}

/// Verifier requiring client certificates that chain to `roots`.
///
/// # Errors
///
/// `MaterialLoad` if webpki refuses the trust store.
pub fn client_verifier(
    roots: RootCertStore,
    provider: Arc<CryptoProvider>,
) -> Result<Arc<dyn ClientCertVerifier>, TlsError> {
    WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider).build().map_err(|e| {
        TlsError::material_load(
            ErrorCode::MissingTrustAnchors,
            std::path::PathBuf::new(),
            format!("cannot build client verifier: {e}"),
            Some(Box::new(e)),
        )
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn provider() -> Arc<CryptoProvider> {
        Arc::new(rustls::crypto::aws_lc_rs::default_provider())
    }

    #[test]
    fn test_accept_any_allows_any_name() {
        let verifier = AcceptAnyServerCert::new(provider());
        let name = ServerName::try_from("example.com").unwrap();
        let cert = CertificateDer::from(vec![0u8; 4]);
        assert!(verifier.verify_server_cert(&cert, &[], &name, &[], UnixTime::now()).is_ok());
        assert!(!verifier.supported_verify_schemes().is_empty());
    }

    #[test]
    fn test_empty_roots_rejected_when_required() {
        let err = server_verifier(VerifyMode::Required, true, RootCertStore::empty(), provider())
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::MaterialLoad);
    }

    #[test]
    fn test_empty_roots_fine_without_verification() {
        assert!(server_verifier(VerifyMode::None, false, RootCertStore::empty(), provider()).is_ok());
    }

    #[test]
    fn test_hostname_agnostic_ignores_name_mismatch() {
        let ca_key = rcgen::KeyPair::generate().unwrap();
        let mut ca_params = rcgen::CertificateParams::new(Vec::<String>::new()).unwrap();
        ca_params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
        let ca_cert = ca_params.self_signed(&ca_key).unwrap();

        let key = rcgen::KeyPair::generate().unwrap();
        let cert = rcgen::CertificateParams::new(vec!["localhost".to_string()])
            .unwrap()
            .signed_by(&key, &ca_cert, &ca_key)
            .unwrap();
        let der = cert.der().clone();

        let mut roots = RootCertStore::empty();
        roots.add(ca_cert.der().clone()).unwrap();
        let strict = server_verifier(VerifyMode::Required, true, roots.clone(), provider()).unwrap();
        let relaxed = server_verifier(VerifyMode::Required, false, roots, provider()).unwrap();

        let wrong_name = ServerName::try_from("other.example").unwrap();
        assert!(strict.verify_server_cert(&der, &[], &wrong_name, &[], UnixTime::now()).is_err());
        assert!(relaxed.verify_server_cert(&der, &[], &wrong_name, &[], UnixTime::now()).is_ok());
    }
}

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Certificate, key and trust anchor loading.
//!
//! PEM files are decoded with `rustls-pki-types`; the platform trust store
//! comes from `rustls-native-certs`. Every failure is a
//! [`TlsError::MaterialLoad`] naming the offending path.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use rustls::RootCertStore;
use rustls_pki_types::{CertificateDer, PrivateKeyDer, pem::PemObject};
use serde::{Deserialize, Serialize};

use crate::TlsError;
use crate::error::ErrorCode;

/// Server key material as handed over by the integration point.
///
/// Paths are not read until a context is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMaterial {
    /// PEM private key
    pub keyfile: Option<PathBuf>,
    /// PEM certificate chain, leaf first
    pub certfile: Option<PathBuf>,
    /// PEM bundle used to verify client certificates
    pub ca_certs: Option<PathBuf>,
}

impl KeyMaterial {
    /// Certificate chain and key, no client authentication.
    #[must_use]
    pub fn new(certfile: impl Into<PathBuf>, keyfile: impl Into<PathBuf>) -> Self {
        Self { keyfile: Some(keyfile.into()), certfile: Some(certfile.into()), ca_certs: None }
    }

    /// Verify client certificates against this bundle.
    #[must_use]
    pub fn with_ca_certs(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_certs = Some(path.into());
        self
    }

    /// Load the certificate chain and private key.
    ///
    /// # Errors
    ///
    /// `MaterialLoad` if either path is missing, unreadable or contains no
    /// usable PEM item.
    pub fn load_identity(
        &self,
    ) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), TlsError> {
        let certfile = self.certfile.as_deref().ok_or_else(|| {
            TlsError::material_load(
                ErrorCode::MissingCertificate,
                PathBuf::new(),
                "server context requires a certificate file",
                None,
            )
        })?;
        let keyfile = self.keyfile.as_deref().ok_or_else(|| {
            TlsError::material_load(
                ErrorCode::MissingPrivateKey,
                PathBuf::new(),
                "server context requires a private key file",
                None,
            )
        })?;
        Ok((load_certificates(certfile)?, load_private_key(keyfile)?))
    }
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path).map(BufReader::new).map_err(|e| {
        TlsError::material_load(
            ErrorCode::IoError,
            path,
            format!("cannot open: {e}"),
            Some(Box::new(e)),
        )
    })
}

/// Load every certificate in a PEM file.
///
/// # Errors
///
/// `MaterialLoad` if the file cannot be read, a PEM section is malformed, or
/// the file holds no certificate.
pub fn load_certificates(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let mut reader = open(path)?;
    let certs = CertificateDer::pem_reader_iter(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            TlsError::material_load(
                ErrorCode::CertificateParseError,
                path,
                format!("malformed certificate PEM: {e}"),
                Some(Box::new(e)),
            )
        })?;

    if certs.is_empty() {
        return Err(TlsError::material_load(
            ErrorCode::MissingCertificate,
            path,
            "no certificates found",
            None,
        ));
    }
    Ok(certs)
}

/// Load the first private key (PKCS#8, PKCS#1 or SEC1) in a PEM file.
///
/// # Errors
///
/// `MaterialLoad` if the file cannot be read or holds no private key.
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    let mut reader = open(path)?;
    PrivateKeyDer::from_pem_reader(&mut reader).map_err(|e| {
        TlsError::material_load(
            ErrorCode::MissingPrivateKey,
            path,
            format!("no usable private key: {e}"),
            Some(Box::new(e)),
        )
    })
}

/// Trust anchors from a PEM bundle.
///
/// # Errors
///
/// `MaterialLoad` if the bundle cannot be read or none of its certificates
/// is a usable trust anchor.
pub fn load_ca_bundle(path: &Path) -> Result<RootCertStore, TlsError> {
    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(load_certificates(path)?);
    if ignored > 0 {
        tracing::warn!(path = %path.display(), ignored, "skipped unparsable CA certificates");
    }
    if added == 0 {
        return Err(TlsError::material_load(
            ErrorCode::MissingTrustAnchors,
            path,
            "no usable trust anchors",
            None,
        ));
    }
    tracing::debug!(path = %path.display(), added, "loaded CA bundle");
    Ok(roots)
}

/// Platform trust store. May be empty.
#[must_use]
pub fn load_native_roots() -> RootCertStore {
    let result = rustls_native_certs::load_native_certs();
    for error in &result.errors {
        tracing::warn!("error loading some native root certificates: {}", error);
    }

    let mut roots = RootCertStore::empty();
    let (added, _) = roots.add_parsable_certificates(result.certs);
    tracing::debug!(added, "loaded platform root certificates");
    roots
}

/// The configured CA bundle, or the platform store when none is given.
///
/// An empty platform store is not an error: the result is an empty store,
/// and certificate verification then rejects every peer.
///
/// # Errors
///
/// `MaterialLoad` if an explicit bundle is unreadable or has no anchors.
pub fn load_trust_store(ca_cert_path: Option<&Path>) -> Result<RootCertStore, TlsError> {
    match ca_cert_path {
        Some(path) => load_ca_bundle(path),
        None => {
            let roots = load_native_roots();
            if roots.is_empty() {
                tracing::warn!("platform trust store is empty; peers cannot be verified");
            }
            Ok(roots)
        }
    }
}

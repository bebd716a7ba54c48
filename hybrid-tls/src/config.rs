#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! Hybrid TLS configuration.
//!
//! [`HybridTlsConfig`] is immutable once built. Every way of obtaining one
//! (defaults, the builder, deserialized settings) goes through the same
//! validation, so an invalid policy never reaches context construction.
//!
//! ```rust
//! use hybrid_tls::config::{HybridTlsConfig, TlsVersion, VerifyMode};
//! use hybrid_tls::registry::{ClassicalCurve, KyberVariant};
//!
//! let config = HybridTlsConfig::builder()
//!     .with_kyber_variant(1024)
//!     .with_classical_curve("p256")
//!     .build()?;
//! assert_eq!(config.kyber_variant(), KyberVariant::Kyber1024);
//! assert_eq!(config.classical_curve(), ClassicalCurve::P256);
//! assert_eq!(config.min_tls_version(), TlsVersion::Tls13);
//! assert_eq!(config.verify_mode(), VerifyMode::Required);
//! # Ok::<(), hybrid_tls::TlsError>(())
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use rustls::SupportedProtocolVersion;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, TlsError};
use crate::registry::{ClassicalCurve, KyberVariant};

/// Minimum TLS protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TlsVersion {
    /// TLS 1.2
    #[serde(rename = "TLSv1.2", alias = "1.2")]
    Tls12,
    /// TLS 1.3
    #[serde(rename = "TLSv1.3", alias = "1.3")]
    Tls13,
}

impl TlsVersion {
    /// Protocol versions rustls should enable when this is the floor.
    #[must_use]
    pub fn enabled_versions(self) -> &'static [&'static SupportedProtocolVersion] {
        static TLS12_AND_UP: [&SupportedProtocolVersion; 2] =
            [&rustls::version::TLS13, &rustls::version::TLS12];
        static TLS13_ONLY: [&SupportedProtocolVersion; 1] = [&rustls::version::TLS13];
        match self {
            TlsVersion::Tls12 => &TLS12_AND_UP,
            TlsVersion::Tls13 => &TLS13_ONLY,
        }
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsVersion::Tls12 => f.write_str("TLSv1.2"),
            TlsVersion::Tls13 => f.write_str("TLSv1.3"),
        }
    }
}

/// Peer certificate verification policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMode {
    /// Peer must present a certificate that chains to a trusted root
    Required,
    /// Any certificate is accepted
    None,
}

/// Validated hybrid TLS policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "HybridTlsSettings", into = "HybridTlsSettings")]
pub struct HybridTlsConfig {
    kyber_variant: KyberVariant,
    classical_curve: ClassicalCurve,
    min_tls_version: TlsVersion,
    verify_mode: VerifyMode,
    check_hostname: bool,
    ca_cert_path: Option<PathBuf>,
}

impl Default for HybridTlsConfig {
    fn default() -> Self {
        Self {
            kyber_variant: KyberVariant::Kyber768,
            classical_curve: ClassicalCurve::X25519,
            min_tls_version: TlsVersion::Tls13,
            verify_mode: VerifyMode::Required,
            check_hostname: true,
            ca_cert_path: None,
        }
    }
}

impl HybridTlsConfig {
    /// Start from the defaults.
    #[must_use]
    pub fn builder() -> HybridTlsConfigBuilder {
        HybridTlsConfigBuilder::default()
    }

    /// Defaults with peer verification switched off.
    #[must_use]
    pub fn without_verification() -> Self {
        Self { verify_mode: VerifyMode::None, check_hostname: false, ..Self::default() }
    }

    /// Kyber parameter set.
    #[must_use]
    pub fn kyber_variant(&self) -> KyberVariant {
        self.kyber_variant
    }

    /// Classical curve paired with Kyber.
    #[must_use]
    pub fn classical_curve(&self) -> ClassicalCurve {
        self.classical_curve
    }

    /// Lowest protocol version accepted.
    #[must_use]
    pub fn min_tls_version(&self) -> TlsVersion {
        self.min_tls_version
    }

    /// Peer verification policy.
    #[must_use]
    pub fn verify_mode(&self) -> VerifyMode {
        self.verify_mode
    }

    /// Whether the peer name is checked against the certificate.
    #[must_use]
    pub fn check_hostname(&self) -> bool {
        self.check_hostname
    }

    /// CA bundle used as the trust store, if any.
    #[must_use]
    pub fn ca_cert_path(&self) -> Option<&Path> {
        self.ca_cert_path.as_deref()
    }

    /// Fluent `to_builder` for deriving a modified copy.
    #[must_use]
    pub fn to_builder(&self) -> HybridTlsConfigBuilder {
        HybridTlsConfigBuilder { settings: HybridTlsSettings::from(self.clone()) }
    }
}

/// Raw, unvalidated configuration as it appears in settings files.
///
/// Missing fields take the defaults of [`HybridTlsConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HybridTlsSettings {
    /// 512, 768 or 1024
    pub kyber_variant: u16,
    /// Curve name, aliases accepted
    pub classical_curve: String,
    /// Minimum protocol version
    pub min_tls_version: TlsVersion,
    /// Verification policy
    pub verify_mode: VerifyMode,
    /// Hostname checking
    pub check_hostname: bool,
    /// Optional CA bundle
    pub ca_cert_path: Option<PathBuf>,
}

impl Default for HybridTlsSettings {
    fn default() -> Self {
        HybridTlsConfig::default().into()
    }
}

impl From<HybridTlsConfig> for HybridTlsSettings {
    fn from(config: HybridTlsConfig) -> Self {
        Self {
            kyber_variant: config.kyber_variant.as_u16(),
            classical_curve: config.classical_curve.as_str().to_string(),
            min_tls_version: config.min_tls_version,
            verify_mode: config.verify_mode,
            check_hostname: config.check_hostname,
            ca_cert_path: config.ca_cert_path,
        }
    }
}

impl TryFrom<HybridTlsSettings> for HybridTlsConfig {
    type Error = TlsError;

    fn try_from(settings: HybridTlsSettings) -> Result<Self, Self::Error> {
        let config = Self {
            kyber_variant: KyberVariant::try_from(settings.kyber_variant)?,
            classical_curve: settings.classical_curve.parse()?,
            min_tls_version: settings.min_tls_version,
            verify_mode: settings.verify_mode,
            check_hostname: settings.check_hostname,
            ca_cert_path: settings.ca_cert_path,
        };
        config.validate()?;
        Ok(config)
    }
}

impl HybridTlsConfig {
    fn validate(&self) -> Result<(), TlsError> {
        if self.check_hostname && self.verify_mode != VerifyMode::Required {
            return Err(TlsError::config_invalid(
                ErrorCode::InvalidConfig,
                "check_hostname",
                "check_hostname requires verify_mode=required",
                "Set check_hostname to false or verify_mode to required",
            ));
        }
        if let Some(path) = &self.ca_cert_path
            && path.as_os_str().is_empty()
        {
            return Err(TlsError::config_invalid(
                ErrorCode::InvalidConfig,
                "ca_cert_path",
                "ca_cert_path is empty",
                "Omit ca_cert_path to use the platform trust store",
            ));
        }
        Ok(())
    }
}

/// Builder for [`HybridTlsConfig`].
#[derive(Debug, Clone, Default)]
pub struct HybridTlsConfigBuilder {
    settings: HybridTlsSettings,
}

impl HybridTlsConfigBuilder {
    /// Set the Kyber variant (512, 768 or 1024).
    #[must_use]
    pub fn with_kyber_variant(mut self, variant: u16) -> Self {
        self.settings.kyber_variant = variant;
        self
    }

    /// Set the classical curve by name.
    #[must_use]
    pub fn with_classical_curve(mut self, curve: impl Into<String>) -> Self {
        self.settings.classical_curve = curve.into();
        self
    }

    /// Set the minimum TLS version.
    #[must_use]
    pub fn with_min_tls_version(mut self, version: TlsVersion) -> Self {
        self.settings.min_tls_version = version;
        self
    }

    /// Set the verification mode.
    #[must_use]
    pub fn with_verify_mode(mut self, mode: VerifyMode) -> Self {
        self.settings.verify_mode = mode;
        self
    }

    /// Enable or disable hostname checking.
    #[must_use]
    pub fn with_check_hostname(mut self, check: bool) -> Self {
        self.settings.check_hostname = check;
        self
    }

    /// Use the given CA bundle instead of the platform trust store.
    #[must_use]
    pub fn with_ca_cert_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.ca_cert_path = Some(path.into());
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// Returns [`TlsError::ConfigInvalid`] for an unknown variant or curve, or
    /// when `check_hostname` is set without `verify_mode = required`.
    pub fn build(self) -> Result<HybridTlsConfig, TlsError> {
        HybridTlsConfig::try_from(self.settings)
    }
}

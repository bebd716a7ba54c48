#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # Hybrid Group Registry
//!
//! Static table of the hybrid key-exchange groups this crate knows about:
//! the cross product of {p256, x25519} with Kyber-{512, 768, 1024}.
//!
//! Canonical names follow `<curve>_kyber<variant>`. Where a standardized
//! ML-KEM successor group exists on the wire, the entry carries its IANA
//! `NamedGroup` codepoint so it can be matched against a rustls provider.
//!
//! ```
//! use hybrid_tls::registry::{resolve_group, ClassicalCurve, KyberVariant};
//!
//! let group = resolve_group(ClassicalCurve::X25519, KyberVariant::Kyber768)?;
//! assert_eq!(group.to_string(), "x25519_kyber768");
//! assert_eq!(group.codepoint(), Some(0x11EC));
//! # Ok::<(), hybrid_tls::TlsError>(())
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::TlsError;

/// Classical elliptic curve half of a hybrid group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassicalCurve {
    /// Curve25519 ECDH
    X25519,
    /// NIST P-256 (secp256r1)
    P256,
    /// NIST P-384 (secp384r1). Valid for classical TLS, not part of any hybrid pair.
    P384,
}

impl ClassicalCurve {
    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ClassicalCurve::X25519 => "x25519",
            ClassicalCurve::P256 => "p256",
            ClassicalCurve::P384 => "p384",
        }
    }

    /// IANA NamedGroup codepoint of the curve on its own.
    #[must_use]
    pub const fn codepoint(self) -> u16 {
        match self {
            ClassicalCurve::X25519 => 0x001D,
            ClassicalCurve::P256 => 0x0017,
            ClassicalCurve::P384 => 0x0018,
        }
    }

    /// Encoded ECDH public key share size in bytes.
    #[must_use]
    pub const fn share_size(self) -> usize {
        match self {
            ClassicalCurve::X25519 => 32,
            // uncompressed SEC1 points
            ClassicalCurve::P256 => 65,
            ClassicalCurve::P384 => 97,
        }
    }

    const fn scalar_size(self) -> usize {
        match self {
            ClassicalCurve::X25519 | ClassicalCurve::P256 => 32,
            ClassicalCurve::P384 => 48,
        }
    }
}

impl fmt::Display for ClassicalCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassicalCurve {
    type Err = TlsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x25519" => Ok(ClassicalCurve::X25519),
            "p256" | "p-256" | "secp256r1" | "prime256v1" => Ok(ClassicalCurve::P256),
            "p384" | "p-384" | "secp384r1" => Ok(ClassicalCurve::P384),
            other => Err(TlsError::config_invalid(
                crate::error::ErrorCode::InvalidConfig,
                "classical_curve",
                format!("unknown classical curve '{other}'"),
                "Use x25519, p256 or p384",
            )),
        }
    }
}

/// Kyber (ML-KEM) parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KyberVariant {
    /// Kyber-512 / ML-KEM-512 (NIST level 1)
    Kyber512,
    /// Kyber-768 / ML-KEM-768 (NIST level 3)
    Kyber768,
    /// Kyber-1024 / ML-KEM-1024 (NIST level 5)
    Kyber1024,
}

impl KyberVariant {
    /// Numeric variant as used in group names.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        match self {
            KyberVariant::Kyber512 => 512,
            KyberVariant::Kyber768 => 768,
            KyberVariant::Kyber1024 => 1024,
        }
    }

    /// `(public key, secret key, ciphertext)` sizes in bytes.
    #[must_use]
    pub const fn sizes(self) -> (usize, usize, usize) {
        match self {
            KyberVariant::Kyber512 => (800, 1632, 768),
            KyberVariant::Kyber768 => (1184, 2400, 1088),
            KyberVariant::Kyber1024 => (1568, 3168, 1568),
        }
    }
}

impl TryFrom<u16> for KyberVariant {
    type Error = TlsError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            512 => Ok(KyberVariant::Kyber512),
            768 => Ok(KyberVariant::Kyber768),
            1024 => Ok(KyberVariant::Kyber1024),
            other => Err(TlsError::config_invalid(
                crate::error::ErrorCode::InvalidConfig,
                "kyber_variant",
                format!("kyber_variant must be 512, 768 or 1024, got {other}"),
                "Use 768 unless you have a reason not to",
            )),
        }
    }
}

impl From<KyberVariant> for u16 {
    fn from(variant: KyberVariant) -> Self {
        variant.as_u16()
    }
}

impl fmt::Display for KyberVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// One entry of the registry.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct HybridGroup {
    name: &'static str,
    curve: ClassicalCurve,
    variant: KyberVariant,
    codepoint: Option<u16>,
}

impl HybridGroup {
    const fn new(
        name: &'static str,
        curve: ClassicalCurve,
        variant: KyberVariant,
        codepoint: Option<u16>,
    ) -> Self {
        Self { name, curve, variant, codepoint }
    }

    /// Canonical name, e.g. `x25519_kyber768`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Classical half.
    #[must_use]
    pub const fn curve(&self) -> ClassicalCurve {
        self.curve
    }

    /// Post-quantum half.
    #[must_use]
    pub const fn variant(&self) -> KyberVariant {
        self.variant
    }

    /// IANA NamedGroup of the standardized ML-KEM hybrid, if one is assigned.
    #[must_use]
    pub const fn codepoint(&self) -> Option<u16> {
        self.codepoint
    }

    /// Key share and secret sizes for this combination.
    #[must_use]
    pub fn kex_info(&self) -> KexInfo {
        let (kem_pk, kem_sk, kem_ct) = self.variant.sizes();
        KexInfo {
            method: self.name.to_string(),
            security_level: match self.variant {
                KyberVariant::Kyber512 => "Hybrid (NIST level 1 + classical)",
                KyberVariant::Kyber768 => "Hybrid (NIST level 3 + classical)",
                KyberVariant::Kyber1024 => "Hybrid (NIST level 5 + classical)",
            }
            .to_string(),
            is_pq_secure: true,
            pk_size: self.curve.share_size() + kem_pk,
            sk_size: self.curve.scalar_size() + kem_sk,
            ct_size: self.curve.share_size() + kem_ct,
            ss_size: 64,
        }
    }
}

impl fmt::Display for HybridGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Key exchange information for monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KexInfo {
    /// Key exchange method used
    pub method: String,
    /// Security level description
    pub security_level: String,
    /// Whether this key exchange is post-quantum secure
    pub is_pq_secure: bool,
    /// Client key share size in bytes
    pub pk_size: usize,
    /// Client secret size in bytes
    pub sk_size: usize,
    /// Server key share (ECDH share + KEM ciphertext) size in bytes
    pub ct_size: usize,
    /// Combined shared secret size in bytes
    pub ss_size: usize,
}

/// All registered hybrid groups, in canonical order.
pub static HYBRID_KEX_GROUPS: [HybridGroup; 6] = [
    HybridGroup::new("p256_kyber512", ClassicalCurve::P256, KyberVariant::Kyber512, None),
    HybridGroup::new("p256_kyber768", ClassicalCurve::P256, KyberVariant::Kyber768, Some(0x11EB)),
    HybridGroup::new("p256_kyber1024", ClassicalCurve::P256, KyberVariant::Kyber1024, None),
    HybridGroup::new("x25519_kyber512", ClassicalCurve::X25519, KyberVariant::Kyber512, None),
    HybridGroup::new("x25519_kyber768", ClassicalCurve::X25519, KyberVariant::Kyber768, Some(0x11EC)),
    HybridGroup::new("x25519_kyber1024", ClassicalCurve::X25519, KyberVariant::Kyber1024, None),
];

/// Canonical group names, same order as [`HYBRID_KEX_GROUPS`].
pub const HYBRID_GROUP_NAMES: [&str; 6] = [
    "p256_kyber512",
    "p256_kyber768",
    "p256_kyber1024",
    "x25519_kyber512",
    "x25519_kyber768",
    "x25519_kyber1024",
];

/// Resolve a curve/variant pair to its registry entry.
///
/// # Errors
///
/// Returns [`TlsError::UnsupportedCombination`] if the pair is not registered
/// (currently any pair using [`ClassicalCurve::P384`]).
pub fn resolve_group(
    curve: ClassicalCurve,
    variant: KyberVariant,
) -> Result<&'static HybridGroup, TlsError> {
    HYBRID_KEX_GROUPS
        .iter()
        .find(|g| g.curve == curve && g.variant == variant)
        .ok_or_else(|| TlsError::unsupported_combination(curve.as_str(), variant.as_u16()))
}

/// String/number form of [`resolve_group`].
///
/// Unknown curve names and variants are reported as an unsupported
/// combination rather than a configuration error, since nothing here is a
/// validated config yet.
///
/// # Errors
///
/// Returns [`TlsError::UnsupportedCombination`] for anything outside the six
/// registered pairs.
pub fn resolve_group_str(curve: &str, variant: u16) -> Result<&'static HybridGroup, TlsError> {
    let unsupported = || TlsError::unsupported_combination(curve, variant);
    let parsed_curve = curve.parse::<ClassicalCurve>().map_err(|_| unsupported())?;
    let parsed_variant = KyberVariant::try_from(variant).map_err(|_| unsupported())?;
    resolve_group(parsed_curve, parsed_variant)
}

/// Find an entry by canonical name.
#[must_use]
pub fn lookup_group(name: &str) -> Option<&'static HybridGroup> {
    HYBRID_KEX_GROUPS.iter().find(|g| g.name == name)
}

/// Find an entry by IANA codepoint.
#[must_use]
pub fn lookup_codepoint(codepoint: u16) -> Option<&'static HybridGroup> {
    HYBRID_KEX_GROUPS.iter().find(|g| g.codepoint == Some(codepoint))
}

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

//! # Key Exchange Providers
//!
//! Builds the rustls [`CryptoProvider`]s behind each context mode by
//! reordering and filtering `kx_groups`:
//!
//! - **Quantum-safe**: every registered hybrid group the backend offers,
//!   then classical groups for peers without hybrid support.
//! - **Pinned hybrid**: one registry group first, then classical groups with
//!   the configured curve first.
//! - **Classical**: aws-lc-rs ECDHE groups only. Never offers a hybrid or
//!   pure ML-KEM group.
//!
//! The hybrid backend is `rustls-post-quantum` (aws-lc-rs ML-KEM).

use rustls::NamedGroup;
use rustls::crypto::{CryptoProvider, SupportedKxGroup};

use crate::TlsError;
use crate::error::ErrorCode;
use crate::registry::{ClassicalCurve, HybridGroup, lookup_codepoint};

/// Classical ECDHE groups, in default preference order.
pub const CLASSICAL_CODEPOINTS: [u16; 5] = [
    0x001D, // x25519
    0x0017, // secp256r1
    0x0018, // secp384r1
    0x0019, // secp521r1
    0x001E, // x448
];

/// IANA codepoint of a kx group.
#[must_use]
pub fn codepoint(group: &dyn SupportedKxGroup) -> u16 {
    u16::from(group.name())
}

/// Whether the group is a plain ECDHE group.
#[must_use]
pub fn is_classical(group: &dyn SupportedKxGroup) -> bool {
    CLASSICAL_CODEPOINTS.contains(&codepoint(group))
}

/// Whether the group corresponds to a registry entry.
#[must_use]
pub fn is_registered_hybrid(group: &dyn SupportedKxGroup) -> bool {
    lookup_codepoint(codepoint(group)).is_some()
}

/// The hybrid-capable backend, unmodified.
#[must_use]
pub fn hybrid_backend() -> CryptoProvider {
    rustls_post_quantum::provider()
}

/// Registry entries the given provider can negotiate, in provider order.
#[must_use]
pub fn offered_hybrid_groups(provider: &CryptoProvider) -> Vec<&'static HybridGroup> {
    provider.kx_groups.iter().filter_map(|g| lookup_codepoint(codepoint(*g))).collect()
}

/// Classical-only provider, optionally moving one curve to the front.
#[must_use]
pub fn classical_provider(preferred: Option<ClassicalCurve>) -> CryptoProvider {
    let base = rustls::crypto::aws_lc_rs::default_provider();
    let mut kx_groups: Vec<&'static dyn SupportedKxGroup> =
        base.kx_groups.iter().copied().filter(|g| is_classical(*g)).collect();
    if let Some(curve) = preferred {
        prefer(&mut kx_groups, curve.codepoint());
    }
    CryptoProvider { kx_groups, ..base }
}

/// Hybrid groups first (backend order), classical after.
///
/// # Errors
///
/// Returns [`TlsError::BackendUnavailable`] if the backend offers no
/// registered hybrid group.
pub fn quantum_safe_provider() -> Result<CryptoProvider, TlsError> {
    let base = hybrid_backend();
    let hybrid: Vec<&'static dyn SupportedKxGroup> =
        base.kx_groups.iter().copied().filter(|g| is_registered_hybrid(*g)).collect();
    if hybrid.is_empty() {
        return Err(TlsError::backend_unavailable(
            ErrorCode::GroupNotOffered,
            "backend offers no registered hybrid group",
        ));
    }
    let classical = base.kx_groups.iter().copied().filter(|g| is_classical(*g));
    let kx_groups = hybrid.into_iter().chain(classical).collect();
    Ok(CryptoProvider { kx_groups, ..base })
}

/// One pinned hybrid group, then classical groups with `curve` first.
///
/// # Errors
///
/// Returns [`TlsError::BackendUnavailable`] if the group has no wire
/// codepoint or the backend does not implement it.
pub fn pinned_provider(
    group: &'static HybridGroup,
    curve: ClassicalCurve,
) -> Result<CryptoProvider, TlsError> {
    let Some(wanted) = group.codepoint() else {
        return Err(TlsError::backend_unavailable(
            ErrorCode::GroupNotOffered,
            format!("{group} has no negotiable codepoint in this backend"),
        ));
    };

    let base = hybrid_backend();
    let pinned = base.kx_groups.iter().copied().find(|g| codepoint(*g) == wanted).ok_or_else(|| {
        TlsError::backend_unavailable(
            ErrorCode::GroupNotOffered,
            format!("backend does not offer {group} (0x{wanted:04X})"),
        )
    })?;

    let mut classical: Vec<&'static dyn SupportedKxGroup> =
        base.kx_groups.iter().copied().filter(|g| is_classical(*g)).collect();
    prefer(&mut classical, curve.codepoint());

    let kx_groups = std::iter::once(pinned).chain(classical).collect();
    Ok(CryptoProvider { kx_groups, ..base })
}

/// Names of the kx groups a provider offers, in order.
#[must_use]
pub fn group_names(provider: &CryptoProvider) -> Vec<NamedGroup> {
    provider.kx_groups.iter().map(|g| g.name()).collect()
}

fn prefer(groups: &mut [&'static dyn SupportedKxGroup], wanted: u16) {
    if let Some(pos) = groups.iter().position(|g| codepoint(*g) == wanted) {
        groups[..=pos].rotate_right(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::registry::lookup_group;

    #[test]
    fn test_classical_provider_has_no_hybrid_groups() {
        let provider = classical_provider(None);
        assert!(!provider.kx_groups.is_empty());
        assert!(provider.kx_groups.iter().all(|g| is_classical(*g)));
    }

    #[test]
    fn test_classical_provider_prefers_curve() {
        let provider = classical_provider(Some(ClassicalCurve::P256));
        assert_eq!(codepoint(provider.kx_groups[0]), 0x0017);
    }

    #[test]
    fn test_backend_offers_x25519_mlkem768() {
        let offered = offered_hybrid_groups(&hybrid_backend());
        assert!(offered.iter().any(|g| g.name() == "x25519_kyber768"));
    }

    #[test]
    fn test_quantum_safe_provider_order() {
        let provider = quantum_safe_provider().unwrap();
        assert!(is_registered_hybrid(provider.kx_groups[0]));
        let first_classical = provider.kx_groups.iter().position(|g| is_classical(*g)).unwrap();
        assert!(provider.kx_groups[first_classical..].iter().all(|g| is_classical(*g)));
    }

    #[test]
    fn test_pinned_provider() {
        let group = lookup_group("x25519_kyber768").unwrap();
        let provider = pinned_provider(group, ClassicalCurve::P256).unwrap();
        assert_eq!(codepoint(provider.kx_groups[0]), 0x11EC);
        assert_eq!(codepoint(provider.kx_groups[1]), 0x0017);
        assert_eq!(provider.kx_groups.iter().filter(|g| is_registered_hybrid(**g)).count(), 1);
    }

    #[test]
    fn test_pinned_provider_without_codepoint() {
        let group = lookup_group("x25519_kyber512").unwrap();
        let err = pinned_provider(group, ClassicalCurve::X25519).unwrap_err();
        assert_eq!(err.code(), ErrorCode::GroupNotOffered);
    }
}

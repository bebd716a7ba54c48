#![deny(unsafe_code)]
// Test files use unwrap() for simplicity
#![allow(clippy::unwrap_used)]

//! Backend detection tests

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use hybrid_tls::detect::BACKEND_VERSION;
use hybrid_tls::*;

#[test]
fn test_detection_result_has_exactly_five_keys() {
    let value = serde_json::to_value(verify_hybrid_support()).unwrap();
    let keys: BTreeSet<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        BTreeSet::from(["available", "backend_path", "supported_groups", "backend_version", "error"])
    );
}

#[test]
fn test_linked_backend_is_available() {
    let result = verify_hybrid_support();
    assert!(result.is_available(), "unexpected: {:?}", result.error());
    assert!(result.error().is_none());
    assert_eq!(result.backend_version(), BACKEND_VERSION);
}

#[test]
fn test_backend_path_is_none_or_exists() {
    match locate_backend_path() {
        Some(path) => assert!(path.exists()),
        None => assert!(verify_hybrid_support().backend_path().is_none()),
    }
}

#[test]
fn test_supported_groups_listing() {
    let groups = list_supported_groups();
    assert!(!groups.is_empty());
    assert!(groups.iter().any(|g| g.contains("kyber")));
    assert_eq!(groups, HYBRID_GROUP_NAMES);
}

#[test]
fn test_unavailable_result_still_lists_groups() {
    let result = FixedDetector::unavailable("no backend").detect();
    assert!(!result.is_available());
    assert_eq!(result.error(), Some("no backend"));
    assert_eq!(result.supported_groups().len(), 6);

    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["available"], false);
    assert_eq!(value["error"], "no backend");
}

#[test]
fn test_concurrent_first_callers_agree() {
    let results: Vec<&'static DetectionResult> =
        (0..8).map(|_| thread::spawn(verify_hybrid_support)).map(|h| h.join().unwrap()).collect();
    assert!(results.windows(2).all(|w| std::ptr::eq(w[0], w[1])));
}

#[test]
fn test_detectors_are_shareable() {
    let detectors: Vec<Arc<dyn Detector>> = vec![
        Arc::new(CachedDetector),
        Arc::new(BackendDetector::new().with_search_dirs(Vec::new())),
        Arc::new(FixedDetector::available()),
    ];
    for detector in detectors {
        let result = thread::spawn(move || detector.detect()).join().unwrap();
        assert!(result.is_available());
    }
}

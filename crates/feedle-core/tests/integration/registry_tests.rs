//! Tests for `SourceRegistry`.

use feedle_core::{AppError, SourceKind, SourceRegistry};

use crate::integration::common::MockSourceClient;

fn both() -> SourceRegistry<MockSourceClient> {
    SourceRegistry::new()
        .with(MockSourceClient::new(SourceKind::Reddit, vec![]))
        .with(MockSourceClient::new(SourceKind::YouTube, vec![]))
}

#[test]
fn test_empty_selection_resolves_to_all_registered() {
    let registry = both();

    let kinds = registry.resolve(&[]).unwrap();

    assert_eq!(kinds, vec![SourceKind::Reddit, SourceKind::YouTube]);
}

#[test]
fn test_selection_is_case_insensitive_and_deduplicated() {
    let registry = both();

    let kinds = registry
        .resolve(&["YouTube".to_string(), "youtube".to_string()])
        .unwrap();

    assert_eq!(kinds, vec![SourceKind::YouTube]);
}

#[test]
fn test_unknown_source_is_rejected() {
    let registry = both();

    let err = registry.resolve(&["myspace".to_string()]).unwrap_err();

    assert!(matches!(err, AppError::UnsupportedSource(name) if name == "myspace"));
}

#[test]
fn test_known_but_unregistered_source_is_kept() {
    let registry =
        SourceRegistry::new().with(MockSourceClient::new(SourceKind::Reddit, vec![]));

    let kinds = registry
        .resolve(&["reddit".to_string(), "youtube".to_string()])
        .unwrap();

    assert_eq!(kinds, vec![SourceKind::Reddit, SourceKind::YouTube]);
    assert!(registry.get(SourceKind::YouTube).is_none());
}

#[test]
fn test_register_replaces_existing_client() {
    let mut registry = SourceRegistry::new();
    registry.register(MockSourceClient::new(SourceKind::Reddit, vec![]));
    registry.register(MockSourceClient::failing(SourceKind::Reddit, "replaced"));

    assert_eq!(registry.kinds(), vec![SourceKind::Reddit]);
    assert!(!registry.is_empty());
    assert!(registry.get(SourceKind::YouTube).is_none());
}

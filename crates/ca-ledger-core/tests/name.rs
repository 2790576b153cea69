// crates/ca-ledger-core/tests/name.rs
// ============================================================================
// Module: Name Tests
// Description: Validate hierarchical name parsing and prefix operations.
// Purpose: Ensure names render canonically and reject malformed input.
// Dependencies: ca-ledger-core, proptest, serde_json
// ============================================================================

//! Parsing, rendering, and prefix tests for hierarchical names.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use ca_ledger_core::MAX_NAME_LENGTH;
use ca_ledger_core::Name;
use ca_ledger_core::NameError;
use proptest::prelude::*;

#[test]
fn root_renders_as_single_separator() {
    let root = Name::parse("/").unwrap();
    assert!(root.is_empty());
    assert_eq!(root.to_uri(), "/");
    assert_eq!(root, Name::root());
}

#[test]
fn components_are_split_in_order() {
    let name = Name::parse("/ca/KEY/1").unwrap();
    assert_eq!(name.components(), ["ca", "KEY", "1"]);
    assert_eq!(name.len(), 3);
    assert_eq!(name.to_string(), "/ca/KEY/1");
}

#[test]
fn malformed_names_are_rejected() {
    assert!(matches!(Name::parse("ca"), Err(NameError::MissingLeadingSeparator(_))));
    assert!(matches!(Name::parse(""), Err(NameError::MissingLeadingSeparator(_))));
    assert!(matches!(Name::parse("/ca//KEY"), Err(NameError::EmptyComponent(_))));
    assert!(matches!(Name::parse("/ca/"), Err(NameError::EmptyComponent(_))));
    assert!(matches!(Name::parse("/ca/a b"), Err(NameError::InvalidComponent(_))));
    let long = format!("/{}", "a".repeat(MAX_NAME_LENGTH));
    assert!(matches!(Name::parse(&long), Err(NameError::TooLong)));
}

#[test]
fn prefix_relationships() {
    let ca = Name::parse("/ca").unwrap();
    let key = Name::parse("/ca/KEY/1").unwrap();
    assert!(ca.is_prefix_of(&key));
    assert!(ca.is_prefix_of(&ca));
    assert!(!key.is_prefix_of(&ca));
    assert!(Name::root().is_prefix_of(&key));
    assert!(!Name::parse("/cab").unwrap().is_prefix_of(&key));
    assert_eq!(key.prefix(1), ca);
    assert_eq!(key.prefix(10), key);
}

#[test]
fn append_validates_component() {
    let ca = Name::parse("/ca").unwrap();
    assert_eq!(ca.append("alice").unwrap().to_uri(), "/ca/alice");
    assert!(matches!(ca.append("a/b"), Err(NameError::InvalidComponent(_))));
    assert!(matches!(ca.append(""), Err(NameError::EmptyComponent(_))));
}

#[test]
fn names_serialize_as_uri_strings() {
    let name = Name::parse("/ca/KEY/1").unwrap();
    let text = serde_json::to_string(&name).unwrap();
    assert_eq!(text, "\"/ca/KEY/1\"");
    let back: Name = serde_json::from_str(&text).unwrap();
    assert_eq!(back, name);
    assert!(serde_json::from_str::<Name>("\"no-slash\"").is_err());
}

proptest! {
    #[test]
    fn parse_inverts_render(components in prop::collection::vec("[A-Za-z0-9._~%-]{1,12}", 0 .. 8)) {
        let uri = if components.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", components.join("/"))
        };
        let name = Name::parse(&uri).unwrap();
        prop_assert_eq!(name.components(), components.as_slice());
        prop_assert_eq!(name.to_uri(), uri);
    }
}

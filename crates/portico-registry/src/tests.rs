// crates/portico-registry/src/tests.rs
// ============================================================================
// Module: API Config Registry Tests
// Description: Unit tests for registration, lookup, and duplicate rejection.
// Purpose: Pin the reference registration sequencing and failure behavior.
// Dependencies: portico-registry, serde_json
// ============================================================================

//! ## Overview
//! Validates duplicate-class rejection, joint multi-class registration,
//! method lookup semantics, and config-list ordering.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use portico_core::ConfigurationError;
use serde_json::Value;
use serde_json::json;

use super::ApiConfigRegistry;

/// Builds a config with one method per `(name, backend)` pair.
fn config(methods: &[(&str, Option<&str>)]) -> Value {
    let mut map = serde_json::Map::new();
    for (name, backend) in methods {
        let entry = backend.map_or_else(|| json!({}), |raw| json!({ "backendMethod": raw }));
        map.insert((*name).to_string(), entry);
    }
    json!({ "methods": Value::Object(map) })
}

#[test]
fn none_config_is_a_noop() {
    let mut registry = ApiConfigRegistry::new();
    registry.register(None).expect("noop");
    assert!(registry.all_configs().is_empty());
}

#[test]
fn registering_same_class_twice_fails() {
    let mut registry = ApiConfigRegistry::new();
    let first = config(&[("books.list", Some("BooksService.list"))]);
    registry.register(Some(&first)).expect("first registration");

    let second = config(&[("books.get", Some("BooksService.get"))]);
    let err = registry.register(Some(&second)).expect_err("duplicate class");
    assert!(matches!(err, ConfigurationError::DuplicateApiClass(class) if class == "BooksService"));

    // Nothing from the rejected call is visible.
    assert_eq!(registry.all_configs().len(), 1);
    assert!(registry.lookup("books.get").is_none());
}

#[test]
fn distinct_classes_for_one_api_both_register() {
    let mut registry = ApiConfigRegistry::new();
    let part1 = config(&[("iata.list_airports", Some("ServicePart1.list_airports"))]);
    let part2 = config(&[("iata.get_airport", Some("ServicePart2.get_airport"))]);
    registry.register(Some(&part1)).expect("part 1");
    registry.register(Some(&part2)).expect("part 2");
    assert_eq!(registry.all_configs(), &[part1, part2]);
}

#[test]
fn config_list_keeps_duplicates_and_order() {
    let mut registry = ApiConfigRegistry::new();
    let v1 = config(&[("iata.list", Some("V1Service.list"))]);
    let v2 = config(&[("iata.list2", Some("V2Service.list"))]);
    registry.register(Some(&v1)).expect("v1");
    registry.register(Some(&v2)).expect("v2");
    registry.register(Some(&v1)).expect_err("duplicate V1Service");
    assert_eq!(registry.all_configs(), &[v1, v2]);
}

#[test]
fn lookup_returns_parsed_implementation() {
    let mut registry = ApiConfigRegistry::new();
    let cfg = config(&[
        ("books.list", Some("BooksService.list_books")),
        ("books.ping", None),
    ]);
    registry.register(Some(&cfg)).expect("registration");

    let binding = registry.lookup("books.list").expect("configured method");
    assert_eq!(binding.as_str(), "BooksService.list_books");
    assert_eq!(binding.class_name(), Some("BooksService"));

    // A method with no implementation identifier is recorded but resolves
    // to nothing, indistinguishable from an absent method.
    assert!(registry.lookup("books.ping").is_none());
    assert!(registry.lookup("books.missing").is_none());
}

#[test]
fn config_without_class_bearing_methods_still_appends() {
    let mut registry = ApiConfigRegistry::new();
    let cfg = config(&[("loose.method", Some("bare_function"))]);
    registry.register(Some(&cfg)).expect("registration");
    assert_eq!(registry.all_configs().len(), 1);

    // A dotless identifier carries no class but is still resolvable.
    let binding = registry.lookup("loose.method").expect("configured method");
    assert_eq!(binding.as_str(), "bare_function");
    assert!(binding.class_name().is_none());

    // Re-registering the same config succeeds; no class was recorded.
    registry.register(Some(&cfg)).expect("re-registration");
    assert_eq!(registry.all_configs().len(), 2);
}

#[test]
fn rejected_registration_keeps_earlier_classes_marked() {
    let mut registry = ApiConfigRegistry::new();
    let first = config(&[("z.method", Some("ZService.method"))]);
    registry.register(Some(&first)).expect("first registration");

    // AService sorts before ZService, so it is inserted before the
    // duplicate is detected and stays registered afterwards.
    let mixed = config(&[
        ("a.method", Some("AService.method")),
        ("z.other", Some("ZService.other")),
    ]);
    registry.register(Some(&mixed)).expect_err("duplicate ZService");

    let retry = config(&[("a.late", Some("AService.late"))]);
    let err = registry.register(Some(&retry)).expect_err("AService already marked");
    assert!(matches!(err, ConfigurationError::DuplicateApiClass(class) if class == "AService"));
}

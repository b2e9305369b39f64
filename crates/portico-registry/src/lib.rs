// crates/portico-registry/src/lib.rs
// ============================================================================
// Module: API Config Registry
// Description: Load-time ledger of registered backend API configurations.
// Purpose: Reject duplicate backend classes and map public method names to
//          backend implementation identifiers.
// Dependencies: portico-core, serde_json
// ============================================================================

//! ## Overview
//! The registry runs once, at server start, before request traffic: each
//! backend's parsed configuration is registered, the set of implementing
//! classes is checked against prior registrations, and a method-name to
//! implementation-identifier map is built for request dispatch. After the
//! registration phase the registry is read-only; steady-state readers may
//! assume no concurrent writers.
//!
//! ## Invariants
//! - Registering the same backend class twice fails loudly with
//!   [`ConfigurationError::DuplicateApiClass`]; distinct classes jointly
//!   implementing one API are accepted.
//! - A rejected registration appends nothing to the config list and leaves
//!   the method map untouched. Classes scanned before the duplicate in the
//!   same call remain marked registered, matching the reference behavior.
//! - `all_configs` preserves registration order and keeps duplicates; the
//!   registry deduplicates by implementing class only, never by API
//!   identity.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use portico_core::ConfigurationError;
use serde_json::Value;

// ============================================================================
// SECTION: Method Implementations
// ============================================================================

/// One method's backend implementation reference, parsed at registration.
///
/// The dotted `Class.method` string exists only at the serialization
/// boundary; lookups return this record without re-splitting.
///
/// # Invariants
/// - `class` is `Some` exactly when the raw identifier contains a dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodImpl {
    /// Raw implementation identifier as configured.
    raw: String,
    /// Implementing class name, when the identifier is class-qualified.
    class: Option<String>,
}

impl MethodImpl {
    /// Parses an implementation identifier.
    fn parse(raw: &str) -> Self {
        let class = raw.split_once('.').map(|(class, _)| class.to_string());
        Self {
            raw: raw.to_string(),
            class,
        }
    }

    /// Returns the raw implementation identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the implementing class name, when class-qualified.
    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        self.class.as_deref()
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Configuration key holding the per-method map inside a backend config.
const METHODS_KEY: &str = "methods";

/// Configuration key holding a method's implementation identifier.
const BACKEND_METHOD_KEY: &str = "backendMethod";

/// Registry of active APIs.
///
/// # Invariants
/// - Write path (`register`) runs during startup only; readers during
///   steady state may assume the registry is frozen.
#[derive(Debug, Default)]
pub struct ApiConfigRegistry {
    /// Backend classes registered so far.
    registered_classes: BTreeSet<String>,
    /// Every registered config, in registration order, duplicates kept.
    api_configs: Vec<Value>,
    /// Public method name to backend implementation; `None` when the
    /// config named a method without an implementation identifier.
    api_methods: BTreeMap<String, Option<MethodImpl>>,
}

impl ApiConfigRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a single API config. A `None` config is a no-op.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::DuplicateApiClass`] when any class
    /// implementing this config was already registered. The config list and
    /// method map are not modified on failure.
    pub fn register(&mut self, config: Option<&Value>) -> Result<(), ConfigurationError> {
        let Some(config) = config else {
            return Ok(());
        };
        self.register_classes(config)?;
        self.api_configs.push(config.clone());
        self.register_methods(config);
        Ok(())
    }

    /// Looks a public method name up, returning its backend implementation
    /// identifier when one was configured.
    #[must_use]
    pub fn lookup(&self, method_name: &str) -> Option<&MethodImpl> {
        self.api_methods.get(method_name).and_then(Option::as_ref)
    }

    /// Returns every registered config, in registration order.
    #[must_use]
    pub fn all_configs(&self) -> &[Value] {
        &self.api_configs
    }

    /// Marks the classes implementing this config as registered, so each
    /// class is only added once per server instance.
    fn register_classes(&mut self, config: &Value) -> Result<(), ConfigurationError> {
        let Some(methods) = config.get(METHODS_KEY).and_then(Value::as_object) else {
            return Ok(());
        };
        let mut service_classes = BTreeSet::new();
        for method in methods.values() {
            if let Some(raw) = method.get(BACKEND_METHOD_KEY).and_then(Value::as_str)
                && let Some((class, _)) = raw.split_once('.')
            {
                service_classes.insert(class.to_string());
            }
        }
        for class in service_classes {
            if self.registered_classes.contains(&class) {
                return Err(ConfigurationError::DuplicateApiClass(class));
            }
            self.registered_classes.insert(class);
        }
        Ok(())
    }

    /// Merges this config's methods into the method map. Methods without an
    /// implementation identifier are recorded as `None`.
    fn register_methods(&mut self, config: &Value) {
        let Some(methods) = config.get(METHODS_KEY).and_then(Value::as_object) else {
            return;
        };
        for (method_name, method) in methods {
            let implementation =
                method.get(BACKEND_METHOD_KEY).and_then(Value::as_str).map(MethodImpl::parse);
            self.api_methods.insert(method_name.clone(), implementation);
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;

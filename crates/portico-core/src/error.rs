// crates/portico-core/src/error.rs
// ============================================================================
// Module: Portico Configuration Errors
// Description: Fatal errors raised during registration and generation.
// Purpose: Give load-time failures loud, enumerable, developer-facing messages.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Configuration errors occur at build/deploy time, operated by a developer:
//! duplicate backend class registration, mixed api/version batches, and
//! duplicate method names. They are surfaced as hard failures and never
//! retried. Request-time token verification never raises these; its failures
//! resolve to "no verified identity" instead.

use thiserror::Error;

/// Fatal configuration error for registration and generation calls.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Messages name the offending class, method, or pair list.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A backend class was registered a second time.
    #[error("api class {0} has already been registered")]
    DuplicateApiClass(String),
    /// One generation batch mixed multiple (name, version) pairs.
    #[error("multiple apis/versions found: {0}")]
    MultipleApiVersions(String),
    /// The same canonical method name was produced by two classes.
    #[error("method {0} used multiple times")]
    DuplicateMethod(String),
    /// A message or enum type name was registered twice.
    #[error("type {0} is already registered")]
    DuplicateType(String),
    /// A generation call received no service classes.
    #[error("generation batch contains no services")]
    EmptyBatch,
}

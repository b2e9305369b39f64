// crates/portico-describe/src/lib.rs
// ============================================================================
// Module: API Description Generators
// Description: Discovery-format and OpenAPI 2.0 document generation.
// Purpose: Turn service descriptors into deterministic description documents.
// Dependencies: portico-core, portico-schema, serde_json, sha2, thiserror
// ============================================================================

//! ## Overview
//! This crate renders machine-readable API description documents from
//! declared service descriptors: the legacy Discovery format and
//! Swagger/OpenAPI 2.0. Both generators share batch validation (one API
//! name/version per call, no duplicate canonical method names), URL scheme
//! rules, and the schema graph builder; output is rendered as
//! `serde_json::Value` trees whose object keys sort deterministically so
//! tests can assert byte-level document equality.
//!
//! ## Index
//! - Public API: [`DiscoveryGenerator`], [`OpenApiGenerator`],
//!   [`DescribeError`], [`pretty_json`]
//! - Shared rules: batch validation, scheme selection, audience hashing
//!   (private, in `common`)

// ============================================================================
// SECTION: Modules
// ============================================================================

mod common;
pub mod discovery;
pub mod openapi;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use discovery::DiscoveryGenerator;
pub use openapi::OpenApiGenerator;

use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while generating a description document.
///
/// # Invariants
/// - Configuration failures are loud and developer-facing; they occur at
///   build/deploy time and are never retried automatically.
#[derive(Debug, Error)]
pub enum DescribeError {
    /// Invalid generation batch or declaration.
    #[error(transparent)]
    Configuration(#[from] portico_core::ConfigurationError),
    /// Inconsistent message graph fed to the schema builder.
    #[error(transparent)]
    Schema(#[from] portico_schema::SchemaError),
    /// JSON rendering failure.
    #[error("json rendering failed: {0}")]
    Json(String),
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders a document with stable key order and trailing newline, suitable
/// for byte-level comparison and on-disk artifacts.
///
/// # Errors
/// Returns [`DescribeError::Json`] when serialization fails.
pub fn pretty_json(document: &Value) -> Result<String, DescribeError> {
    let mut rendered =
        serde_json::to_string_pretty(document).map_err(|err| DescribeError::Json(err.to_string()))?;
    rendered.push('\n');
    Ok(rendered)
}

// crates/portico-describe/src/common.rs
// ============================================================================
// Module: Shared Generator Rules
// Description: Batch validation, URL scheme rules, and naming helpers.
// Purpose: Keep Discovery and OpenAPI generation behavior aligned.
// Dependencies: portico-core, sha2
// ============================================================================

//! ## Overview
//! Both generators accept an ordered batch of service classes and must
//! agree on validation and URL construction. This module holds those shared
//! rules: the one-api-per-batch check, duplicate canonical method
//! detection, the local-development scheme override, audience-set hashing
//! for security definition names, and snake-case to camel-case conversion
//! for operation identifiers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use portico_core::Audiences;
use portico_core::ConfigurationError;
use portico_core::ServiceDescriptor;
use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Batch Validation
// ============================================================================

/// Validates that a generation batch agrees on one (name, version) pair
/// and contains no duplicate canonical method names.
///
/// # Errors
/// Returns [`ConfigurationError::MultipleApiVersions`] listing every
/// distinct pair found (sorted), or
/// [`ConfigurationError::DuplicateMethod`] naming the first collision.
pub fn validate_batch(services: &[ServiceDescriptor]) -> Result<(), ConfigurationError> {
    let pairs: BTreeSet<(&str, &str)> = services
        .iter()
        .map(|service| (service.api.name.as_str(), service.api.version.as_str()))
        .collect();
    if pairs.len() > 1 {
        let listed: Vec<(&str, &str)> = pairs.into_iter().collect();
        return Err(ConfigurationError::MultipleApiVersions(format!("{listed:?}")));
    }

    let mut seen: BTreeSet<String> = BTreeSet::new();
    for service in services {
        for method in &service.methods {
            let canonical = format!("{}.{}", service.api.name, method.name);
            if !seen.insert(canonical.clone()) {
                return Err(ConfigurationError::DuplicateMethod(canonical));
            }
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: URL Rules
// ============================================================================

/// Returns the URL scheme for a hostname: `http` only for local
/// development hosts, so local testing works without TLS.
#[must_use]
pub fn api_scheme(hostname: &str) -> &'static str {
    if hostname == "localhost" || hostname.starts_with("localhost:") {
        "http"
    } else {
        "https"
    }
}

/// Returns the base-path prefix used when joining URLs: the configured
/// base path, or empty for the bare root so joins do not double slashes.
#[must_use]
pub fn base_prefix(base_path: &str) -> &str {
    if base_path == "/" { "" } else { base_path }
}

/// Extracts the `{placeholder}` names from a URL path template, in
/// template order.
#[must_use]
pub fn path_parameters(path: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = path;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };
        names.push(after[..end].to_string());
        rest = &after[end + 1..];
    }
    names
}

// ============================================================================
// SECTION: Naming
// ============================================================================

/// Converts a snake_case implementation name to camelCase for operation
/// identifiers.
#[must_use]
pub fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper_next = false;
    for ch in snake.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Joins an audience set (sorted, comma-separated) and derives the stable
/// 8-character content hash used to suffix security definition names.
#[must_use]
pub fn audience_variant(audiences: &[String]) -> (String, String) {
    let mut sorted: Vec<&str> = audiences.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    let joined = sorted.join(",");
    let digest = Sha256::digest(joined.as_bytes());
    let mut suffix = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        suffix.push_str(&format!("{byte:02x}"));
    }
    (joined, suffix)
}

// ============================================================================
// SECTION: Audience Resolution
// ============================================================================

/// Resolves effective audiences to a per-issuer map restricted to the
/// declared issuer set. Legacy flat lists bind to the default issuer entry
/// when it is declared and are dropped otherwise.
#[must_use]
pub fn resolve_audiences(
    audiences: Option<&Audiences>,
    declared_issuers: &BTreeSet<String>,
) -> BTreeMap<String, Vec<String>> {
    let mut resolved = BTreeMap::new();
    match audiences {
        None => {}
        Some(Audiences::Legacy(list)) => {
            if declared_issuers.contains(portico_core::DEFAULT_ISSUER_NAME) {
                resolved.insert(portico_core::DEFAULT_ISSUER_NAME.to_string(), list.clone());
            }
        }
        Some(Audiences::PerIssuer(map)) => {
            for (issuer, list) in map {
                if declared_issuers.contains(issuer) {
                    resolved.insert(issuer.clone(), list.clone());
                }
            }
        }
    }
    resolved
}

// ============================================================================
// SECTION: Tests
// ============================================================================

// crates/portico-auth/src/certs.rs
// ============================================================================
// Module: Issuer Certificate Cache
// Description: Certificate retrieval with HTTP cache-control derived TTLs.
// Purpose: Serve signing keys from cache, fetching and re-caching on miss.
// Dependencies: crate::{cache, events, fetch}, serde_json
// ============================================================================

//! ## Overview
//! Issuer certificates are published as JSON key sets
//! (`{"keyvalues": [{"modulus", "exponent"}, ...]}`) and cached under the
//! certificate URI. On a miss the set is fetched, its TTL computed from
//! `Cache-Control`/`Age` response headers, and stored when the TTL is
//! positive. Two requests racing on the same missing cert both fetch;
//! that is redundant work, not a correctness issue.
//!
//! ## Invariants
//! - TTL is `max(0, max-age - age)`; an unparsable `Cache-Control` header
//!   yields zero, which means "do not cache".
//! - A non-200 fetch or unparsable body yields no certificates; the
//!   caller treats that as a verification failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::cache::CERT_NAMESPACE;
use crate::cache::KeyValueCache;
use crate::events::AuthEvent;
use crate::events::AuthEventSink;
use crate::events::RejectionStage;
use crate::events::TokenRejection;
use crate::fetch::FetchResponse;
use crate::fetch::HttpFetcher;

// ============================================================================
// SECTION: TTL Arithmetic
// ============================================================================

/// Computes the number of seconds a certificate response may be cached.
///
/// The first parsable `max-age` directive in `Cache-Control` wins; the
/// response `Age` is subtracted when parsable. The result is never
/// negative, and zero means "do not cache".
#[must_use]
pub fn cert_expiration_seconds(response: &FetchResponse) -> u64 {
    let cache_control = response.header("Cache-Control").unwrap_or_default();
    let Some(max_age) = cache_control.split(',').find_map(parse_max_age) else {
        return 0;
    };
    let age = response
        .header("Age")
        .and_then(|value| value.trim().parse::<i64>().ok())
        .unwrap_or(0);
    u64::try_from(max_age.saturating_sub(age)).unwrap_or(0)
}

/// Parses one `Cache-Control` directive as `max-age=<seconds>`.
fn parse_max_age(entry: &str) -> Option<i64> {
    let rest = entry.trim().strip_prefix("max-age")?;
    let value = rest.trim_start().strip_prefix('=')?;
    value.trim().parse::<i64>().ok()
}

// ============================================================================
// SECTION: Retrieval
// ============================================================================

/// Returns the certificate set for `cert_uri`, from cache when present,
/// fetching and re-caching on miss. `None` means the certificates are
/// unavailable and verification must fail.
pub fn get_cached_certs(
    cert_uri: &str,
    cache: &dyn KeyValueCache,
    fetcher: &dyn HttpFetcher,
    events: &dyn AuthEventSink,
) -> Option<Value> {
    if let Some(certs) = cache.get(cert_uri, CERT_NAMESPACE) {
        return Some(certs);
    }

    let response = match fetcher.fetch(cert_uri) {
        Ok(response) => response,
        Err(err) => {
            events.rejected(&AuthEvent::with_detail(
                RejectionStage::Upstream,
                TokenRejection::CertsUnavailable,
                &err.to_string(),
            ));
            return None;
        }
    };
    if response.status_code != 200 {
        events.rejected(&AuthEvent::with_detail(
            RejectionStage::Upstream,
            TokenRejection::CertsUnavailable,
            &format!("certs endpoint returned {}", response.status_code),
        ));
        return None;
    }
    let certs: Value = match serde_json::from_slice(&response.body) {
        Ok(certs) => certs,
        Err(_) => {
            events.rejected(&AuthEvent::new(
                RejectionStage::Upstream,
                TokenRejection::CertsUnavailable,
            ));
            return None;
        }
    };
    let ttl = cert_expiration_seconds(&response);
    if ttl > 0 {
        cache.set(cert_uri, certs.clone(), CERT_NAMESPACE, ttl);
    }
    Some(certs)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

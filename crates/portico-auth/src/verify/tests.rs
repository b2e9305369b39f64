// crates/portico-auth/src/verify/tests.rs
// ============================================================================
// Module: Verification Unit Tests
// Description: Unit tests for acquisition, temporal, and claim policies.
// Purpose: Pin the scan order, exact time boundaries, and claim rules.
// Dependencies: portico-auth, serde_json
// ============================================================================

//! ## Overview
//! Validates token acquisition scan order, the exact issued-at/lifetime
//! boundaries, and the identity-token claim policy including the refused
//! skip sentinel; cryptographic behavior is covered by integration tests.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use proptest::prelude::*;
use serde_json::Value;
use serde_json::json;

use super::CLOCK_SKEW_SECS;
use super::MAX_TOKEN_LIFETIME_SECS;
use super::TokenRequest;
use super::check_token_times;
use super::extract_token;
use super::is_skip_sentinel;
use super::verify_parsed_claims;
use super::verify_signed_jwt;
use crate::cache::KeyValueCache;
use crate::events::NoopEventSink;
use crate::fetch::FetchError;
use crate::fetch::FetchResponse;
use crate::fetch::HttpFetcher;

/// Issued-at instant shared by the temporal tests.
const ISSUED_AT: i64 = 1_360_964_700;

/// Claim body of the reference identity-token sample.
fn sample_claims() -> Value {
    json!({
        "iss": "accounts.google.com",
        "email": "kevind@gmail.com",
        "email_verified": "true",
        "aud": "919214422084-c0jrodnkm7ntttjhhttilqjq5d7l7mu5.apps.googleusercontent.com",
        "sub": "104564329451840817415",
        "azp": "919214422084-c0jrodnkm7ntttjhhttilqjq5d7l7mu5.apps.googleusercontent.com",
        "iat": ISSUED_AT,
        "exp": ISSUED_AT + 3900,
    })
}

/// Allowed audiences matching the sample claims.
fn sample_audiences() -> Vec<String> {
    vec!["919214422084-c0jrodnkm7ntttjhhttilqjq5d7l7mu5.apps.googleusercontent.com".to_string()]
}

/// Allowed client IDs matching the sample claims.
fn sample_client_ids() -> Vec<String> {
    vec![
        "919214422084-c0jrodnkm7ntttjhhttilqjq5d7l7mu5.apps.googleusercontent.com".to_string(),
        "12345.apps.googleusercontent.com".to_string(),
    ]
}

/// Allowed issuers matching the sample claims.
fn sample_issuers() -> Vec<String> {
    vec!["accounts.google.com".to_string(), "https://accounts.google.com".to_string()]
}

// ============================================================================
// SECTION: Token Acquisition Tests
// ============================================================================

#[test]
fn authorization_header_schemes_are_exact_match() {
    let bearer = TokenRequest::new().with_authorization("Bearer token-a");
    assert_eq!(extract_token(&bearer), Some("token-a".to_string()));

    let oauth = TokenRequest::new().with_authorization("OAuth token-b");
    assert_eq!(extract_token(&oauth), Some("token-b".to_string()));

    // Any other casing is treated as absent, not as a malformed token.
    let lowered = TokenRequest::new().with_authorization("bearer token-c");
    assert_eq!(extract_token(&lowered), None);
}

#[test]
fn unknown_scheme_falls_through_to_request_fields() {
    let request = TokenRequest::new()
        .with_authorization("Basic dXNlcjpwYXNz")
        .with_field("access_token", "token-d");
    assert_eq!(extract_token(&request), Some("token-d".to_string()));
}

#[test]
fn bearer_token_field_wins_over_access_token_field() {
    let request = TokenRequest::new()
        .with_field("access_token", "token-access")
        .with_field("bearer_token", "token-bearer");
    assert_eq!(extract_token(&request), Some("token-bearer".to_string()));
}

#[test]
fn empty_values_mean_no_token() {
    let request = TokenRequest::new()
        .with_authorization("Bearer ")
        .with_field("access_token", "");
    assert_eq!(extract_token(&request), None);
    assert_eq!(extract_token(&TokenRequest::new()), None);
}

// ============================================================================
// SECTION: Temporal Tests
// ============================================================================

/// Claims with a far-out expiry so lifetime boundaries are observable.
fn long_lived_claims() -> Value {
    json!({ "iat": ISSUED_AT, "exp": ISSUED_AT + MAX_TOKEN_LIFETIME_SECS + 3600 })
}

#[test]
fn lifetime_boundary_is_inclusive() {
    let claims = long_lived_claims();
    let at_boundary = ISSUED_AT + MAX_TOKEN_LIFETIME_SECS;
    assert!(check_token_times(&claims, at_boundary, &NoopEventSink).is_some());
    assert!(check_token_times(&claims, at_boundary + 1, &NoopEventSink).is_none());
}

#[test]
fn early_use_is_bounded_by_clock_skew() {
    let claims = long_lived_claims();
    assert!(check_token_times(&claims, ISSUED_AT - CLOCK_SKEW_SECS, &NoopEventSink).is_some());
    assert!(check_token_times(&claims, ISSUED_AT - CLOCK_SKEW_SECS - 1, &NoopEventSink).is_none());
}

#[test]
fn expiry_is_a_hard_stop() {
    let claims = json!({ "iat": ISSUED_AT, "exp": ISSUED_AT + 600 });
    assert!(check_token_times(&claims, ISSUED_AT + 600, &NoopEventSink).is_some());
    assert!(check_token_times(&claims, ISSUED_AT + 601, &NoopEventSink).is_none());
}

#[test]
fn missing_timestamps_reject() {
    assert!(check_token_times(&json!({ "exp": ISSUED_AT }), ISSUED_AT, &NoopEventSink).is_none());
    assert!(check_token_times(&json!({ "iat": ISSUED_AT }), ISSUED_AT, &NoopEventSink).is_none());
}

// ============================================================================
// SECTION: Claim Policy Tests
// ============================================================================

#[test]
fn sample_claims_pass_the_identity_policy() {
    assert!(verify_parsed_claims(
        &sample_claims(),
        &sample_issuers(),
        &sample_audiences(),
        &sample_client_ids(),
        &NoopEventSink,
    ));
}

#[test]
fn invalid_issuer_audience_or_client_rejects() {
    let mut claims = sample_claims();
    claims["iss"] = json!("invalid.issuer");
    assert!(!verify_parsed_claims(
        &claims,
        &sample_issuers(),
        &sample_audiences(),
        &sample_client_ids(),
        &NoopEventSink,
    ));

    let mut claims = sample_claims();
    claims["aud"] = json!("invalid.audience");
    assert!(!verify_parsed_claims(
        &claims,
        &sample_issuers(),
        &sample_audiences(),
        &sample_client_ids(),
        &NoopEventSink,
    ));

    let mut claims = sample_claims();
    claims["azp"] = json!("invalid.client.id");
    assert!(!verify_parsed_claims(
        &claims,
        &sample_issuers(),
        &sample_audiences(),
        &sample_client_ids(),
        &NoopEventSink,
    ));
}

#[test]
fn audience_equal_to_authorized_party_is_accepted() {
    // Installed clients present the client ID as the audience; that is
    // accepted as long as the party itself is allowed.
    let mut claims = sample_claims();
    claims["aud"] = claims["azp"].clone();
    assert!(verify_parsed_claims(
        &claims,
        &sample_issuers(),
        &[],
        &sample_client_ids(),
        &NoopEventSink,
    ));
}

#[test]
fn empty_allowed_sets_reject() {
    assert!(!verify_parsed_claims(
        &sample_claims(),
        &[],
        &sample_audiences(),
        &sample_client_ids(),
        &NoopEventSink,
    ));

    let mut claims = sample_claims();
    claims["azp"] = json!("some.other.client");
    assert!(!verify_parsed_claims(
        &claims,
        &sample_issuers(),
        &[],
        &sample_client_ids(),
        &NoopEventSink,
    ));
}

#[test]
fn skip_sentinel_is_never_honored_for_identity_tokens() {
    let skip = vec!["*".to_string()];
    assert!(is_skip_sentinel(&skip));
    assert!(!verify_parsed_claims(
        &sample_claims(),
        &sample_issuers(),
        &sample_audiences(),
        &skip,
        &NoopEventSink,
    ));
}

#[test]
fn missing_email_rejects() {
    let mut claims = sample_claims();
    claims.as_object_mut().expect("object").remove("email");
    assert!(!verify_parsed_claims(
        &claims,
        &sample_issuers(),
        &sample_audiences(),
        &sample_client_ids(),
        &NoopEventSink,
    ));
}

// ============================================================================
// SECTION: Hostile Input Tests
// ============================================================================

/// Cache stub that never holds a value.
struct EmptyCache;

impl KeyValueCache for EmptyCache {
    fn get(&self, _key: &str, _namespace: &str) -> Option<Value> {
        None
    }

    fn set(&self, _key: &str, _value: Value, _namespace: &str, _ttl_seconds: u64) {}
}

/// Fetcher stub that always fails.
struct DeadFetcher;

impl HttpFetcher for DeadFetcher {
    fn fetch(&self, _uri: &str) -> Result<FetchResponse, FetchError> {
        Err(FetchError::Request("unreachable".to_string()))
    }
}

proptest! {
    #[test]
    fn hostile_tokens_never_panic_and_never_verify(token in ".{0,120}") {
        let result = verify_signed_jwt(
            &token,
            1_500_000_000,
            &EmptyCache,
            &DeadFetcher,
            "https://certs.invalid/keys",
            &NoopEventSink,
        );
        prop_assert!(result.is_none());
    }
}

#[test]
fn unknown_extra_claims_are_ignored() {
    let mut claims = sample_claims();
    claims["cid"] = json!("Extra ignored field.");
    assert!(verify_parsed_claims(
        &claims,
        &sample_issuers(),
        &sample_audiences(),
        &sample_client_ids(),
        &NoopEventSink,
    ));
}

// crates/portico-auth/src/introspect/tests.rs
// ============================================================================
// Module: Introspection Unit Tests
// Description: Unit tests for scope policy and access-token introspection.
// Purpose: Pin scope-set sufficiency and the honored skip sentinel.
// Dependencies: portico-auth, serde_json
// ============================================================================

//! ## Overview
//! Validates the scope AND-set/OR-family policy and the introspection
//! flow against a stubbed endpoint, including the client-ID skip sentinel
//! that this path — unlike identity tokens — honors.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde_json::Value;
use serde_json::json;

use super::are_scopes_sufficient;
use super::introspect_access_token;
use super::process_scopes;
use crate::events::NoopEventSink;
use crate::fetch::FetchError;
use crate::fetch::FetchResponse;
use crate::fetch::HttpFetcher;

/// Email scope URL used across the samples.
const EMAIL_SCOPE: &str = "https://www.googleapis.com/auth/userinfo.email";

/// Fetcher stub serving one canned JSON body.
struct StubFetcher {
    /// Status code of the canned response.
    status_code: u16,
    /// Body of the canned response.
    body: Value,
}

impl HttpFetcher for StubFetcher {
    fn fetch(&self, _uri: &str) -> Result<FetchResponse, FetchError> {
        Ok(FetchResponse {
            status_code: self.status_code,
            headers: BTreeMap::new(),
            body: serde_json::to_vec(&self.body).expect("serialize stub body"),
        })
    }
}

/// Token info accepted by the happy-path tests.
fn sample_token_info() -> Value {
    json!({
        "issued_to": "919214422084-c0jrodnkm7ntttjhhttilqjq5d7l7mu5.apps.googleusercontent.com",
        "azp": "919214422084-c0jrodnkm7ntttjhhttilqjq5d7l7mu5.apps.googleusercontent.com",
        "email": "kevind@gmail.com",
        "verified_email": true,
        "scope": format!("https://www.googleapis.com/auth/userinfo.profile {EMAIL_SCOPE}"),
    })
}

/// Allowed client IDs matching the sample token info.
fn sample_client_ids() -> Vec<String> {
    vec!["919214422084-c0jrodnkm7ntttjhhttilqjq5d7l7mu5.apps.googleusercontent.com".to_string()]
}

// ============================================================================
// SECTION: Scope Policy Tests
// ============================================================================

#[test]
fn scope_entries_split_into_and_sets() {
    let scopes = vec!["scope1".to_string(), "scope2 scope3".to_string()];
    let (all_scopes, sufficient) = process_scopes(&scopes);
    assert_eq!(all_scopes.len(), 3);
    assert_eq!(sufficient.len(), 2);

    let authorized: BTreeSet<String> = ["scope2", "scope3"].iter().map(|s| (*s).to_string()).collect();
    assert!(are_scopes_sufficient(&authorized, &sufficient));

    let partial: BTreeSet<String> = ["scope2"].iter().map(|s| (*s).to_string()).collect();
    assert!(!are_scopes_sufficient(&partial, &sufficient));
}

// ============================================================================
// SECTION: Introspection Tests
// ============================================================================

#[test]
fn valid_token_materializes_the_request_identity() {
    let fetcher = StubFetcher {
        status_code: 200,
        body: sample_token_info(),
    };
    let context = introspect_access_token(
        "opaque-token",
        &sample_client_ids(),
        &[EMAIL_SCOPE.to_string()],
        &fetcher,
        "https://tokeninfo.example/introspect",
        &NoopEventSink,
    )
    .expect("verified context");
    assert!(context.is_authenticated());
    assert_eq!(context.user.expect("user").email, "kevind@gmail.com");
    assert!(context.authorized_scopes.iter().any(|scope| scope == EMAIL_SCOPE));
}

#[test]
fn skip_sentinel_is_honored_for_access_tokens() {
    let mut body = sample_token_info();
    body["azp"] = json!("unknown-client.apps.googleusercontent.com");
    body["issued_to"] = body["azp"].clone();
    let fetcher = StubFetcher {
        status_code: 200,
        body,
    };
    // The same unknown client fails a real allowlist...
    assert!(
        introspect_access_token(
            "opaque-token",
            &sample_client_ids(),
            &[EMAIL_SCOPE.to_string()],
            &fetcher,
            "https://tokeninfo.example/introspect",
            &NoopEventSink,
        )
        .is_none()
    );
    // ...but passes under the sentinel.
    assert!(
        introspect_access_token(
            "opaque-token",
            &["*".to_string()],
            &[EMAIL_SCOPE.to_string()],
            &fetcher,
            "https://tokeninfo.example/introspect",
            &NoopEventSink,
        )
        .is_some()
    );
}

#[test]
fn unverified_email_rejects() {
    let mut body = sample_token_info();
    body["verified_email"] = json!(false);
    let fetcher = StubFetcher {
        status_code: 200,
        body,
    };
    assert!(
        introspect_access_token(
            "opaque-token",
            &sample_client_ids(),
            &[EMAIL_SCOPE.to_string()],
            &fetcher,
            "https://tokeninfo.example/introspect",
            &NoopEventSink,
        )
        .is_none()
    );
}

#[test]
fn string_form_verification_marker_is_accepted() {
    let mut body = sample_token_info();
    body.as_object_mut().expect("object").remove("verified_email");
    body["email_verified"] = json!("true");
    let fetcher = StubFetcher {
        status_code: 200,
        body,
    };
    assert!(
        introspect_access_token(
            "opaque-token",
            &sample_client_ids(),
            &[EMAIL_SCOPE.to_string()],
            &fetcher,
            "https://tokeninfo.example/introspect",
            &NoopEventSink,
        )
        .is_some()
    );
}

#[test]
fn insufficient_scopes_reject() {
    let fetcher = StubFetcher {
        status_code: 200,
        body: sample_token_info(),
    };
    assert!(
        introspect_access_token(
            "opaque-token",
            &sample_client_ids(),
            &["https://www.googleapis.com/auth/drive".to_string()],
            &fetcher,
            "https://tokeninfo.example/introspect",
            &NoopEventSink,
        )
        .is_none()
    );
}

#[test]
fn upstream_error_status_rejects() {
    let fetcher = StubFetcher {
        status_code: 400,
        body: json!({ "error_description": "Invalid Value" }),
    };
    assert!(
        introspect_access_token(
            "opaque-token",
            &sample_client_ids(),
            &[EMAIL_SCOPE.to_string()],
            &fetcher,
            "https://tokeninfo.example/introspect",
            &NoopEventSink,
        )
        .is_none()
    );
}

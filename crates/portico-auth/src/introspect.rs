// crates/portico-auth/src/introspect.rs
// ============================================================================
// Module: OAuth2 Access Token Introspection
// Description: Opaque access-token validation via a tokeninfo endpoint.
// Purpose: Materialize a per-request identity from an introspected token.
// Dependencies: crate::{events, fetch, verify}, serde_json, url
// ============================================================================

//! ## Overview
//! Opaque access tokens cannot be verified locally; they are validated
//! against an authorization-introspection endpoint. The introspected
//! response must carry a verified email, an allowed client ID (the skip
//! sentinel *is* honored here, unlike identity tokens), and a sufficient
//! scope set. Success materializes an explicit per-request
//! [`RequestAuthContext`] for the dispatch layer rather than process-wide
//! state.
//!
//! ## Invariants
//! - Scope entries are space-separated AND-sets; any one set being a
//!   subset of the authorized scopes is sufficient.
//! - Upstream failures resolve to `None`, never a distinct error class.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde_json::Value;
use url::Url;

use crate::events::AuthEvent;
use crate::events::AuthEventSink;
use crate::events::RejectionStage;
use crate::events::TokenRejection;
use crate::fetch::HttpFetcher;
use crate::verify::is_skip_sentinel;

// ============================================================================
// CONSTANTS: Introspection endpoint
// ============================================================================

/// Default token-introspection endpoint.
pub const DEFAULT_TOKENINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/tokeninfo";

// ============================================================================
// SECTION: Request Identity
// ============================================================================

/// One authenticated end user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Verified email address. Only the email is guaranteed; other
    /// identity attributes may be absent.
    pub email: String,
    /// Authentication domain, when known.
    pub auth_domain: Option<String>,
}

/// Per-request authentication context threaded through the dispatch
/// layer, populated by token verification.
///
/// # Invariants
/// - `authorized_scopes` is non-empty only for authenticated contexts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestAuthContext {
    /// Authenticated user, when any.
    pub user: Option<AuthenticatedUser>,
    /// Scopes the presented token was authorized for.
    pub authorized_scopes: Vec<String>,
}

impl RequestAuthContext {
    /// Creates an unauthenticated context.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// True when a user identity was materialized.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

// ============================================================================
// SECTION: Scope Policy
// ============================================================================

/// Splits declared scope entries into the set of all scopes and the
/// family of sufficient scope sets (each entry is a space-separated
/// AND-set).
#[must_use]
pub fn process_scopes(scopes: &[String]) -> (BTreeSet<String>, BTreeSet<BTreeSet<String>>) {
    let mut all_scopes = BTreeSet::new();
    let mut sufficient_scopes = BTreeSet::new();
    for entry in scopes {
        let set: BTreeSet<String> =
            entry.split_whitespace().map(str::to_string).collect();
        all_scopes.extend(set.iter().cloned());
        sufficient_scopes.insert(set);
    }
    (all_scopes, sufficient_scopes)
}

/// True when any sufficient scope set is fully contained in the
/// authorized scopes.
#[must_use]
pub fn are_scopes_sufficient(
    authorized: &BTreeSet<String>,
    sufficient: &BTreeSet<BTreeSet<String>>,
) -> bool {
    sufficient.iter().any(|set| set.is_subset(authorized))
}

// ============================================================================
// SECTION: Introspection
// ============================================================================

/// Validates an opaque access token against the introspection endpoint
/// and materializes the request identity on success.
pub fn introspect_access_token(
    token: &str,
    allowed_client_ids: &[String],
    scopes: &[String],
    fetcher: &dyn HttpFetcher,
    tokeninfo_url: &str,
    events: &dyn AuthEventSink,
) -> Option<RequestAuthContext> {
    let mut url = match Url::parse(tokeninfo_url) {
        Ok(url) => url,
        Err(_) => {
            events.rejected(&AuthEvent::new(
                RejectionStage::Upstream,
                TokenRejection::IntrospectionRejected,
            ));
            return None;
        }
    };
    url.query_pairs_mut().append_pair("access_token", token);

    let response = match fetcher.fetch(url.as_str()) {
        Ok(response) => response,
        Err(err) => {
            events.rejected(&AuthEvent::with_detail(
                RejectionStage::Upstream,
                TokenRejection::IntrospectionRejected,
                &err.to_string(),
            ));
            return None;
        }
    };
    if response.status_code != 200 {
        let description = serde_json::from_slice::<Value>(&response.body)
            .ok()
            .and_then(|body| {
                body.get("error_description").and_then(Value::as_str).map(str::to_string)
            })
            .unwrap_or_default();
        events.rejected(&AuthEvent::with_detail(
            RejectionStage::Upstream,
            TokenRejection::IntrospectionRejected,
            &format!("tokeninfo returned {}: {description}", response.status_code),
        ));
        return None;
    }
    let token_info: Value = match serde_json::from_slice(&response.body) {
        Ok(token_info) => token_info,
        Err(_) => {
            events.rejected(&AuthEvent::new(
                RejectionStage::Upstream,
                TokenRejection::IntrospectionRejected,
            ));
            return None;
        }
    };

    let Some(email) =
        token_info.get("email").and_then(Value::as_str).filter(|email| !email.is_empty())
    else {
        events.rejected(&AuthEvent::new(RejectionStage::Claims, TokenRejection::MissingEmail));
        return None;
    };
    if !email_is_verified(&token_info) {
        events.rejected(&AuthEvent::new(
            RejectionStage::Claims,
            TokenRejection::IntrospectionRejected,
        ));
        return None;
    }

    // The skip sentinel is honored here, unlike identity-token claims:
    // opaque tokens carry no verifiable authorized-party claim.
    if !is_skip_sentinel(allowed_client_ids) {
        let client_id = token_info
            .get("azp")
            .and_then(Value::as_str)
            .or_else(|| token_info.get("issued_to").and_then(Value::as_str));
        match client_id {
            Some(client_id) if allowed_client_ids.iter().any(|allowed| allowed == client_id) => {}
            Some(client_id) => {
                events.rejected(&AuthEvent::with_detail(
                    RejectionStage::Claims,
                    TokenRejection::InvalidClientId,
                    client_id,
                ));
                return None;
            }
            None => {
                events.rejected(&AuthEvent::new(
                    RejectionStage::Claims,
                    TokenRejection::InvalidClientId,
                ));
                return None;
            }
        }
    }

    let authorized: BTreeSet<String> = token_info
        .get("scope")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let (_, sufficient) = process_scopes(scopes);
    if !are_scopes_sufficient(&authorized, &sufficient) {
        events.rejected(&AuthEvent::new(
            RejectionStage::Claims,
            TokenRejection::IntrospectionRejected,
        ));
        return None;
    }

    Some(RequestAuthContext {
        user: Some(AuthenticatedUser {
            email: email.to_string(),
            auth_domain: None,
        }),
        authorized_scopes: authorized.into_iter().collect(),
    })
}

/// True when the introspection response marks the email verified, under
/// either response dialect (`email_verified`/`verified_email`, boolean or
/// string form).
fn email_is_verified(token_info: &Value) -> bool {
    ["email_verified", "verified_email"].iter().any(|key| {
        match token_info.get(*key) {
            Some(Value::Bool(verified)) => *verified,
            Some(Value::String(verified)) => verified == "true",
            _ => false,
        }
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;

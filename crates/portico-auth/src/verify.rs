// crates/portico-auth/src/verify.rs
// ============================================================================
// Module: Identity Token Verification
// Description: Structural decode, signature, temporal, and claim checks.
// Purpose: Turn a bearer token into a verified identity or nothing.
// Dependencies: crate::{cache, certs, events, fetch}, base64, jsonwebtoken
// ============================================================================

//! ## Overview
//! A verification attempt moves through acquisition, structural decode,
//! certificate resolution, signature check, temporal checks, and claim
//! checks; rejection at any stage resolves to `None`. Candidate
//! certificates are tried in order and per-candidate failures fall through
//! to the next candidate, so a wrong key first in the set never aborts the
//! attempt. Time is supplied by the caller; the engine never reads the
//! wall clock.
//!
//! ## Invariants
//! - A token must have exactly three segments to be treated as signed;
//!   anything else is rejected before any cryptography runs.
//! - The skip-client-id sentinel is never honored for identity tokens.
//! - No decode or crypto error escapes to the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::HashSet;

use base64::Engine;
use base64::alphabet;
use base64::engine::DecodePaddingMode;
use base64::engine::GeneralPurpose;
use base64::engine::GeneralPurposeConfig;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::Validation;
use jsonwebtoken::decode;
use jsonwebtoken::errors::ErrorKind;
use serde_json::Value;

use crate::cache::KeyValueCache;
use crate::certs::get_cached_certs;
use crate::events::AuthEvent;
use crate::events::AuthEventSink;
use crate::events::RejectionStage;
use crate::events::TokenRejection;
use crate::fetch::HttpFetcher;

// ============================================================================
// CONSTANTS: Verification policy
// ============================================================================

/// Allowed clock skew when checking the issued-at window.
pub const CLOCK_SKEW_SECS: i64 = 300;

/// Maximum accepted token lifetime after issuance.
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 86_400;

/// Default certificate endpoint for platform-issued identity tokens.
pub const DEFAULT_CERT_URI: &str = "https://www.googleapis.com/service_accounts/v1/metadata/raw/federated-signon@system.gserviceaccount.com";

/// Authorization header schemes accepted for bearer tokens, in scan order.
const ALLOWED_AUTH_SCHEMES: [&str; 2] = ["Bearer", "OAuth"];

/// Request fields scanned for a token, in scan order.
const ALLOWED_TOKEN_FIELDS: [&str; 2] = ["bearer_token", "access_token"];

/// URL-safe Base64 with permissive padding for JWT segments.
const URL_SAFE_PERMISSIVE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Standard Base64 with permissive padding for certificate key material.
const STANDARD_PERMISSIVE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// ============================================================================
// SECTION: Sentinels
// ============================================================================

/// True when an allowed-client-ID list is the "skip this check" sentinel
/// (the literal one-element list `["*"]`, compared by value).
#[must_use]
pub fn is_skip_sentinel(allowed_client_ids: &[String]) -> bool {
    allowed_client_ids.len() == 1 && allowed_client_ids[0] == "*"
}

// ============================================================================
// SECTION: Token Acquisition
// ============================================================================

/// Request surface scanned for a bearer token.
///
/// # Invariants
/// - `fields` holds decoded request message fields by name; only
///   `bearer_token` and `access_token` are consulted.
#[derive(Debug, Clone, Default)]
pub struct TokenRequest {
    /// Raw `Authorization` header value, when present.
    pub authorization: Option<String>,
    /// Decoded request message fields.
    pub fields: BTreeMap<String, String>,
}

impl TokenRequest {
    /// Creates an empty request surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `Authorization` header value.
    #[must_use]
    pub fn with_authorization(mut self, value: &str) -> Self {
        self.authorization = Some(value.to_string());
        self
    }

    /// Adds one decoded request field.
    #[must_use]
    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }
}

/// Scans the request surface for a bearer token: the `Authorization`
/// header first (schemes matched case-sensitively; an unknown scheme is
/// treated as absent), then the `bearer_token` and `access_token` fields.
/// First non-empty match wins; no token at all is not an error.
#[must_use]
pub fn extract_token(request: &TokenRequest) -> Option<String> {
    if let Some(header) = &request.authorization {
        for scheme in ALLOWED_AUTH_SCHEMES {
            if let Some(rest) = header.strip_prefix(scheme)
                && let Some(token) = rest.strip_prefix(' ')
                && !token.is_empty()
            {
                return Some(token.to_string());
            }
        }
    }
    for field in ALLOWED_TOKEN_FIELDS {
        if let Some(token) = request.fields.get(field)
            && !token.is_empty()
        {
            return Some(token.clone());
        }
    }
    None
}

// ============================================================================
// SECTION: Verified Tokens
// ============================================================================

/// Outcome of a successful verification. Ephemeral: constructed per call,
/// never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    /// Issuer claim.
    pub issuer: String,
    /// Audience claim.
    pub audience: String,
    /// Subject claim, when present.
    pub subject: Option<String>,
    /// Email claim, when present.
    pub email: Option<String>,
    /// Authorized-party claim, when present.
    pub authorized_party: Option<String>,
    /// Issued-at timestamp, unix seconds.
    pub issued_at: i64,
    /// Expiry timestamp, unix seconds.
    pub expires_at: i64,
    /// Full claim set for callers needing additional claims.
    pub claims: Value,
}

impl VerifiedToken {
    /// Builds a verified token from a checked claim set.
    fn from_claims(claims: Value) -> Option<Self> {
        let issuer = claims.get("iss")?.as_str()?.to_string();
        let audience = claims.get("aud")?.as_str()?.to_string();
        let issued_at = claims.get("iat")?.as_i64()?;
        let expires_at = claims.get("exp")?.as_i64()?;
        let subject = claims.get("sub").and_then(Value::as_str).map(str::to_string);
        let email = claims.get("email").and_then(Value::as_str).map(str::to_string);
        let authorized_party = claims.get("azp").and_then(Value::as_str).map(str::to_string);
        Some(Self {
            issuer,
            audience,
            subject,
            email,
            authorized_party,
            issued_at,
            expires_at,
            claims,
        })
    }
}

// ============================================================================
// SECTION: Signed JWT Verification
// ============================================================================

/// Verifies a signed JWT against the issuer's published certificates and
/// the temporal policy, returning the claim set on success.
fn verify_signed_jwt(
    token: &str,
    time_now: i64,
    cache: &dyn KeyValueCache,
    fetcher: &dyn HttpFetcher,
    cert_uri: &str,
    events: &dyn AuthEventSink,
) -> Option<Value> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        events.rejected(&AuthEvent::new(
            RejectionStage::Structural,
            TokenRejection::WrongSegmentCount,
        ));
        return None;
    }

    let header_bytes = match URL_SAFE_PERMISSIVE.decode(segments[0]) {
        Ok(bytes) => bytes,
        Err(_) => {
            events.rejected(&AuthEvent::new(
                RejectionStage::Structural,
                TokenRejection::MalformedBase64,
            ));
            return None;
        }
    };
    let header: Value = match serde_json::from_slice(&header_bytes) {
        Ok(header) => header,
        Err(_) => {
            events.rejected(&AuthEvent::new(
                RejectionStage::Structural,
                TokenRejection::MalformedJson,
            ));
            return None;
        }
    };
    let algorithm = header.get("alg").and_then(Value::as_str).unwrap_or_default();
    if algorithm != "RS256" {
        events.rejected(&AuthEvent::with_detail(
            RejectionStage::Structural,
            TokenRejection::UnexpectedAlgorithm,
            algorithm,
        ));
        return None;
    }

    let certs = get_cached_certs(cert_uri, cache, fetcher, events)?;
    let claims = check_signature(token, &certs, events)?;
    check_token_times(&claims, time_now, events)?;
    Some(claims)
}

/// Tries every candidate certificate until one validates the signature.
/// Structural payload failures reject immediately; candidate failures fall
/// through to the next key.
fn check_signature(
    token: &str,
    certs: &Value,
    events: &dyn AuthEventSink,
) -> Option<Value> {
    let Some(keyvalues) = certs.get("keyvalues").and_then(Value::as_array) else {
        events.rejected(&AuthEvent::new(
            RejectionStage::Upstream,
            TokenRejection::CertsUnavailable,
        ));
        return None;
    };

    let mut validation = Validation::new(Algorithm::RS256);
    validation.required_spec_claims = HashSet::new();
    validation.validate_exp = false;
    validation.validate_aud = false;

    for keyvalue in keyvalues {
        let Some(modulus) = keyvalue.get("modulus").and_then(Value::as_str) else {
            continue;
        };
        let Some(exponent) = keyvalue.get("exponent").and_then(Value::as_str) else {
            continue;
        };
        let Ok(modulus) = STANDARD_PERMISSIVE.decode(modulus) else {
            continue;
        };
        let Ok(exponent) = STANDARD_PERMISSIVE.decode(exponent) else {
            continue;
        };
        let key = DecodingKey::from_rsa_raw_components(&modulus, &exponent);
        match decode::<Value>(token, &key, &validation) {
            Ok(data) => return Some(data.claims),
            Err(err) => match err.kind() {
                ErrorKind::Base64(_) | ErrorKind::Utf8(_) => {
                    events.rejected(&AuthEvent::new(
                        RejectionStage::Structural,
                        TokenRejection::MalformedBase64,
                    ));
                    return None;
                }
                ErrorKind::Json(_) => {
                    events.rejected(&AuthEvent::new(
                        RejectionStage::Structural,
                        TokenRejection::MalformedJson,
                    ));
                    return None;
                }
                _ => {}
            },
        }
    }
    events.rejected(&AuthEvent::new(RejectionStage::Signature, TokenRejection::InvalidSignature));
    None
}

/// Applies the temporal policy to a checked claim set.
fn check_token_times(claims: &Value, time_now: i64, events: &dyn AuthEventSink) -> Option<()> {
    let Some(issued_at) = claims.get("iat").and_then(Value::as_i64) else {
        events.rejected(&AuthEvent::new(
            RejectionStage::Temporal,
            TokenRejection::MissingIssuedAt,
        ));
        return None;
    };
    let Some(expires_at) = claims.get("exp").and_then(Value::as_i64) else {
        events.rejected(&AuthEvent::new(RejectionStage::Temporal, TokenRejection::MissingExpiry));
        return None;
    };
    if time_now < issued_at - CLOCK_SKEW_SECS {
        events.rejected(&AuthEvent::new(RejectionStage::Temporal, TokenRejection::UsedTooEarly));
        return None;
    }
    if time_now > issued_at + MAX_TOKEN_LIFETIME_SECS {
        events.rejected(&AuthEvent::new(
            RejectionStage::Temporal,
            TokenRejection::LifetimeExceeded,
        ));
        return None;
    }
    if time_now > expires_at {
        events.rejected(&AuthEvent::new(RejectionStage::Temporal, TokenRejection::Expired));
        return None;
    }
    Some(())
}

// ============================================================================
// SECTION: Identity Token Claims
// ============================================================================

/// Applies the identity-token claim policy: issuer membership, audience
/// membership (with the audience-equals-authorized-party allowance),
/// client-ID membership with the skip sentinel refused, and a required
/// email claim.
fn verify_parsed_claims(
    claims: &Value,
    issuers: &[String],
    audiences: &[String],
    allowed_client_ids: &[String],
    events: &dyn AuthEventSink,
) -> bool {
    let issuer = claims.get("iss").and_then(Value::as_str).unwrap_or_default();
    if !issuers.iter().any(|allowed| allowed == issuer) {
        events.rejected(&AuthEvent::with_detail(
            RejectionStage::Claims,
            TokenRejection::InvalidIssuer,
            issuer,
        ));
        return false;
    }

    let Some(audience) = claims.get("aud").and_then(Value::as_str).filter(|aud| !aud.is_empty())
    else {
        events.rejected(&AuthEvent::new(RejectionStage::Claims, TokenRejection::MissingAudience));
        return false;
    };
    let authorized_party = claims.get("azp").and_then(Value::as_str);
    // An audience equal to the authorized party is accepted for installed
    // clients as long as the party itself is allowed below.
    if authorized_party != Some(audience) && !audiences.iter().any(|allowed| allowed == audience) {
        events.rejected(&AuthEvent::with_detail(
            RejectionStage::Claims,
            TokenRejection::InvalidAudience,
            audience,
        ));
        return false;
    }

    if is_skip_sentinel(allowed_client_ids) {
        events.rejected(&AuthEvent::new(
            RejectionStage::Claims,
            TokenRejection::ClientIdSkipNotAllowed,
        ));
        return false;
    }
    match authorized_party {
        Some(party) if allowed_client_ids.iter().any(|allowed| allowed == party) => {}
        Some(party) => {
            events.rejected(&AuthEvent::with_detail(
                RejectionStage::Claims,
                TokenRejection::InvalidClientId,
                party,
            ));
            return false;
        }
        None => {
            events.rejected(&AuthEvent::new(
                RejectionStage::Claims,
                TokenRejection::InvalidClientId,
            ));
            return false;
        }
    }

    if claims.get("email").and_then(Value::as_str).is_none() {
        events.rejected(&AuthEvent::new(RejectionStage::Claims, TokenRejection::MissingEmail));
        return false;
    }
    true
}

// ============================================================================
// SECTION: Entry Points
// ============================================================================

/// Verifies a platform identity token end to end. Every failure resolves
/// to `None`; callers decide whether authentication was required.
#[allow(clippy::too_many_arguments, reason = "Entry point mirrors the verification contract.")]
pub fn verify_identity_token(
    token: &str,
    issuers: &[String],
    audiences: &[String],
    allowed_client_ids: &[String],
    time_now: i64,
    cache: &dyn KeyValueCache,
    fetcher: &dyn HttpFetcher,
    cert_uri: &str,
    events: &dyn AuthEventSink,
) -> Option<VerifiedToken> {
    let claims = verify_signed_jwt(token, time_now, cache, fetcher, cert_uri, events)?;
    if !verify_parsed_claims(&claims, issuers, audiences, allowed_client_ids, events) {
        return None;
    }
    VerifiedToken::from_claims(claims)
}

/// One trusted (issuer, certificate endpoint) pair for multi-provider
/// resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtProvider {
    /// Expected issuer claim.
    pub issuer: String,
    /// Certificate endpoint serving the issuer's signing keys.
    pub cert_uri: String,
}

impl JwtProvider {
    /// Creates a provider entry.
    #[must_use]
    pub fn new(issuer: &str, cert_uri: &str) -> Self {
        Self {
            issuer: issuer.to_string(),
            cert_uri: cert_uri.to_string(),
        }
    }
}

/// Extracts a bearer token from the request surface and tries each
/// provider in order; the first provider whose verification succeeds wins.
/// Provider claims are issuer and audience only — these tokens carry no
/// authorized-party or email requirements.
pub fn get_verified_jwt(
    providers: &[JwtProvider],
    audiences: &[String],
    request: &TokenRequest,
    time_now: i64,
    cache: &dyn KeyValueCache,
    fetcher: &dyn HttpFetcher,
    events: &dyn AuthEventSink,
) -> Option<VerifiedToken> {
    let token = extract_token(request)?;
    for provider in providers {
        let Some(claims) =
            verify_signed_jwt(&token, time_now, cache, fetcher, &provider.cert_uri, events)
        else {
            continue;
        };
        if provider_claims_ok(&claims, &provider.issuer, audiences, events) {
            return VerifiedToken::from_claims(claims);
        }
    }
    None
}

/// Applies the provider claim policy: exact issuer match and audience
/// membership.
fn provider_claims_ok(
    claims: &Value,
    issuer: &str,
    audiences: &[String],
    events: &dyn AuthEventSink,
) -> bool {
    let token_issuer = claims.get("iss").and_then(Value::as_str).unwrap_or_default();
    if token_issuer != issuer {
        events.rejected(&AuthEvent::with_detail(
            RejectionStage::Claims,
            TokenRejection::InvalidIssuer,
            token_issuer,
        ));
        return false;
    }
    let Some(audience) = claims.get("aud").and_then(Value::as_str).filter(|aud| !aud.is_empty())
    else {
        events.rejected(&AuthEvent::new(RejectionStage::Claims, TokenRejection::MissingAudience));
        return false;
    };
    if !audiences.iter().any(|allowed| allowed == audience) {
        events.rejected(&AuthEvent::with_detail(
            RejectionStage::Claims,
            TokenRejection::InvalidAudience,
            audience,
        ));
        return false;
    }
    true
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;

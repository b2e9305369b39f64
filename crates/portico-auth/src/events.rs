// crates/portico-auth/src/events.rs
// ============================================================================
// Module: Auth Observability Events
// Description: Typed rejection reasons and pluggable event delivery.
// Purpose: Surface verification diagnostics without a hard logging
//          dependency and without leaking failure detail to callers.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Verification failures are opaque to callers (`None`), but deployments
//! need diagnostics. This module models rejections as typed reasons with
//! stable labels, delivered to a pluggable sink so downstream systems can
//! wire their own logging or metrics without redesign. Detail strings are
//! always printable: hostile token bytes pass through lossy UTF-8
//! conversion before they are formatted into an event.
//!
//! ## Invariants
//! - Labels are stable for audit and metric labeling.
//! - Events never carry raw token material, only sanitized detail.

use std::fmt;

// ============================================================================
// SECTION: Rejection Reasons
// ============================================================================

/// Classification of where a verification attempt stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionStage {
    /// Wrong segment count, bad Base64, or bad JSON.
    Structural,
    /// No candidate certificate validated the signature.
    Signature,
    /// Issued-at/expiry window violations.
    Temporal,
    /// Issuer, audience, client-ID, or email claim failures.
    Claims,
    /// Certificate or introspection endpoint unavailable.
    Upstream,
}

/// Typed rejection reason for a failed verification attempt.
///
/// # Invariants
/// - Variants are stable for audit labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    /// Token did not have exactly three segments.
    WrongSegmentCount,
    /// A segment was not valid URL-safe Base64.
    MalformedBase64,
    /// A decoded segment was not valid JSON.
    MalformedJson,
    /// Header declared an algorithm other than RS256.
    UnexpectedAlgorithm,
    /// Issuer certificates could not be retrieved.
    CertsUnavailable,
    /// No candidate certificate validated the signature.
    InvalidSignature,
    /// Token carried no issued-at claim.
    MissingIssuedAt,
    /// Token carried no expiry claim.
    MissingExpiry,
    /// Token used before its issued-at window opened.
    UsedTooEarly,
    /// Token used past the maximum lifetime after issuance.
    LifetimeExceeded,
    /// Token used past its expiry.
    Expired,
    /// Issuer claim not in the allowed set.
    InvalidIssuer,
    /// Token carried no audience claim.
    MissingAudience,
    /// Audience claim not in the allowed set.
    InvalidAudience,
    /// The skip sentinel is never honored for identity tokens.
    ClientIdSkipNotAllowed,
    /// Authorized-party claim missing or not allowed.
    InvalidClientId,
    /// Token carried no email claim.
    MissingEmail,
    /// Introspection response was unusable or unverified.
    IntrospectionRejected,
}

impl TokenRejection {
    /// Returns a stable label for this rejection reason.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::WrongSegmentCount => "wrong_segment_count",
            Self::MalformedBase64 => "malformed_base64",
            Self::MalformedJson => "malformed_json",
            Self::UnexpectedAlgorithm => "unexpected_algorithm",
            Self::CertsUnavailable => "certs_unavailable",
            Self::InvalidSignature => "invalid_signature",
            Self::MissingIssuedAt => "missing_issued_at",
            Self::MissingExpiry => "missing_expiry",
            Self::UsedTooEarly => "used_too_early",
            Self::LifetimeExceeded => "lifetime_exceeded",
            Self::Expired => "expired",
            Self::InvalidIssuer => "invalid_issuer",
            Self::MissingAudience => "missing_audience",
            Self::InvalidAudience => "invalid_audience",
            Self::ClientIdSkipNotAllowed => "client_id_skip_not_allowed",
            Self::InvalidClientId => "invalid_client_id",
            Self::MissingEmail => "missing_email",
            Self::IntrospectionRejected => "introspection_rejected",
        }
    }
}

impl fmt::Display for TokenRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// One verification rejection, with sanitized detail.
///
/// # Invariants
/// - `detail` is always printable; producers sanitize before formatting.
#[derive(Debug, Clone)]
pub struct AuthEvent {
    /// Where the attempt stopped.
    pub stage: RejectionStage,
    /// Why the attempt stopped.
    pub reason: TokenRejection,
    /// Sanitized supporting detail, when any.
    pub detail: Option<String>,
}

impl AuthEvent {
    /// Creates an event without detail.
    #[must_use]
    pub const fn new(stage: RejectionStage, reason: TokenRejection) -> Self {
        Self {
            stage,
            reason,
            detail: None,
        }
    }

    /// Creates an event with sanitized detail.
    #[must_use]
    pub fn with_detail(stage: RejectionStage, reason: TokenRejection, detail: &str) -> Self {
        Self {
            stage,
            reason,
            detail: Some(sanitize(detail)),
        }
    }
}

/// Delivery interface for verification diagnostics.
pub trait AuthEventSink: Send + Sync {
    /// Records one rejected verification attempt.
    fn rejected(&self, event: &AuthEvent);
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl AuthEventSink for NoopEventSink {
    fn rejected(&self, _event: &AuthEvent) {}
}

// ============================================================================
// SECTION: Sanitization
// ============================================================================

/// Replaces control characters so detail strings are safe to print.
fn sanitize(detail: &str) -> String {
    detail.chars().map(|ch| if ch.is_control() { '\u{fffd}' } else { ch }).collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

// crates/portico-auth/src/lib.rs
// ============================================================================
// Module: Token Verification Engine
// Description: Bearer-token verification for identity and access tokens.
// Purpose: Validate signed identity tokens and opaque OAuth2 access tokens
//          against configurable issuers, audiences, and client IDs.
// Dependencies: crate::{cache, certs, events, fetch, introspect, verify}
// ============================================================================

//! ## Overview
//! The verification engine is stateless per call: all state is the supplied
//! token string plus the externally-owned certificate cache. Signed identity
//! tokens pass through structural decode, signature verification against the
//! issuer's published modulus/exponent key set, temporal checks, and claim
//! checks; opaque access tokens are validated against a token-introspection
//! endpoint. Every failure path resolves to "no verified identity" — the
//! engine never propagates decode or crypto errors to callers, and never
//! reveals to them which specific check failed.
//!
//! ## Layer Responsibilities
//! - Acquire a bearer token from the request surface.
//! - Verify identity tokens against cached issuer certificates.
//! - Introspect opaque access tokens with scope and client-ID policy.
//!
//! ## Invariants
//! - Rejections surface as `None`; typed reasons exist for event sinks only.
//! - The skip-client-id sentinel is honored for access-token introspection
//!   and never for identity-token claims.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod cache;
pub mod certs;
pub mod events;
pub mod fetch;
pub mod introspect;
pub mod verify;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cache::CERT_NAMESPACE;
pub use cache::InMemoryCache;
pub use cache::KeyValueCache;
pub use certs::cert_expiration_seconds;
pub use certs::get_cached_certs;
pub use events::AuthEvent;
pub use events::AuthEventSink;
pub use events::NoopEventSink;
pub use events::RejectionStage;
pub use events::TokenRejection;
pub use fetch::FetchError;
pub use fetch::FetchResponse;
pub use fetch::HttpFetcher;
pub use fetch::ReqwestFetcher;
pub use introspect::AuthenticatedUser;
pub use introspect::DEFAULT_TOKENINFO_URL;
pub use introspect::RequestAuthContext;
pub use introspect::introspect_access_token;
pub use verify::CLOCK_SKEW_SECS;
pub use verify::DEFAULT_CERT_URI;
pub use verify::JwtProvider;
pub use verify::MAX_TOKEN_LIFETIME_SECS;
pub use verify::TokenRequest;
pub use verify::VerifiedToken;
pub use verify::extract_token;
pub use verify::get_verified_jwt;
pub use verify::is_skip_sentinel;
pub use verify::verify_identity_token;

// crates/portico-auth/src/cache.rs
// ============================================================================
// Module: Key-Value Cache Collaborator
// Description: Cache seam for issuer certificates, with a reference impl.
// Purpose: Let deployments map the logical cache to their own store.
// Dependencies: serde_json, std
// ============================================================================

//! ## Overview
//! The verification engine reads and writes issuer certificate sets through
//! this seam. The cache is externally owned and shared across concurrent
//! requests; it must tolerate concurrent reads and writes, but a
//! cache-population race (two requests fetching the same missing cert) is
//! acceptable redundant work, not a correctness bug, so no lock is held
//! across fetches.
//!
//! ## Invariants
//! - A TTL of zero means "do not cache"; `set` with zero stores nothing.
//! - Expired entries read as absent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::time::Duration;
use std::time::Instant;

use serde_json::Value;

// ============================================================================
// SECTION: Cache Interface
// ============================================================================

/// Namespace under which issuer certificates are cached.
pub const CERT_NAMESPACE: &str = "__verify_jwt";

/// Namespaced key-value cache with per-entry expiry.
pub trait KeyValueCache: Send + Sync {
    /// Returns the cached value for `key` in `namespace`, when present and
    /// unexpired.
    fn get(&self, key: &str, namespace: &str) -> Option<Value>;

    /// Stores `value` under `key` in `namespace` for `ttl_seconds`. A TTL
    /// of zero stores nothing.
    fn set(&self, key: &str, value: Value, namespace: &str, ttl_seconds: u64);
}

// ============================================================================
// SECTION: Reference Implementation
// ============================================================================

/// One cached value with its expiry deadline.
#[derive(Debug, Clone)]
struct CacheEntry {
    /// Cached value.
    value: Value,
    /// Deadline after which the entry reads as absent.
    expires_at: Instant,
}

/// Process-local reference cache.
///
/// # Invariants
/// - Reads and writes are safe under concurrency; a poisoned lock is
///   recovered rather than propagated.
/// - Expired entries are overwritten by later sets; reads never return
///   them.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    /// Entries keyed by (namespace, key).
    entries: RwLock<BTreeMap<(String, String), CacheEntry>>,
}

impl InMemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueCache for InMemoryCache {
    fn get(&self, key: &str, namespace: &str) -> Option<Value> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(&(namespace.to_string(), key.to_string()))?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.value.clone())
    }

    fn set(&self, key: &str, value: Value, namespace: &str, ttl_seconds: u64) {
        if ttl_seconds == 0 {
            return;
        }
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
        };
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert((namespace.to_string(), key.to_string()), entry);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

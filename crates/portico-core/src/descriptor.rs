// crates/portico-core/src/descriptor.rs
// ============================================================================
// Module: API Descriptors
// Description: Declarative descriptions of APIs, methods, and auth metadata.
// Purpose: Feed the description generators and the config registry.
// Dependencies: serde, crate::message
// ============================================================================

//! ## Overview
//! Descriptors are the explicit, value-typed replacement for
//! annotation-driven declaration: a [`ServiceDescriptor`] carries one
//! backend class's API metadata and its ordered [`MethodDescriptor`] list,
//! constructed directly rather than inferred by runtime introspection.
//!
//! ## Invariants
//! - Method order is declaration order and is preserved by the generators.
//! - `None` on a per-method override means "inherit the API-level setting";
//!   an explicit empty value means "override with nothing".

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::message::FieldDescriptor;

// ============================================================================
// CONSTANTS: Defaults shared across the serving layer
// ============================================================================

/// Default base path under which every API is served.
pub const DEFAULT_BASE_PATH: &str = "/_ah/api";

/// OAuth2 scope granting access to the caller's email address.
pub const EMAIL_SCOPE: &str = "https://www.googleapis.com/auth/userinfo.email";

/// Description attached to the default email scope.
const EMAIL_SCOPE_DESCRIPTION: &str = "View your email address";

/// Name of the default identity-token issuer entry.
pub const DEFAULT_ISSUER_NAME: &str = "google_id_token";

/// Issuer string of the default identity-token issuer.
const DEFAULT_ISSUER: &str = "https://accounts.google.com";

/// Certificate endpoint of the default identity-token issuer.
const DEFAULT_ISSUER_JWKS_URI: &str = "https://www.googleapis.com/oauth2/v3/certs";

// ============================================================================
// SECTION: Auth Metadata
// ============================================================================

/// Default authentication requirement for an API's methods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthLevel {
    /// No authentication is expected.
    #[default]
    None,
    /// Authentication is consumed when present but not required.
    Optional,
    /// Authentication is required.
    Required,
}

/// One declared OAuth2 scope with its user-facing description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Scope {
    /// Scope URL.
    pub scope: String,
    /// User-facing consent description.
    pub description: String,
}

impl OAuth2Scope {
    /// Creates a scope from its URL and description.
    #[must_use]
    pub fn new(scope: &str, description: &str) -> Self {
        Self {
            scope: scope.to_string(),
            description: description.to_string(),
        }
    }

    /// Returns the default email scope.
    #[must_use]
    pub fn email() -> Self {
        Self::new(EMAIL_SCOPE, EMAIL_SCOPE_DESCRIPTION)
    }
}

/// One trusted identity-token issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuer {
    /// Issuer string expected in the token's `iss` claim.
    pub issuer: String,
    /// Certificate endpoint serving the issuer's signing keys.
    pub jwks_uri: String,
}

impl Issuer {
    /// Creates an issuer entry.
    #[must_use]
    pub fn new(issuer: &str, jwks_uri: &str) -> Self {
        Self {
            issuer: issuer.to_string(),
            jwks_uri: jwks_uri.to_string(),
        }
    }
}

/// Acceptable token audiences, either legacy or per-issuer form.
///
/// # Invariants
/// - `Legacy` lists bind to the default issuer entry when it is declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audiences {
    /// Flat audience list for the default issuer.
    Legacy(Vec<String>),
    /// Audience lists keyed by issuer entry name.
    PerIssuer(BTreeMap<String, Vec<String>>),
}

// ============================================================================
// SECTION: Namespaces and Quota
// ============================================================================

/// Optional rewrite of generated package and schema prefixing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiNamespace {
    /// Owner domain advertised in the Discovery document.
    pub owner_domain: String,
    /// Owner name advertised in the Discovery document.
    pub owner_name: String,
    /// Package path; empty when unset.
    pub package_path: Option<String>,
}

/// One named rate-limit definition declared at the API level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitDefinition {
    /// Metric name referenced by per-method costs.
    pub name: String,
    /// Display name shown in the management console.
    pub display_name: String,
    /// Default per-minute limit.
    pub default_limit: i64,
}

impl LimitDefinition {
    /// Creates a limit definition.
    #[must_use]
    pub fn new(name: &str, display_name: &str, default_limit: i64) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            default_limit,
        }
    }
}

// ============================================================================
// SECTION: Request and Response Specs
// ============================================================================

/// Request type overlay mirroring a resource container: a wrapped body
/// message plus path/query parameter fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceContainer {
    /// Qualified name of the wrapped body message, when any.
    pub body: Option<String>,
    /// Parameter overlay fields, in declaration order.
    pub params: Vec<FieldDescriptor>,
}

/// Request shape of a method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestSpec {
    /// No request payload.
    Void,
    /// A plain message type, by qualified name.
    Message(String),
    /// A resource container splitting parameters from the body.
    Container(ResourceContainer),
}

/// Response shape of a method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSpec {
    /// No response payload.
    Void,
    /// A plain message type, by qualified name.
    Message(String),
}

// ============================================================================
// SECTION: Method Descriptors
// ============================================================================

/// One declared API method.
///
/// # Invariants
/// - `name` is the logical, dot-separated grouping name used for resource
///   placement and canonical collision checks.
/// - `implementation` is the bare backend function name; the dotted
///   `Class.method` form exists only at the serialization boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    /// Logical method name, dot-separated for resource grouping.
    pub name: String,
    /// HTTP method, upper-case.
    pub http_method: String,
    /// URL path template with `{param}` placeholders.
    pub path: String,
    /// Request shape.
    pub request: RequestSpec,
    /// Response shape.
    pub response: ResponseSpec,
    /// Per-method scope override; `None` inherits the API scopes.
    pub scopes: Option<Vec<OAuth2Scope>>,
    /// Per-method audience override; `None` inherits the API audiences.
    pub audiences: Option<Audiences>,
    /// Per-method allowed client IDs; `None` inherits the API setting.
    pub allowed_client_ids: Option<Vec<String>>,
    /// Per-method API-key override; `None` inherits the API setting.
    pub api_key_required: Option<bool>,
    /// Metric costs keyed by declared limit name.
    pub metric_costs: BTreeMap<String, i64>,
    /// Bare backend function name implementing this method.
    pub implementation: String,
    /// Human-readable description.
    pub description: Option<String>,
}

impl MethodDescriptor {
    /// Creates a method with inherit-everything auth settings.
    #[must_use]
    pub fn new(name: &str, http_method: &str, path: &str, implementation: &str) -> Self {
        Self {
            name: name.to_string(),
            http_method: http_method.to_string(),
            path: path.to_string(),
            request: RequestSpec::Void,
            response: ResponseSpec::Void,
            scopes: None,
            audiences: None,
            allowed_client_ids: None,
            api_key_required: None,
            metric_costs: BTreeMap::new(),
            implementation: implementation.to_string(),
            description: None,
        }
    }

    /// Sets the request shape.
    #[must_use]
    pub fn with_request(mut self, request: RequestSpec) -> Self {
        self.request = request;
        self
    }

    /// Sets the response shape.
    #[must_use]
    pub fn with_response(mut self, response: ResponseSpec) -> Self {
        self.response = response;
        self
    }

    /// Attaches a description.
    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// True when the method carries its payload in query/path parameters
    /// rather than a request body.
    #[must_use]
    pub fn is_bodyless(&self) -> bool {
        matches!(self.http_method.as_str(), "GET" | "DELETE")
    }
}

// ============================================================================
// SECTION: API and Service Descriptors
// ============================================================================

/// One API's identity, serving location, and default auth posture.
///
/// # Invariants
/// - `base_path` has no trailing slash except the bare root `/`.
/// - `scopes` and `issuers` always carry the platform defaults unless the
///   declaration replaced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiDescriptor {
    /// API name.
    pub name: String,
    /// API version.
    pub version: String,
    /// Hostname used to build absolute URLs.
    pub hostname: String,
    /// Base path under which the API is served.
    pub base_path: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Default authentication requirement.
    pub auth_level: AuthLevel,
    /// Declared OAuth2 scopes.
    pub scopes: Vec<OAuth2Scope>,
    /// Declared token issuers keyed by entry name.
    pub issuers: BTreeMap<String, Issuer>,
    /// API-level acceptable audiences.
    pub audiences: Option<Audiences>,
    /// API-level allowed client IDs.
    pub allowed_client_ids: Option<Vec<String>>,
    /// True when every method requires an API key by default.
    pub api_key_required: bool,
    /// Declared rate-limit definitions, in declaration order.
    pub limits: Vec<LimitDefinition>,
    /// Optional package/schema prefixing rewrite.
    pub namespace: Option<ApiNamespace>,
}

impl ApiDescriptor {
    /// Creates an API descriptor with platform defaults.
    #[must_use]
    pub fn new(name: &str, version: &str, hostname: &str) -> Self {
        let mut issuers = BTreeMap::new();
        issuers.insert(
            DEFAULT_ISSUER_NAME.to_string(),
            Issuer::new(DEFAULT_ISSUER, DEFAULT_ISSUER_JWKS_URI),
        );
        Self {
            name: name.to_string(),
            version: version.to_string(),
            hostname: hostname.to_string(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            description: None,
            auth_level: AuthLevel::None,
            scopes: vec![OAuth2Scope::email()],
            issuers,
            audiences: None,
            allowed_client_ids: None,
            api_key_required: false,
            limits: Vec::new(),
            namespace: None,
        }
    }

    /// Attaches a description.
    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Replaces the base path, trimming a trailing slash except for root.
    #[must_use]
    pub fn with_base_path(mut self, base_path: &str) -> Self {
        if base_path == "/" {
            self.base_path = base_path.to_string();
        } else {
            self.base_path = base_path.trim_end_matches('/').to_string();
        }
        self
    }
}

/// One backend class: its API identity and its declared methods.
///
/// # Invariants
/// - `class_name` is the registration identity; two services sharing a
///   class name cannot both be registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Backend class name.
    pub class_name: String,
    /// API identity and defaults.
    pub api: ApiDescriptor,
    /// Declared methods, in declaration order.
    pub methods: Vec<MethodDescriptor>,
}

impl ServiceDescriptor {
    /// Creates a service descriptor.
    #[must_use]
    pub fn new(class_name: &str, api: ApiDescriptor, methods: Vec<MethodDescriptor>) -> Self {
        Self {
            class_name: class_name.to_string(),
            api,
            methods,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

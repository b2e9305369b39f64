// crates/portico-describe/src/openapi.rs
// ============================================================================
// Module: OpenAPI Generator
// Description: Swagger/OpenAPI 2.0 description document generation.
// Purpose: Render one API batch into a deterministic OpenAPI document.
// Dependencies: portico-core, portico-schema, serde_json
// ============================================================================

//! ## Overview
//! The OpenAPI generator shares the Discovery generator's input contract
//! but emits Swagger 2.0 output: `paths` keyed by URL template, one entry
//! per HTTP method with `operationId`, typed `parameters`, and
//! `responses`. Security metadata is structural: every distinct
//! (issuer, audience-set) pair becomes a dedicated security definition
//! whose name carries a stable content-hash suffix, and API-key
//! requirements are AND-ed into every security alternative.
//!
//! ## Invariants
//! - Body-versus-parameter placement follows the request shape: plain
//!   messages become a single body reference, containers split into
//!   overlay parameters plus an optional wrapped body.
//! - Identical audience sets hash to identical definition names across
//!   runs.
//! - Output key order is deterministic for byte-level comparison.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use portico_core::ApiDescriptor;
use portico_core::ConfigurationError;
use portico_core::FieldDescriptor;
use portico_core::FieldVariant;
use portico_core::Issuer;
use portico_core::MethodDescriptor;
use portico_core::RequestSpec;
use portico_core::ResponseSpec;
use portico_core::ServiceDescriptor;
use portico_core::TypeRegistry;
use portico_schema::SchemaError;
use portico_schema::SchemaGraph;
use portico_schema::SchemaStyle;
use portico_schema::scalar_param_type;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::DescribeError;
use crate::common;

// ============================================================================
// SECTION: Generator
// ============================================================================

/// OpenAPI 2.0 description generator.
///
/// # Invariants
/// - The generator is stateless; every call builds a fresh schema graph
///   and security ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenApiGenerator;

impl OpenApiGenerator {
    /// Creates a generator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Generates an OpenAPI document using each API's declared hostname.
    ///
    /// # Errors
    /// Returns [`DescribeError`] for invalid batches or inconsistent
    /// message graphs.
    pub fn generate(
        &self,
        services: &[ServiceDescriptor],
        registry: &TypeRegistry,
    ) -> Result<Value, DescribeError> {
        self.generate_with_hostname(services, registry, None)
    }

    /// Generates an OpenAPI document, optionally overriding the hostname.
    ///
    /// # Errors
    /// Returns [`DescribeError`] for invalid batches or inconsistent
    /// message graphs.
    pub fn generate_with_hostname(
        &self,
        services: &[ServiceDescriptor],
        registry: &TypeRegistry,
        hostname: Option<&str>,
    ) -> Result<Value, DescribeError> {
        common::validate_batch(services)?;
        let api = &services.first().ok_or(ConfigurationError::EmptyBatch)?.api;
        let hostname = hostname.unwrap_or(&api.hostname);
        let declared_issuers: BTreeSet<String> = api.issuers.keys().cloned().collect();

        let mut graph = SchemaGraph::new(registry, SchemaStyle::OpenApi);
        let mut security = SecurityLedger::new(&api.issuers);
        let mut paths: BTreeMap<String, Map<String, Value>> = BTreeMap::new();

        for service in services {
            for method in &service.methods {
                let operation = operation_object(
                    service,
                    api,
                    method,
                    registry,
                    &mut graph,
                    &mut security,
                    &declared_issuers,
                )?;
                let full_path = format!("/{}/{}/{}", api.name, api.version, method.path);
                paths
                    .entry(full_path)
                    .or_default()
                    .insert(method.http_method.to_lowercase(), operation);
            }
        }

        let mut doc = Map::new();
        doc.insert("swagger".to_string(), json!("2.0"));
        let mut info = Map::new();
        info.insert("title".to_string(), json!(api.name));
        if let Some(description) = &api.description {
            info.insert("description".to_string(), json!(description));
        }
        info.insert("version".to_string(), json!(api.version));
        doc.insert("info".to_string(), Value::Object(info));
        doc.insert("host".to_string(), json!(hostname));
        doc.insert("consumes".to_string(), json!(["application/json"]));
        doc.insert("produces".to_string(), json!(["application/json"]));
        doc.insert("schemes".to_string(), json!([common::api_scheme(hostname)]));
        doc.insert("basePath".to_string(), json!(api.base_path));

        let rendered_paths: Map<String, Value> =
            paths.into_iter().map(|(path, entry)| (path, Value::Object(entry))).collect();
        doc.insert("paths".to_string(), Value::Object(rendered_paths));

        if !graph.is_empty() {
            let definitions: Map<String, Value> = graph.into_definitions().into_iter().collect();
            doc.insert("definitions".to_string(), Value::Object(definitions));
        }
        doc.insert("securityDefinitions".to_string(), security.render());
        if !api.limits.is_empty() {
            doc.insert("x-google-management".to_string(), management_block(api));
        }
        Ok(Value::Object(doc))
    }

    /// Generates and renders the document with stable formatting.
    ///
    /// # Errors
    /// Returns [`DescribeError`] when generation or rendering fails.
    pub fn pretty_print(
        &self,
        services: &[ServiceDescriptor],
        registry: &TypeRegistry,
    ) -> Result<String, DescribeError> {
        let document = self.generate(services, registry)?;
        crate::pretty_json(&document)
    }
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Builds one path operation object, registering schemas and security
/// definitions as they are referenced.
fn operation_object(
    service: &ServiceDescriptor,
    api: &ApiDescriptor,
    method: &MethodDescriptor,
    registry: &TypeRegistry,
    graph: &mut SchemaGraph<'_>,
    security: &mut SecurityLedger,
    declared_issuers: &BTreeSet<String>,
) -> Result<Value, DescribeError> {
    let mut operation = Map::new();
    operation.insert(
        "operationId".to_string(),
        json!(format!("{}_{}", service.class_name, common::camel_case(&method.implementation))),
    );
    operation.insert(
        "parameters".to_string(),
        Value::Array(operation_parameters(method, registry, graph)?),
    );

    let mut ok_response = Map::new();
    ok_response.insert("description".to_string(), json!("A successful response"));
    if let ResponseSpec::Message(name) = &method.response {
        let id = graph.add_message(name)?;
        ok_response.insert("schema".to_string(), json!({ "$ref": format!("#/definitions/{id}") }));
    }
    operation.insert("responses".to_string(), json!({ "200": Value::Object(ok_response) }));

    let audiences =
        common::resolve_audiences(method.audiences.as_ref().or(api.audiences.as_ref()), declared_issuers);
    let key_required = method.api_key_required.unwrap_or(api.api_key_required);
    if let Some(requirements) = security.method_security(&audiences, key_required) {
        operation.insert("security".to_string(), requirements);
    }

    if !method.metric_costs.is_empty() {
        let costs: Map<String, Value> = method
            .metric_costs
            .iter()
            .map(|(metric, cost)| (metric.clone(), json!(cost)))
            .collect();
        operation.insert("x-google-quota".to_string(), json!({ "metricCosts": costs }));
    }
    Ok(Value::Object(operation))
}

/// Builds the parameter list for one operation.
fn operation_parameters(
    method: &MethodDescriptor,
    registry: &TypeRegistry,
    graph: &mut SchemaGraph<'_>,
) -> Result<Vec<Value>, DescribeError> {
    let path_params = common::path_parameters(&method.path);
    let mut parameters = Vec::new();

    if method.is_bodyless() {
        for field in flattened_fields(method, registry)? {
            let in_path = path_params.contains(&field.name);
            if let Some(parameter) = query_parameter(&field, in_path, registry)? {
                parameters.push(parameter);
            }
        }
        return Ok(parameters);
    }

    match &method.request {
        RequestSpec::Void => {}
        RequestSpec::Message(name) => {
            // Path-template fields surface as parameters; the message
            // itself remains the request body.
            let message =
                registry.message(name).ok_or_else(|| SchemaError::UnknownType(name.clone()))?;
            for field in &message.fields {
                if path_params.contains(&field.name)
                    && let Some(parameter) = query_parameter(field, true, registry)?
                {
                    parameters.push(parameter);
                }
            }
            let id = graph.add_message(name)?;
            parameters.push(body_parameter(&id));
        }
        RequestSpec::Container(container) => {
            if let Some(body) = &container.body {
                let id = graph.add_message(body)?;
                parameters.push(body_parameter(&id));
            }
            for field in &container.params {
                let in_path = path_params.contains(&field.name);
                if let Some(parameter) = query_parameter(field, in_path, registry)? {
                    parameters.push(parameter);
                }
            }
        }
    }
    Ok(parameters)
}

/// Returns the flattened request fields of a bodyless method.
fn flattened_fields(
    method: &MethodDescriptor,
    registry: &TypeRegistry,
) -> Result<Vec<FieldDescriptor>, DescribeError> {
    let mut fields = Vec::new();
    match &method.request {
        RequestSpec::Void => {}
        RequestSpec::Message(name) => {
            let message =
                registry.message(name).ok_or_else(|| SchemaError::UnknownType(name.clone()))?;
            fields.extend(message.fields.iter().cloned());
        }
        RequestSpec::Container(container) => {
            fields.extend(container.params.iter().cloned());
            if let Some(body) = &container.body {
                let message =
                    registry.message(body).ok_or_else(|| SchemaError::UnknownType(body.clone()))?;
                fields.extend(message.fields.iter().cloned());
            }
        }
    }
    Ok(fields)
}

/// Builds the single `body` parameter referencing a schema.
fn body_parameter(schema_id: &str) -> Value {
    json!({
        "name": "body",
        "in": "body",
        "schema": { "$ref": format!("#/definitions/{schema_id}") },
    })
}

/// Builds one query/path parameter entry, or `None` for field variants
/// that are not representable as parameters (messages and datetimes).
fn query_parameter(
    field: &FieldDescriptor,
    in_path: bool,
    registry: &TypeRegistry,
) -> Result<Option<Value>, DescribeError> {
    let mut map = Map::new();
    map.insert("name".to_string(), json!(field.name));
    map.insert("in".to_string(), json!(if in_path { "path" } else { "query" }));
    if in_path || field.required {
        map.insert("required".to_string(), json!(true));
    }

    match field.variant {
        FieldVariant::Message | FieldVariant::DateTime => return Ok(None),
        FieldVariant::Enum => {
            let target = field
                .type_ref
                .as_deref()
                .ok_or_else(|| SchemaError::MissingTypeRef(field.name.clone()))?;
            let entry = registry
                .enumeration(target)
                .ok_or_else(|| SchemaError::WrongKind(target.to_string()))?;
            let symbols: Vec<&str> = entry.values.iter().map(|value| value.name.as_str()).collect();
            map.insert("type".to_string(), json!("string"));
            map.insert("enum".to_string(), json!(symbols));
        }
        _ => {
            let (kind, format) = scalar_param_type(field.variant)
                .ok_or_else(|| SchemaError::MissingTypeRef(field.name.clone()))?;
            if field.repeated {
                let mut items = Map::new();
                items.insert("type".to_string(), json!(kind));
                if let Some(format) = format {
                    items.insert("format".to_string(), json!(format));
                }
                map.insert("type".to_string(), json!("array"));
                map.insert("items".to_string(), Value::Object(items));
                map.insert("collectionFormat".to_string(), json!("multi"));
                return Ok(Some(Value::Object(map)));
            }
            map.insert("type".to_string(), json!(kind));
            if let Some(format) = format {
                map.insert("format".to_string(), json!(format));
            }
        }
    }
    Ok(Some(Value::Object(map)))
}

// ============================================================================
// SECTION: Security Definitions
// ============================================================================

/// Name of the API-key security definition entry.
const API_KEY_ENTRY: &str = "api_key";

/// Accumulates the security definitions referenced by a document.
///
/// # Invariants
/// - A base, unsuffixed entry is always emitted for every declared issuer.
/// - Audience-variant entries are created on first use and reused after.
#[derive(Debug)]
struct SecurityLedger {
    /// Declared issuers keyed by entry name.
    issuers: BTreeMap<String, Issuer>,
    /// Audience-variant entries: definition name to (issuer, joined list).
    variants: BTreeMap<String, (String, String)>,
    /// True once any method required an API key.
    api_key_used: bool,
}

impl SecurityLedger {
    /// Creates a ledger over the declared issuer set.
    fn new(issuers: &BTreeMap<String, Issuer>) -> Self {
        Self {
            issuers: issuers.clone(),
            variants: BTreeMap::new(),
            api_key_used: false,
        }
    }

    /// Builds one method's `security` list: one alternative per issuer in
    /// entry-name order, API-key requirement AND-ed into each, or a lone
    /// API-key requirement when no issuer applies. Returns `None` when the
    /// method needs no security block.
    fn method_security(
        &mut self,
        audiences: &BTreeMap<String, Vec<String>>,
        key_required: bool,
    ) -> Option<Value> {
        let mut alternatives: Vec<Value> = Vec::new();
        for (issuer_name, list) in audiences {
            let entry_name = if list.is_empty() {
                issuer_name.clone()
            } else {
                let (joined, suffix) = common::audience_variant(list);
                let entry_name = format!("{issuer_name}-{suffix}");
                self.variants.insert(entry_name.clone(), (issuer_name.clone(), joined));
                entry_name
            };
            let mut requirement = Map::new();
            if key_required {
                requirement.insert(API_KEY_ENTRY.to_string(), json!([]));
                self.api_key_used = true;
            }
            requirement.insert(entry_name, json!([]));
            alternatives.push(Value::Object(requirement));
        }
        if alternatives.is_empty() && key_required {
            self.api_key_used = true;
            let mut requirement = Map::new();
            requirement.insert(API_KEY_ENTRY.to_string(), json!([]));
            alternatives.push(Value::Object(requirement));
        }
        if alternatives.is_empty() { None } else { Some(Value::Array(alternatives)) }
    }

    /// Renders the accumulated `securityDefinitions` block.
    fn render(self) -> Value {
        let mut definitions = Map::new();
        for (name, issuer) in &self.issuers {
            definitions.insert(name.clone(), issuer_entry(issuer, None));
        }
        for (name, (issuer_name, joined)) in &self.variants {
            if let Some(issuer) = self.issuers.get(issuer_name) {
                definitions.insert(name.clone(), issuer_entry(issuer, Some(joined)));
            }
        }
        if self.api_key_used {
            definitions.insert(
                API_KEY_ENTRY.to_string(),
                json!({ "type": "apiKey", "name": "key", "in": "query" }),
            );
        }
        Value::Object(definitions)
    }
}

/// Builds one OAuth2 issuer entry, with an audience restriction when the
/// entry is an audience variant.
fn issuer_entry(issuer: &Issuer, audiences: Option<&str>) -> Value {
    let mut map = Map::new();
    map.insert("authorizationUrl".to_string(), json!(""));
    map.insert("flow".to_string(), json!("implicit"));
    map.insert("type".to_string(), json!("oauth2"));
    map.insert("x-google-issuer".to_string(), json!(issuer.issuer));
    map.insert("x-google-jwks_uri".to_string(), json!(issuer.jwks_uri));
    if let Some(audiences) = audiences {
        map.insert("x-google-audiences".to_string(), json!(audiences));
    }
    Value::Object(map)
}

// ============================================================================
// SECTION: Quota Management
// ============================================================================

/// Builds the document-level quota/metrics block from declared limits.
fn management_block(api: &ApiDescriptor) -> Value {
    let limits: Vec<Value> = api
        .limits
        .iter()
        .map(|limit| {
            json!({
                "name": limit.name,
                "metric": limit.name,
                "unit": "1/min/{project}",
                "values": { "STANDARD": limit.default_limit },
                "displayName": limit.display_name,
            })
        })
        .collect();
    let metrics: Vec<Value> = api
        .limits
        .iter()
        .map(|limit| {
            json!({
                "name": limit.name,
                "valueType": "INT64",
                "metricKind": "GAUGE",
            })
        })
        .collect();
    json!({ "quota": { "limits": limits }, "metrics": metrics })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

// crates/portico-describe/src/discovery.rs
// ============================================================================
// Module: Discovery Generator
// Description: Legacy Discovery-format description document generation.
// Purpose: Render one API batch into a deterministic Discovery document.
// Dependencies: portico-core, portico-schema, serde_json
// ============================================================================

//! ## Overview
//! The Discovery generator renders a full Discovery-format document for one
//! or more service classes sharing an API name and version. Methods are
//! grouped into a resource tree by their dot-separated logical names,
//! request bodies reference generated schemas, and bodyless methods flatten
//! their request fields into path/query parameters. The fixed boilerplate
//! parameter set and icon block mirror the legacy discovery contract
//! verbatim and are constants, not inference.
//!
//! ## Invariants
//! - One generation call owns its schema graph; concurrent calls never
//!   share mutable state.
//! - Path template placeholders force `required: true` on their
//!   parameters regardless of the declared field requiredness.
//! - Output key order is deterministic for byte-level comparison.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use portico_core::ApiDescriptor;
use portico_core::ConfigurationError;
use portico_core::FieldDescriptor;
use portico_core::FieldVariant;
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

/// Discovery-format description generator.
///
/// # Invariants
/// - The generator is stateless; every call builds a fresh schema graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscoveryGenerator;

impl DiscoveryGenerator {
    /// Creates a generator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Generates a Discovery document using each API's declared hostname.
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

    /// Generates a Discovery document, optionally overriding the hostname
    /// used to build absolute URLs.
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

        let mut graph = SchemaGraph::new(registry, SchemaStyle::Discovery);
        let mut tree = ResourceTree::default();
        let mut scope_descriptions: BTreeMap<String, String> = BTreeMap::new();
        for scope in &api.scopes {
            scope_descriptions.insert(scope.scope.clone(), scope.description.clone());
        }

        for service in services {
            for method in &service.methods {
                let descriptor = method_descriptor(api, method, registry, &mut graph)?;
                if let Some(scopes) = &method.scopes {
                    for scope in scopes {
                        scope_descriptions.insert(scope.scope.clone(), scope.description.clone());
                    }
                }
                tree.insert(&method.name, descriptor);
            }
        }

        let mut doc = Map::new();
        doc.insert("kind".to_string(), json!("discovery#restDescription"));
        doc.insert("discoveryVersion".to_string(), json!("v1"));
        doc.insert("id".to_string(), json!(format!("{}:{}", api.name, api.version)));
        doc.insert("name".to_string(), json!(api.name));
        doc.insert("version".to_string(), json!(api.version));
        if let Some(description) = &api.description {
            doc.insert("description".to_string(), json!(description));
        }
        if let Some(namespace) = &api.namespace {
            doc.insert("ownerDomain".to_string(), json!(namespace.owner_domain));
            doc.insert("ownerName".to_string(), json!(namespace.owner_name));
            let package_path = namespace.package_path.clone().unwrap_or_default();
            doc.insert("packagePath".to_string(), json!(package_path));
        }
        doc.insert("icons".to_string(), icon_block());
        doc.insert("protocol".to_string(), json!("rest"));
        doc.insert("batchPath".to_string(), json!("batch"));
        insert_url_block(&mut doc, api, hostname);
        doc.insert("parameters".to_string(), boilerplate_parameters());

        let scopes: Map<String, Value> = scope_descriptions
            .into_iter()
            .map(|(scope, description)| (scope, json!({ "description": description })))
            .collect();
        doc.insert("auth".to_string(), json!({ "oauth2": { "scopes": scopes } }));

        if !graph.is_empty() {
            let schemas: Map<String, Value> = graph.into_definitions().into_iter().collect();
            doc.insert("schemas".to_string(), Value::Object(schemas));
        }
        tree.render_into(&mut doc);
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
// SECTION: URL Construction
// ============================================================================

/// Inserts the scheme-dependent URL keys for the effective hostname.
fn insert_url_block(doc: &mut Map<String, Value>, api: &ApiDescriptor, hostname: &str) {
    let scheme = common::api_scheme(hostname);
    let prefix = common::base_prefix(&api.base_path);
    let base_path = format!("{prefix}/{}/{}/", api.name, api.version);
    doc.insert("baseUrl".to_string(), json!(format!("{scheme}://{hostname}{base_path}")));
    doc.insert("basePath".to_string(), json!(base_path));
    doc.insert("rootUrl".to_string(), json!(format!("{scheme}://{hostname}{prefix}/")));
    doc.insert("servicePath".to_string(), json!(format!("{}/{}/", api.name, api.version)));
}

// ============================================================================
// SECTION: Method Descriptors
// ============================================================================

/// Builds one Discovery method descriptor and registers its schemas.
fn method_descriptor(
    api: &ApiDescriptor,
    method: &MethodDescriptor,
    registry: &TypeRegistry,
    graph: &mut SchemaGraph<'_>,
) -> Result<Value, DescribeError> {
    let path_params = common::path_parameters(&method.path);

    let mut descriptor = Map::new();
    descriptor.insert("id".to_string(), json!(format!("{}.{}", api.name, method.name)));
    descriptor.insert("path".to_string(), json!(method.path));
    descriptor.insert("httpMethod".to_string(), json!(method.http_method));
    if let Some(description) = &method.description {
        descriptor.insert("description".to_string(), json!(description));
    }

    let fields = parameter_fields(method, registry)?;
    let mut parameters = Map::new();
    let mut order: Vec<String> = Vec::new();
    for field in &fields {
        let in_path = path_params.contains(&field.name);
        for (name, value) in parameter_values(field, in_path, registry)? {
            if in_path || field.required {
                order.push(name.clone());
            }
            parameters.insert(name, value);
        }
    }
    if !parameters.is_empty() {
        descriptor.insert("parameters".to_string(), Value::Object(parameters));
    }
    if !order.is_empty() {
        descriptor.insert("parameterOrder".to_string(), json!(order));
    }

    if !method.is_bodyless()
        && let Some(body) = body_message(&method.request)
    {
        let id = graph.add_message(body)?;
        descriptor
            .insert("request".to_string(), json!({ "$ref": id, "parameterName": "resource" }));
    }
    if let ResponseSpec::Message(name) = &method.response {
        let id = graph.add_message(name)?;
        descriptor.insert("response".to_string(), json!({ "$ref": id }));
    }

    let scopes: Vec<&str> = method.scopes.as_ref().unwrap_or(&api.scopes)
        .iter()
        .map(|scope| scope.scope.as_str())
        .collect();
    descriptor.insert("scopes".to_string(), json!(scopes));
    Ok(Value::Object(descriptor))
}

/// Returns the wrapped body message of a request, when any.
fn body_message(request: &RequestSpec) -> Option<&str> {
    match request {
        RequestSpec::Void => None,
        RequestSpec::Message(name) => Some(name),
        RequestSpec::Container(container) => container.body.as_deref(),
    }
}

/// Collects the fields flattened into parameters for a method: bodyless
/// methods flatten the whole request; body methods keep only path-template
/// fields (plain messages) or the container overlay.
fn parameter_fields(
    method: &MethodDescriptor,
    registry: &TypeRegistry,
) -> Result<Vec<FieldDescriptor>, DescribeError> {
    let path_params = common::path_parameters(&method.path);
    let mut fields = Vec::new();
    match &method.request {
        RequestSpec::Void => {}
        RequestSpec::Message(name) => {
            let message = registry
                .message(name)
                .ok_or_else(|| SchemaError::UnknownType(name.clone()))?;
            if method.is_bodyless() {
                fields.extend(message.fields.iter().cloned());
            } else {
                fields.extend(
                    message
                        .fields
                        .iter()
                        .filter(|field| path_params.contains(&field.name))
                        .cloned(),
                );
            }
        }
        RequestSpec::Container(container) => {
            fields.extend(container.params.iter().cloned());
            if method.is_bodyless()
                && let Some(body) = &container.body
            {
                let message = registry
                    .message(body)
                    .ok_or_else(|| SchemaError::UnknownType(body.clone()))?;
                fields.extend(message.fields.iter().cloned());
            }
        }
    }
    Ok(fields)
}

/// Builds the Discovery parameter entries for one field. Datetime fields
/// decompose into millisecond/offset sub-parameters; message fields are
/// not representable as parameters and yield nothing.
fn parameter_values(
    field: &FieldDescriptor,
    in_path: bool,
    registry: &TypeRegistry,
) -> Result<Vec<(String, Value)>, DescribeError> {
    let location = if in_path { "path" } else { "query" };
    let required = in_path || field.required;

    match field.variant {
        FieldVariant::Message => Ok(Vec::new()),
        FieldVariant::DateTime => {
            let mut millis = Map::new();
            millis.insert("type".to_string(), json!("string"));
            millis.insert("format".to_string(), json!("int64"));
            finish_parameter(&mut millis, field, location, required);
            let mut offset = Map::new();
            offset.insert("type".to_string(), json!("integer"));
            offset.insert("format".to_string(), json!("int32"));
            finish_parameter(&mut offset, field, location, required);
            Ok(vec![
                (format!("{}.milliseconds", field.name), Value::Object(millis)),
                (format!("{}.time_zone_offset", field.name), Value::Object(offset)),
            ])
        }
        FieldVariant::Enum => {
            let target = field
                .type_ref
                .as_deref()
                .ok_or_else(|| SchemaError::MissingTypeRef(field.name.clone()))?;
            let entry = registry
                .enumeration(target)
                .ok_or_else(|| SchemaError::WrongKind(target.to_string()))?;
            let mut map = Map::new();
            map.insert("type".to_string(), json!("string"));
            let symbols: Vec<&str> = entry.values.iter().map(|value| value.name.as_str()).collect();
            map.insert("enum".to_string(), json!(symbols));
            let descriptions: Vec<String> = entry
                .values
                .iter()
                .map(|value| value.description.clone().unwrap_or_default())
                .collect();
            map.insert("enumDescriptions".to_string(), json!(descriptions));
            finish_parameter(&mut map, field, location, required);
            Ok(vec![(field.name.clone(), Value::Object(map))])
        }
        _ => {
            let (kind, format) = scalar_param_type(field.variant)
                .ok_or_else(|| SchemaError::MissingTypeRef(field.name.clone()))?;
            let mut map = Map::new();
            map.insert("type".to_string(), json!(kind));
            if let Some(format) = format {
                map.insert("format".to_string(), json!(format));
            }
            finish_parameter(&mut map, field, location, required);
            Ok(vec![(field.name.clone(), Value::Object(map))])
        }
    }
}

/// Applies the location, requiredness, repetition, and default keys shared
/// by every parameter entry.
fn finish_parameter(map: &mut Map<String, Value>, field: &FieldDescriptor, location: &str, required: bool) {
    if required {
        map.insert("required".to_string(), json!(true));
    }
    if field.repeated {
        map.insert("repeated".to_string(), json!(true));
    }
    if let Some(default) = &field.default {
        map.insert("default".to_string(), default.clone());
    }
    map.insert("location".to_string(), json!(location));
}

// ============================================================================
// SECTION: Resource Tree
// ============================================================================

/// Nested resource grouping built from dot-separated method names.
///
/// # Invariants
/// - Leaf descriptors land in `methods`; interior segments become nested
///   `resources` groups.
#[derive(Debug, Default)]
struct ResourceTree {
    /// Methods attached at this level, keyed by final name segment.
    methods: BTreeMap<String, Value>,
    /// Nested resource groups, keyed by segment.
    resources: BTreeMap<String, ResourceTree>,
}

impl ResourceTree {
    /// Inserts a method descriptor under its dot-separated logical name.
    fn insert(&mut self, logical_name: &str, descriptor: Value) {
        let mut node = self;
        let segments: Vec<&str> = logical_name.split('.').collect();
        let (leaf, groups) = match segments.split_last() {
            Some((leaf, groups)) => (*leaf, groups),
            None => (logical_name, &[] as &[&str]),
        };
        for group in groups {
            node = node.resources.entry((*group).to_string()).or_default();
        }
        node.methods.insert(leaf.to_string(), descriptor);
    }

    /// Renders this node's children into the top-level document keys.
    fn render_into(self, doc: &mut Map<String, Value>) {
        if !self.methods.is_empty() {
            let methods: Map<String, Value> = self.methods.into_iter().collect();
            doc.insert("methods".to_string(), Value::Object(methods));
        }
        if !self.resources.is_empty() {
            let resources: Map<String, Value> = self
                .resources
                .into_iter()
                .map(|(name, node)| (name, node.render()))
                .collect();
            doc.insert("resources".to_string(), Value::Object(resources));
        }
    }

    /// Renders a nested resource group.
    fn render(self) -> Value {
        let mut map = Map::new();
        self.render_into(&mut map);
        Value::Object(map)
    }
}

// ============================================================================
// SECTION: Fixed Boilerplate
// ============================================================================

/// Returns the fixed icon block of the legacy discovery contract.
fn icon_block() -> Value {
    json!({
        "x16": "https://www.gstatic.com/images/branding/product/1x/googleg_16dp.png",
        "x32": "https://www.gstatic.com/images/branding/product/1x/googleg_32dp.png",
    })
}

/// Returns the fixed boilerplate parameter set of the legacy discovery
/// contract.
fn boilerplate_parameters() -> Value {
    json!({
        "alt": {
            "type": "string",
            "description": "Data format for the response.",
            "default": "json",
            "enum": ["json"],
            "enumDescriptions": [
                "Responses with Content-Type of application/json"
            ],
            "location": "query",
        },
        "fields": {
            "type": "string",
            "description": "Selector specifying which fields to include in a partial response.",
            "location": "query",
        },
        "key": {
            "type": "string",
            "description": "API key. Your API key identifies your project and provides you with API access, quota, and reports. Required unless you provide an OAuth 2.0 token.",
            "location": "query",
        },
        "oauth_token": {
            "type": "string",
            "description": "OAuth 2.0 token for the current user.",
            "location": "query",
        },
        "prettyPrint": {
            "type": "boolean",
            "description": "Returns response with indentations and line breaks.",
            "default": "true",
            "location": "query",
        },
        "quotaUser": {
            "type": "string",
            "description": "Available to use for quota purposes for server-side applications. Can be any arbitrary string assigned to a user, but should not exceed 40 characters. Overrides userIp if both are provided.",
            "location": "query",
        },
        "userIp": {
            "type": "string",
            "description": "IP address of the site where the request originates. Use this if you want to enforce per-user limits.",
            "location": "query",
        },
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

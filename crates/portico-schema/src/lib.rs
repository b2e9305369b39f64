// crates/portico-schema/src/lib.rs
// ============================================================================
// Module: Schema Graph Builder
// Description: Flattens message graphs into de-duplicated schema definitions.
// Purpose: Give the description generators cycle-safe, deterministic schemas.
// Dependencies: portico-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The schema graph builder walks a message type and every type reachable
//! from it, producing a flat definitions map keyed by deterministic schema
//! identifiers. One builder owns one generation run: its memo table maps
//! qualified type names to assigned identifiers and is populated pre-order,
//! before a type's fields are visited, which is what terminates recursive
//! and mutually-recursive message graphs.
//!
//! ## Invariants
//! - One message type produces exactly one definition per run; later visits
//!   return the memoized identifier.
//! - An identifier is reserved before field recursion; a field referring
//!   back to the type under construction resolves to the reserved id.
//! - Definition properties are name-sorted; output is deterministic.
//!
//! ## Index
//! - Public API: [`SchemaGraph`], [`SchemaStyle`], [`SchemaError`]
//! - Helpers: [`schema_id`], [`scalar_param_type`]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use portico_core::EnumType;
use portico_core::FieldDescriptor;
use portico_core::FieldVariant;
use portico_core::TypeRegistry;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while walking a message graph.
///
/// # Invariants
/// - Every variant is a programming-contract violation: the reflection
///   model fed to the builder is inconsistent, not user input.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A field referenced a type name absent from the registry.
    #[error("unknown type reference: {0}")]
    UnknownType(String),
    /// A message or enum field carried no type reference.
    #[error("field {0} requires a type reference")]
    MissingTypeRef(String),
    /// A type reference resolved to the wrong kind of type.
    #[error("type {0} does not match its field variant")]
    WrongKind(String),
}

// ============================================================================
// SECTION: Styles
// ============================================================================

/// Output styling for generated definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStyle {
    /// Discovery-format schemas: bare `$ref` ids, per-property `required`
    /// flags, `enumDescriptions`, and an `id` echo in each definition.
    Discovery,
    /// OpenAPI 2.0 definitions: `#/definitions/` refs and a name-sorted
    /// `required` array.
    OpenApi,
}

impl SchemaStyle {
    /// Returns the `$ref` value for a schema identifier in this style.
    #[must_use]
    fn reference(self, id: &str) -> String {
        match self {
            Self::Discovery => id.to_string(),
            Self::OpenApi => format!("#/definitions/{id}"),
        }
    }
}

// ============================================================================
// SECTION: Identifiers
// ============================================================================

/// Derives the deterministic schema identifier for a qualified type name.
///
/// Each dot-separated segment has its first letter upper-cased and the
/// segments are concatenated: `DemoApi.items.Entry` becomes
/// `DemoApiItemsEntry`.
#[must_use]
pub fn schema_id(qualified_name: &str) -> String {
    qualified_name
        .split('.')
        .map(|segment| {
            let mut chars = segment.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + chars.as_str()
            })
        })
        .collect()
}

/// Maps a scalar field variant to its `(type, format)` pair.
///
/// Returns `None` for `Message`, `Enum`, and `DateTime` variants, which
/// need type resolution or decomposition rather than a plain pair.
#[must_use]
pub const fn scalar_param_type(variant: FieldVariant) -> Option<(&'static str, Option<&'static str>)> {
    match variant {
        FieldVariant::Bool => Some(("boolean", None)),
        FieldVariant::Bytes => Some(("string", Some("byte"))),
        FieldVariant::Double => Some(("number", Some("double"))),
        FieldVariant::Float => Some(("number", Some("float"))),
        FieldVariant::Int32 | FieldVariant::Sint32 => Some(("integer", Some("int32"))),
        FieldVariant::Uint32 => Some(("integer", Some("uint32"))),
        FieldVariant::Int64 | FieldVariant::Sint64 => Some(("string", Some("int64"))),
        FieldVariant::Uint64 => Some(("string", Some("uint64"))),
        FieldVariant::String => Some(("string", None)),
        FieldVariant::Message | FieldVariant::Enum | FieldVariant::DateTime => None,
    }
}

// ============================================================================
// SECTION: Schema Graph
// ============================================================================

/// One generation run's schema state: memo table plus definitions.
///
/// # Invariants
/// - The memo table is exclusive to this instance; concurrent generation
///   calls each construct their own graph and never interfere.
#[derive(Debug)]
pub struct SchemaGraph<'a> {
    /// Reflection source for type resolution.
    registry: &'a TypeRegistry,
    /// Output styling.
    style: SchemaStyle,
    /// Memo table: qualified type name to assigned schema identifier.
    ids: BTreeMap<String, String>,
    /// Accumulated definitions keyed by schema identifier.
    definitions: BTreeMap<String, Value>,
}

impl<'a> SchemaGraph<'a> {
    /// Creates an empty graph over the given registry.
    #[must_use]
    pub fn new(registry: &'a TypeRegistry, style: SchemaStyle) -> Self {
        Self {
            registry,
            style,
            ids: BTreeMap::new(),
            definitions: BTreeMap::new(),
        }
    }

    /// Adds a message type and everything reachable from it, returning its
    /// schema identifier. Revisits return the memoized identifier without
    /// rebuilding.
    ///
    /// # Errors
    /// Returns [`SchemaError`] when the graph references unknown types or
    /// carries inconsistent field descriptors.
    pub fn add_message(&mut self, qualified_name: &str) -> Result<String, SchemaError> {
        if let Some(id) = self.ids.get(qualified_name) {
            return Ok(id.clone());
        }
        let message = self
            .registry
            .message(qualified_name)
            .ok_or_else(|| SchemaError::UnknownType(qualified_name.to_string()))?
            .clone();

        // Reserve the identifier before visiting fields so self-references
        // resolve instead of recursing.
        let id = schema_id(qualified_name);
        self.ids.insert(qualified_name.to_string(), id.clone());

        let mut properties = Map::new();
        let mut required: Vec<String> = Vec::new();
        for field in &message.fields {
            let mut property = self.field_schema(field)?;
            if field.required {
                match self.style {
                    SchemaStyle::Discovery => {
                        if let Value::Object(map) = &mut property {
                            map.insert("required".to_string(), Value::Bool(true));
                        }
                    }
                    SchemaStyle::OpenApi => required.push(field.name.clone()),
                }
            }
            properties.insert(field.name.clone(), property);
        }

        let mut definition = Map::new();
        if self.style == SchemaStyle::Discovery {
            definition.insert("id".to_string(), Value::String(id.clone()));
            if let Some(description) = &message.description {
                definition.insert("description".to_string(), Value::String(description.clone()));
            }
        }
        definition.insert("type".to_string(), Value::String("object".to_string()));
        if !properties.is_empty() {
            definition.insert("properties".to_string(), Value::Object(properties));
        }
        if !required.is_empty() {
            required.sort();
            definition.insert("required".to_string(), json!(required));
        }
        self.definitions.insert(id.clone(), Value::Object(definition));
        Ok(id)
    }

    /// Returns the accumulated definitions map.
    #[must_use]
    pub const fn definitions(&self) -> &BTreeMap<String, Value> {
        &self.definitions
    }

    /// Consumes the graph and returns the definitions map.
    #[must_use]
    pub fn into_definitions(self) -> BTreeMap<String, Value> {
        self.definitions
    }

    /// True when no definitions were produced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Builds the schema for one field, wrapping repeated fields in an
    /// array and resolving message/enum references.
    fn field_schema(&mut self, field: &FieldDescriptor) -> Result<Value, SchemaError> {
        let item = self.item_schema(field)?;
        if !field.repeated {
            return Ok(item);
        }
        // Array wrappers carry the nested description; the item keeps only
        // its structural keys.
        match item {
            Value::Object(mut item_map) => {
                let description = item_map.remove("description");
                let mut wrapper = Map::new();
                if let Some(description) = description {
                    wrapper.insert("description".to_string(), description);
                }
                wrapper.insert("items".to_string(), Value::Object(item_map));
                wrapper.insert("type".to_string(), Value::String("array".to_string()));
                Ok(Value::Object(wrapper))
            }
            other => Ok(json!({ "type": "array", "items": other })),
        }
    }

    /// Builds the single-item schema for a field variant.
    fn item_schema(&mut self, field: &FieldDescriptor) -> Result<Value, SchemaError> {
        match field.variant {
            FieldVariant::Message => {
                let target = field
                    .type_ref
                    .as_deref()
                    .ok_or_else(|| SchemaError::MissingTypeRef(field.name.clone()))?;
                let nested_description = self
                    .registry
                    .message(target)
                    .ok_or_else(|| SchemaError::UnknownType(target.to_string()))?
                    .description
                    .clone();
                let id = self.add_message(target)?;
                let mut map = Map::new();
                map.insert("$ref".to_string(), Value::String(self.style.reference(&id)));
                if let Some(description) = nested_description {
                    map.insert("description".to_string(), Value::String(description));
                }
                Ok(Value::Object(map))
            }
            FieldVariant::Enum => {
                let target = field
                    .type_ref
                    .as_deref()
                    .ok_or_else(|| SchemaError::MissingTypeRef(field.name.clone()))?;
                let entry = self
                    .registry
                    .enumeration(target)
                    .ok_or_else(|| SchemaError::WrongKind(target.to_string()))?;
                Ok(enum_schema(entry, self.style))
            }
            FieldVariant::DateTime => Ok(json!({ "type": "string", "format": "date-time" })),
            _ => {
                let (kind, format) = scalar_param_type(field.variant)
                    .ok_or_else(|| SchemaError::MissingTypeRef(field.name.clone()))?;
                let mut map = Map::new();
                map.insert("type".to_string(), Value::String(kind.to_string()));
                if let Some(format) = format {
                    map.insert("format".to_string(), Value::String(format.to_string()));
                }
                Ok(Value::Object(map))
            }
        }
    }
}

/// Builds the inline schema for an enum type.
fn enum_schema(entry: &EnumType, style: SchemaStyle) -> Value {
    let symbols: Vec<Value> =
        entry.values.iter().map(|value| Value::String(value.name.clone())).collect();
    let mut map = Map::new();
    map.insert("type".to_string(), Value::String("string".to_string()));
    map.insert("enum".to_string(), Value::Array(symbols));
    if style == SchemaStyle::Discovery {
        let descriptions: Vec<Value> = entry
            .values
            .iter()
            .map(|value| Value::String(value.description.clone().unwrap_or_default()))
            .collect();
        map.insert("enumDescriptions".to_string(), Value::Array(descriptions));
    }
    Value::Object(map)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

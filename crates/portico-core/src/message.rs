// crates/portico-core/src/message.rs
// ============================================================================
// Module: Message Reflection Model
// Description: Read-only reflection over strongly-typed message formats.
// Purpose: Give the schema builder a stable view of fields, types, and enums.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The reflection model describes message formats the way a wire-format
//! compiler would: named messages with ordered, numbered fields, plus named
//! enums. Messages refer to other messages and enums by qualified name
//! through a [`TypeRegistry`] rather than by pointer, so recursive and
//! mutually-recursive graphs are plain data.
//!
//! ## Invariants
//! - Field order is declaration order and is preserved verbatim.
//! - Type references are qualified names; dangling references surface when
//!   the schema builder walks the graph, not at construction time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::ConfigurationError;

// ============================================================================
// SECTION: Field Variants
// ============================================================================

/// Wire variant of a message field.
///
/// # Invariants
/// - The set is closed; the schema builder's variant table is exhaustive
///   over it and any new variant must extend that table explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldVariant {
    /// Boolean value.
    Bool,
    /// Raw byte string.
    Bytes,
    /// 64-bit floating point.
    Double,
    /// Enumerated value; requires a type reference.
    Enum,
    /// 32-bit floating point.
    Float,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// UTF-8 string.
    String,
    /// Unsigned 32-bit integer.
    Uint32,
    /// Unsigned 64-bit integer.
    Uint64,
    /// ZigZag-encoded signed 32-bit integer.
    Sint32,
    /// ZigZag-encoded signed 64-bit integer.
    Sint64,
    /// Nested message; requires a type reference.
    Message,
    /// Timestamp with millisecond precision and zone offset.
    DateTime,
}

impl FieldVariant {
    /// Returns true when the variant requires a referenced type.
    #[must_use]
    pub const fn needs_type_ref(self) -> bool {
        matches!(self, Self::Enum | Self::Message)
    }
}

// ============================================================================
// SECTION: Field Descriptors
// ============================================================================

/// One field of a message type.
///
/// # Invariants
/// - `type_ref` is `Some` for `Enum` and `Message` variants.
/// - `number` is unique within the owning message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name as it appears on the wire and in documents.
    pub name: String,
    /// Wire number.
    pub number: u32,
    /// Wire variant.
    pub variant: FieldVariant,
    /// True for repeated fields.
    pub repeated: bool,
    /// True for required fields.
    pub required: bool,
    /// Declared default value, when any.
    pub default: Option<Value>,
    /// Qualified name of the referenced message or enum type.
    pub type_ref: Option<String>,
}

impl FieldDescriptor {
    /// Creates a scalar (non-referencing) field.
    #[must_use]
    pub fn scalar(name: &str, number: u32, variant: FieldVariant) -> Self {
        Self {
            name: name.to_string(),
            number,
            variant,
            repeated: false,
            required: false,
            default: None,
            type_ref: None,
        }
    }

    /// Creates a message-typed field referring to `type_name`.
    #[must_use]
    pub fn message(name: &str, number: u32, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            number,
            variant: FieldVariant::Message,
            repeated: false,
            required: false,
            default: None,
            type_ref: Some(type_name.to_string()),
        }
    }

    /// Creates an enum-typed field referring to `type_name`.
    #[must_use]
    pub fn enumeration(name: &str, number: u32, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            number,
            variant: FieldVariant::Enum,
            repeated: false,
            required: false,
            default: None,
            type_ref: Some(type_name.to_string()),
        }
    }

    /// Marks the field repeated.
    #[must_use]
    pub const fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    /// Marks the field required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Attaches a declared default value.
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

// ============================================================================
// SECTION: Message and Enum Types
// ============================================================================

/// A named message type with ordered fields.
///
/// # Invariants
/// - `name` is the qualified name (`Package.Name` convention) and is the
///   identity key in a [`TypeRegistry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageType {
    /// Qualified type name.
    pub name: String,
    /// Human-readable description carried into generated schemas.
    pub description: Option<String>,
    /// Ordered field list.
    pub fields: Vec<FieldDescriptor>,
}

impl MessageType {
    /// Creates an empty message type.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            fields: Vec::new(),
        }
    }

    /// Attaches a description.
    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Replaces the field list.
    #[must_use]
    pub fn with_fields(mut self, fields: Vec<FieldDescriptor>) -> Self {
        self.fields = fields;
        self
    }
}

/// One symbolic value of an enum type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    /// Symbolic name.
    pub name: String,
    /// Integer value.
    pub number: i32,
    /// Per-value description, when any.
    pub description: Option<String>,
}

impl EnumValue {
    /// Creates a value without a description.
    #[must_use]
    pub fn new(name: &str, number: i32) -> Self {
        Self {
            name: name.to_string(),
            number,
            description: None,
        }
    }
}

/// A named enumeration type.
///
/// # Invariants
/// - `name` is the qualified name and is the identity key in a
///   [`TypeRegistry`].
/// - Value order is declaration order and is preserved in generated schemas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumType {
    /// Qualified type name.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Ordered symbolic values.
    pub values: Vec<EnumValue>,
}

impl EnumType {
    /// Creates an enum type from its values.
    #[must_use]
    pub fn new(name: &str, values: Vec<EnumValue>) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            values,
        }
    }
}

// ============================================================================
// SECTION: Type Registry
// ============================================================================

/// Store of message and enum types keyed by qualified name.
///
/// # Invariants
/// - Names are unique across messages and enums.
/// - The registry is write-once per name; re-registration fails loudly.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    /// Message types keyed by qualified name.
    messages: BTreeMap<String, MessageType>,
    /// Enum types keyed by qualified name.
    enums: BTreeMap<String, EnumType>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a message type.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::DuplicateType`] when the name is taken.
    pub fn add_message(&mut self, message: MessageType) -> Result<(), ConfigurationError> {
        if self.messages.contains_key(&message.name) || self.enums.contains_key(&message.name) {
            return Err(ConfigurationError::DuplicateType(message.name));
        }
        self.messages.insert(message.name.clone(), message);
        Ok(())
    }

    /// Registers an enum type.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::DuplicateType`] when the name is taken.
    pub fn add_enum(&mut self, entry: EnumType) -> Result<(), ConfigurationError> {
        if self.messages.contains_key(&entry.name) || self.enums.contains_key(&entry.name) {
            return Err(ConfigurationError::DuplicateType(entry.name));
        }
        self.enums.insert(entry.name.clone(), entry);
        Ok(())
    }

    /// Looks a message type up by qualified name.
    #[must_use]
    pub fn message(&self, name: &str) -> Option<&MessageType> {
        self.messages.get(name)
    }

    /// Looks an enum type up by qualified name.
    #[must_use]
    pub fn enumeration(&self, name: &str) -> Option<&EnumType> {
        self.enums.get(name)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

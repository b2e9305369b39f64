// crates/portico-core/src/lib.rs
// ============================================================================
// Module: Portico Core Library
// Description: Public API surface for the Portico core model.
// Purpose: Expose the message reflection model, API descriptors, and errors.
// Dependencies: crate::{descriptor, error, message}
// ============================================================================

//! ## Overview
//! Portico core holds the data model shared by the description generators,
//! the config registry, and the token verification engine: a read-only
//! reflection model over strongly-typed message formats, and descriptors for
//! APIs, methods, and their auth requirements. The model is plain data; all
//! behavior lives in the downstream crates.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod descriptor;
pub mod error;
pub mod message;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use descriptor::ApiDescriptor;
pub use descriptor::ApiNamespace;
pub use descriptor::Audiences;
pub use descriptor::AuthLevel;
pub use descriptor::DEFAULT_BASE_PATH;
pub use descriptor::DEFAULT_ISSUER_NAME;
pub use descriptor::EMAIL_SCOPE;
pub use descriptor::Issuer;
pub use descriptor::LimitDefinition;
pub use descriptor::MethodDescriptor;
pub use descriptor::OAuth2Scope;
pub use descriptor::RequestSpec;
pub use descriptor::ResourceContainer;
pub use descriptor::ResponseSpec;
pub use descriptor::ServiceDescriptor;
pub use error::ConfigurationError;
pub use message::EnumType;
pub use message::EnumValue;
pub use message::FieldDescriptor;
pub use message::FieldVariant;
pub use message::MessageType;
pub use message::TypeRegistry;

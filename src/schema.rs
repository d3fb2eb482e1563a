//! Schema nodes and the shared components table.
//!
//! A [`Schema`] is either a `$ref` node pointing into the components table or a
//! fully inlined node; never both. The [`ComponentsTable`] is the per-run
//! registry of named schemas. Registration is idempotent for identical shapes
//! and rejects a structurally different shape under an existing name.

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::error::{Error, Result};

/// Prefix of every schema reference emitted by this crate.
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// OpenAPI Schema definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Schema {
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Properties for object types, in declaration order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,
    /// Required property names for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Enum values for enumerated types
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Whether null is an accepted value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    /// Reference to a named schema in the components table
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Format for primitive types (e.g., "int32", "int64", "float", "double")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl Schema {
    /// A scalar schema with the given OpenAPI type
    pub fn primitive(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Self::default()
        }
    }

    /// A scalar schema with an explicit format qualifier
    pub fn primitive_with_format(schema_type: &str, format: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            format: Some(format.to_string()),
            ..Self::default()
        }
    }

    /// An array schema with the given items schema
    pub fn array(items: Schema) -> Self {
        Self {
            schema_type: Some("array".to_string()),
            items: Some(Box::new(items)),
            ..Self::default()
        }
    }

    /// An object schema with named properties
    pub fn object(properties: IndexMap<String, Schema>, required: Vec<String>) -> Self {
        Self {
            schema_type: Some("object".to_string()),
            properties: Some(properties),
            required: if required.is_empty() {
                None
            } else {
                Some(required)
            },
            ..Self::default()
        }
    }

    /// An untyped placeholder for types that cannot be resolved
    pub fn untyped() -> Self {
        Self::default()
    }

    /// A `$ref` node pointing at a named component schema.
    ///
    /// All other fields stay unset; a node is either a reference or an
    /// inlined definition.
    pub fn reference(name: &str) -> Self {
        Self {
            reference: Some(format!("{}{}", SCHEMA_REF_PREFIX, name)),
            ..Self::default()
        }
    }

    /// Whether this node is a `$ref` node
    pub fn is_ref(&self) -> bool {
        self.reference.is_some()
    }

    /// The component name a `$ref` node points at, if any
    pub fn ref_name(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .and_then(|r| r.strip_prefix(SCHEMA_REF_PREFIX))
    }

    /// Mark the schema as nullable
    pub fn nullable(mut self) -> Self {
        self.nullable = Some(true);
        self
    }

    /// Attach enum values to a scalar schema
    pub fn with_enum(mut self, values: Vec<String>) -> Self {
        self.enum_values = Some(values);
        self
    }
}

/// Per-run registry of named schemas.
///
/// Insertion order is preserved so the emitted `components.schemas` section is
/// deterministic across runs. Extractors hold the table behind a shared
/// reference, so insertion goes through interior mutability.
#[derive(Debug, Default)]
pub struct ComponentsTable {
    schemas: Mutex<IndexMap<String, Schema>>,
}

impl ComponentsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `schema` under `name` and returns a `$ref` node pointing at it.
    ///
    /// Registering the same shape twice is a no-op; a structurally different
    /// shape under an existing name is a [`Error::SchemaConflict`].
    pub fn register(&self, name: &str, schema: Schema) -> Result<Schema> {
        let mut schemas = self.schemas.lock().expect("components table poisoned");
        match schemas.get(name) {
            Some(existing) if *existing == schema => {
                debug!("Schema for {} already registered", name);
            }
            Some(_) => {
                return Err(Error::SchemaConflict {
                    name: name.to_string(),
                });
            }
            None => {
                debug!("Registering component schema: {}", name);
                schemas.insert(name.to_string(), schema);
            }
        }
        Ok(Schema::reference(name))
    }

    /// Whether a schema is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.schemas
            .lock()
            .expect("components table poisoned")
            .contains_key(name)
    }

    /// Number of registered schemas
    pub fn len(&self) -> usize {
        self.schemas.lock().expect("components table poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of all registered schemas, in registration order
    pub fn snapshot(&self) -> IndexMap<String, Schema> {
        self.schemas
            .lock()
            .expect("components table poisoned")
            .clone()
    }
}

/// Resolves one level of `$ref` indirection against a components map.
///
/// A `$ref` schema resolves to the referenced definition; anything else is
/// returned unchanged. Stored definitions are fully inlined at registration
/// time, so chains of references do not occur.
pub fn resolve_ref<'a>(schema: &'a Schema, components: &'a IndexMap<String, Schema>) -> &'a Schema {
    match schema.ref_name().and_then(|name| components.get(name)) {
        Some(definition) => definition,
        None => schema,
    }
}

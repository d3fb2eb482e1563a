//! Schema resolution engine.
//!
//! Turns reflective type declarations and doc-comment annotations into
//! [`Schema`] nodes and maintains the shared components table. Named entities
//! are registered once and referenced via `$ref` everywhere they are used, so
//! the emitted document grows with the number of distinct entities rather than
//! the number of usage sites.
//!
//! Property types resolve in precedence order: an explicit `@var` annotation
//! wins over the declared type, which wins over an untyped fallback. The
//! annotation pseudo-syntax (`@var`, `@required`, `@enum {a, b, c}`) is a
//! small micro-grammar; anything unparseable counts as "no annotation".

use crate::error::Result;
use crate::schema::{ComponentsTable, Schema};
use crate::type_resolver::{FieldDef, PrimitiveType, TypeInfo, TypeKind, TypeResolver};
use indexmap::IndexMap;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Mutex;

static VAR_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@var\s+(\S+)").unwrap());
static REQUIRED_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@required\b").unwrap());
static ENUM_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@enum\s*\{([^}]*)\}").unwrap());

/// Annotations parsed from one field's doc comment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldAnnotations {
    /// Explicit type from `@var`
    pub var_type: Option<String>,
    /// Whether `@required` was present
    pub required: bool,
    /// Values from `@enum {a, b, c}`
    pub enum_values: Option<Vec<String>>,
}

/// Parses the annotation micro-grammar from doc-comment lines.
///
/// Lines that fail to parse are treated as ordinary prose, never as errors.
pub fn parse_annotations(docs: &[String]) -> FieldAnnotations {
    let mut annotations = FieldAnnotations::default();
    for line in docs {
        let line = line.trim();
        if let Some(captures) = VAR_REGEX.captures(line) {
            annotations.var_type = Some(captures[1].to_string());
        } else if REQUIRED_REGEX.is_match(line) {
            annotations.required = true;
        } else if let Some(captures) = ENUM_REGEX.captures(line) {
            let values: Vec<String> = captures[1]
                .split(',')
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
            if !values.is_empty() {
                annotations.enum_values = Some(values);
            }
        }
    }
    annotations
}

/// Schema engine - converts resolved types into schema nodes and registers
/// named entities in the components table.
pub struct SchemaEngine {
    /// Type resolver for looking up declarations
    resolver: TypeResolver,
    /// Shared components table for the run
    components: ComponentsTable,
    /// Names whose inline definition is currently being built; a nested use
    /// of such a name short-circuits to a `$ref` to break cycles
    in_progress: Mutex<HashSet<String>>,
}

impl SchemaEngine {
    pub fn new(resolver: TypeResolver) -> Self {
        debug!("Initializing SchemaEngine");
        Self {
            resolver,
            components: ComponentsTable::new(),
            in_progress: Mutex::new(HashSet::new()),
        }
    }

    /// The components table accumulated so far
    pub fn components(&self) -> &ComponentsTable {
        &self.components
    }

    /// The underlying type resolver
    pub fn resolver(&self) -> &TypeResolver {
        &self.resolver
    }

    /// Generate a schema for a declared type.
    ///
    /// Named entities come back as `$ref` nodes; primitives and containers are
    /// inlined. `Option<T>` produces T's schema marked nullable.
    pub fn schema_for(&self, type_info: &TypeInfo) -> Result<Schema> {
        if type_info.is_option {
            if let Some(inner) = type_info.generic_args.first() {
                return Ok(self.schema_for(inner)?.nullable());
            }
        }

        if type_info.is_vec {
            if let Some(inner) = type_info.generic_args.first() {
                return Ok(Schema::array(self.schema_for(inner)?));
            }
        }

        self.schema_for_name(&type_info.name)
    }

    /// Generate a schema for a type name.
    pub fn schema_for_name(&self, name: &str) -> Result<Schema> {
        match self.resolver.resolve_type(name) {
            Some(resolved) => match resolved.kind {
                TypeKind::Primitive(primitive) => Ok(primitive_schema(primitive)),
                TypeKind::Struct(_) | TypeKind::Enum(_) => self.reference_for_entity(name),
            },
            None => {
                debug!("Unknown type: {}, using untyped placeholder", name);
                Ok(Schema::untyped())
            }
        }
    }

    /// Registers the named entity (once) and returns a `$ref` node to it.
    fn reference_for_entity(&self, name: &str) -> Result<Schema> {
        if self.components.contains(name) {
            return Ok(Schema::reference(name));
        }

        {
            let mut in_progress = self.in_progress.lock().expect("in-progress set poisoned");
            if !in_progress.insert(name.to_string()) {
                // Already being built further up the stack
                return Ok(Schema::reference(name));
            }
        }

        let definition = self.build_entity_schema(name);
        self.in_progress
            .lock()
            .expect("in-progress set poisoned")
            .remove(name);

        self.components.register(name, definition?)
    }

    /// Builds the inline definition for a named struct or enum.
    fn build_entity_schema(&self, name: &str) -> Result<Schema> {
        let resolved = match self.resolver.resolve_type(name) {
            Some(resolved) => resolved,
            None => return Ok(Schema::untyped()),
        };

        match resolved.kind {
            TypeKind::Struct(struct_def) => {
                let mut properties = IndexMap::new();
                let mut required = Vec::new();

                for field in &struct_def.fields {
                    let annotations = parse_annotations(&field.docs);
                    let schema = self.field_schema(field, &annotations)?;
                    if field_is_required(field, &annotations) {
                        required.push(field.name.clone());
                    }
                    properties.insert(field.name.clone(), schema);
                }

                Ok(Schema::object(properties, required))
            }
            TypeKind::Enum(enum_def) => {
                Ok(Schema::primitive("string").with_enum(enum_def.variants))
            }
            TypeKind::Primitive(primitive) => Ok(primitive_schema(primitive)),
        }
    }

    /// Schema for one struct field, honoring the resolution precedence.
    fn field_schema(&self, field: &FieldDef, annotations: &FieldAnnotations) -> Result<Schema> {
        let mut schema = match annotations.var_type.as_deref() {
            Some(var_type) => match self.schema_for_annotation_type(var_type)? {
                Some(schema) => schema,
                // Unresolvable @var falls back to the declared type
                None => self.schema_for(&field.type_info)?,
            },
            None => self.schema_for(&field.type_info)?,
        };

        if let Some(values) = &annotations.enum_values {
            // Enum values only attach to inline scalar nodes
            if !schema.is_ref() {
                schema = schema.with_enum(values.clone());
            }
        }

        Ok(schema)
    }

    /// Maps an `@var` annotation type to a schema, if the name is recognized
    /// as a scalar alias or a resolvable entity.
    fn schema_for_annotation_type(&self, var_type: &str) -> Result<Option<Schema>> {
        let (base, is_array) = match var_type.strip_suffix("[]") {
            Some(base) => (base, true),
            None => (var_type, false),
        };

        let schema = match base {
            "string" => Some(Schema::primitive("string")),
            "int" | "integer" => Some(Schema::primitive("integer")),
            "float" | "double" | "number" => Some(Schema::primitive("number")),
            "bool" | "boolean" => Some(Schema::primitive("boolean")),
            "mixed" | "object" => Some(Schema::untyped()),
            other => match self.resolver.resolve_type(other) {
                Some(_) => Some(self.schema_for_name(other)?),
                None => None,
            },
        };

        Ok(schema.map(|s| if is_array { Schema::array(s) } else { s }))
    }
}

/// A property is required when annotated explicitly, or when its declared
/// type is neither optional nor defaulted.
fn field_is_required(field: &FieldDef, annotations: &FieldAnnotations) -> bool {
    annotations.required || (!field.optional && !field.has_default)
}

/// Convert a primitive type to a scalar schema
fn primitive_schema(primitive: PrimitiveType) -> Schema {
    match primitive {
        PrimitiveType::String | PrimitiveType::Char => Schema::primitive("string"),
        PrimitiveType::I8
        | PrimitiveType::I16
        | PrimitiveType::I32
        | PrimitiveType::U8
        | PrimitiveType::U16
        | PrimitiveType::U32 => Schema::primitive_with_format("integer", "int32"),
        PrimitiveType::I64 | PrimitiveType::I128 | PrimitiveType::U64 | PrimitiveType::U128 => {
            Schema::primitive_with_format("integer", "int64")
        }
        PrimitiveType::F32 => Schema::primitive_with_format("number", "float"),
        PrimitiveType::F64 => Schema::primitive_with_format("number", "double"),
        PrimitiveType::Bool => Schema::primitive("boolean"),
    }
}

//! Reflective type lookup over the parsed source files.
//!
//! The resolver answers two questions for the rest of the pipeline: "what is
//! the declaration behind this type name" (struct, enum, primitive) and "where
//! is the handler function with this name". Results are cached per run; the
//! resolver is handed out behind a shared reference, so the cache uses
//! interior mutability.

use crate::parser::ParsedFile;
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Type information extracted from a syntax tree.
///
/// Captures the parts of a declared type the schema engine needs: the base
/// name, generic arguments, and whether the type is wrapped in `Option<T>`
/// or is a `Vec<T>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    /// The base type name (e.g., "String", "User", "i32")
    pub name: String,
    /// Generic type arguments
    pub generic_args: Vec<TypeInfo>,
    /// Whether this type is wrapped in `Option<T>`
    pub is_option: bool,
    /// Whether this type is a `Vec<T>` (array type)
    pub is_vec: bool,
}

impl TypeInfo {
    /// Create a new TypeInfo for a simple type
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            generic_args: Vec::new(),
            is_option: false,
            is_vec: false,
        }
    }

    /// Create a TypeInfo for an `Option<T>` type
    pub fn option(inner: TypeInfo) -> Self {
        Self {
            name: inner.name.clone(),
            generic_args: vec![inner],
            is_option: true,
            is_vec: false,
        }
    }

    /// Create a TypeInfo for a `Vec<T>` type
    pub fn vec(inner: TypeInfo) -> Self {
        Self {
            name: inner.name.clone(),
            generic_args: vec![inner],
            is_option: false,
            is_vec: true,
        }
    }

    /// Extract TypeInfo from a `syn::Type`
    pub fn from_type(ty: &syn::Type) -> TypeInfo {
        match ty {
            syn::Type::Path(type_path) => Self::from_path(&type_path.path),
            syn::Type::Reference(reference) => Self::from_type(&reference.elem),
            _ => TypeInfo::new("Unknown"),
        }
    }

    /// Extract TypeInfo from a `syn::Path`
    pub fn from_path(path: &syn::Path) -> TypeInfo {
        let Some(segment) = path.segments.last() else {
            return TypeInfo::new("Unknown");
        };
        let type_name = segment.ident.to_string();

        if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
            let generic_args: Vec<TypeInfo> = args
                .args
                .iter()
                .filter_map(|arg| match arg {
                    syn::GenericArgument::Type(inner) => Some(Self::from_type(inner)),
                    _ => None,
                })
                .collect();

            match type_name.as_str() {
                "Option" if !generic_args.is_empty() => {
                    return TypeInfo::option(generic_args.into_iter().next().unwrap());
                }
                "Vec" if !generic_args.is_empty() => {
                    return TypeInfo::vec(generic_args.into_iter().next().unwrap());
                }
                _ => {
                    return TypeInfo {
                        name: type_name,
                        generic_args,
                        is_option: false,
                        is_vec: false,
                    };
                }
            }
        }

        TypeInfo::new(&type_name)
    }
}

/// Resolved type information
#[derive(Debug, Clone)]
pub struct ResolvedType {
    /// The type name
    pub name: String,
    /// The kind of type (struct, enum, primitive)
    pub kind: TypeKind,
}

/// Type kind - represents different categories of types
#[derive(Debug, Clone)]
pub enum TypeKind {
    /// A struct type with fields
    Struct(StructDef),
    /// An enum type with variants
    Enum(EnumDef),
    /// A primitive type (String, i32, etc.)
    Primitive(PrimitiveType),
}

/// Struct definition with fields
#[derive(Debug, Clone)]
pub struct StructDef {
    /// The fields of the struct, in declaration order
    pub fields: Vec<FieldDef>,
}

/// Field definition in a struct
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Type information for the field
    pub type_info: TypeInfo,
    /// Whether the field is optional (wrapped in `Option<T>`)
    pub optional: bool,
    /// Whether the field carries a default value (`#[serde(default)]`)
    pub has_default: bool,
    /// Doc-comment lines attached to the field
    pub docs: Vec<String>,
}

/// Enum definition with variants
#[derive(Debug, Clone)]
pub struct EnumDef {
    /// The variants of the enum
    pub variants: Vec<String>,
}

/// Primitive types supported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    String,
    I8,
    I16,
    I32,
    I64,
    I128,
    U8,
    U16,
    U32,
    U64,
    U128,
    F32,
    F64,
    Bool,
    Char,
}

/// A handler function body resolved from the parsed sources.
///
/// Free functions and `impl`-block methods are both flattened into this
/// shape; it is the AST node carried by an analysis context.
#[derive(Debug, Clone)]
pub struct HandlerFn {
    /// The function signature
    pub signature: syn::Signature,
    /// The function body
    pub block: syn::Block,
    /// Doc-comment lines attached to the function
    pub docs: Vec<String>,
}

/// Type resolver - looks up declarations across all parsed files
pub struct TypeResolver {
    /// All parsed files contributing declarations
    parsed_files: Vec<Arc<ParsedFile>>,
    /// Cache of resolved types; lookups take `&self`, so the cache sits
    /// behind a mutex
    type_cache: Mutex<HashMap<String, Option<ResolvedType>>>,
}

impl TypeResolver {
    /// Create a new TypeResolver over parsed files
    pub fn new(parsed_files: Vec<Arc<ParsedFile>>) -> Self {
        debug!("Initializing TypeResolver with {} files", parsed_files.len());
        Self {
            parsed_files,
            type_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a type by name
    pub fn resolve_type(&self, type_name: &str) -> Option<ResolvedType> {
        if let Some(cached) = self
            .type_cache
            .lock()
            .expect("type cache poisoned")
            .get(type_name)
        {
            return cached.clone();
        }

        let resolved = self.resolve_uncached(type_name);
        self.type_cache
            .lock()
            .expect("type cache poisoned")
            .insert(type_name.to_string(), resolved.clone());
        resolved
    }

    fn resolve_uncached(&self, type_name: &str) -> Option<ResolvedType> {
        debug!("Resolving type: {}", type_name);

        if let Some(primitive) = Self::parse_primitive_type(type_name) {
            return Some(ResolvedType {
                name: type_name.to_string(),
                kind: TypeKind::Primitive(primitive),
            });
        }

        if let Some(item_struct) = self.find_struct_definition(type_name) {
            return Some(Self::parse_struct_definition(item_struct));
        }

        if let Some(item_enum) = self.find_enum_definition(type_name) {
            return Some(Self::parse_enum_definition(item_enum));
        }

        debug!("Could not resolve type: {}", type_name);
        None
    }

    /// Find a struct definition by name across all parsed files
    pub fn find_struct_definition(&self, name: &str) -> Option<&syn::ItemStruct> {
        for parsed_file in &self.parsed_files {
            for item in &parsed_file.syntax_tree.items {
                if let syn::Item::Struct(item_struct) = item {
                    if item_struct.ident == name {
                        return Some(item_struct);
                    }
                }
            }
        }
        None
    }

    /// Find an enum definition by name across all parsed files
    pub fn find_enum_definition(&self, name: &str) -> Option<&syn::ItemEnum> {
        for parsed_file in &self.parsed_files {
            for item in &parsed_file.syntax_tree.items {
                if let syn::Item::Enum(item_enum) = item {
                    if item_enum.ident == name {
                        return Some(item_enum);
                    }
                }
            }
        }
        None
    }

    /// Find a handler function by name, searching free functions and
    /// `impl`-block methods in every parsed file.
    ///
    /// Returns the flattened handler body and the file it was found in.
    pub fn find_handler(&self, name: &str) -> Option<(HandlerFn, Arc<ParsedFile>)> {
        for parsed_file in &self.parsed_files {
            for item in &parsed_file.syntax_tree.items {
                match item {
                    syn::Item::Fn(item_fn) if item_fn.sig.ident == name => {
                        let handler = HandlerFn {
                            signature: item_fn.sig.clone(),
                            block: (*item_fn.block).clone(),
                            docs: extract_doc_lines(&item_fn.attrs),
                        };
                        return Some((handler, Arc::clone(parsed_file)));
                    }
                    syn::Item::Impl(item_impl) => {
                        for impl_item in &item_impl.items {
                            if let syn::ImplItem::Fn(method) = impl_item {
                                if method.sig.ident == name {
                                    let handler = HandlerFn {
                                        signature: method.sig.clone(),
                                        block: method.block.clone(),
                                        docs: extract_doc_lines(&method.attrs),
                                    };
                                    return Some((handler, Arc::clone(parsed_file)));
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        None
    }

    /// Parse a struct definition into a ResolvedType
    fn parse_struct_definition(item_struct: &syn::ItemStruct) -> ResolvedType {
        let struct_name = item_struct.ident.to_string();
        let mut fields = Vec::new();

        if let syn::Fields::Named(named_fields) = &item_struct.fields {
            for field in &named_fields.named {
                if let Some(field_def) = Self::parse_field(field) {
                    fields.push(field_def);
                }
            }
        }

        ResolvedType {
            name: struct_name,
            kind: TypeKind::Struct(StructDef { fields }),
        }
    }

    /// Parse an enum definition into a ResolvedType
    fn parse_enum_definition(item_enum: &syn::ItemEnum) -> ResolvedType {
        let variants: Vec<String> = item_enum
            .variants
            .iter()
            .map(|v| v.ident.to_string())
            .collect();

        ResolvedType {
            name: item_enum.ident.to_string(),
            kind: TypeKind::Enum(EnumDef { variants }),
        }
    }

    /// Parse a single field
    fn parse_field(field: &syn::Field) -> Option<FieldDef> {
        let field_name = field.ident.as_ref()?.to_string();
        let type_info = TypeInfo::from_type(&field.ty);
        let optional = type_info.is_option;

        Some(FieldDef {
            name: field_name,
            optional,
            has_default: has_serde_default(&field.attrs),
            docs: extract_doc_lines(&field.attrs),
            type_info,
        })
    }

    /// Parse a primitive type name
    pub fn parse_primitive_type(type_name: &str) -> Option<PrimitiveType> {
        match type_name {
            "String" | "str" => Some(PrimitiveType::String),
            "i8" => Some(PrimitiveType::I8),
            "i16" => Some(PrimitiveType::I16),
            "i32" => Some(PrimitiveType::I32),
            "i64" => Some(PrimitiveType::I64),
            "i128" => Some(PrimitiveType::I128),
            "u8" => Some(PrimitiveType::U8),
            "u16" => Some(PrimitiveType::U16),
            "u32" => Some(PrimitiveType::U32),
            "u64" => Some(PrimitiveType::U64),
            "u128" => Some(PrimitiveType::U128),
            "f32" => Some(PrimitiveType::F32),
            "f64" => Some(PrimitiveType::F64),
            "bool" => Some(PrimitiveType::Bool),
            "char" => Some(PrimitiveType::Char),
            _ => None,
        }
    }
}

/// Extract doc-comment lines from `#[doc = "..."]` attributes
pub fn extract_doc_lines(attrs: &[syn::Attribute]) -> Vec<String> {
    let mut lines = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        if let syn::Meta::NameValue(name_value) = &attr.meta {
            if let syn::Expr::Lit(expr_lit) = &name_value.value {
                if let syn::Lit::Str(lit_str) = &expr_lit.lit {
                    lines.push(lit_str.value().trim().to_string());
                }
            }
        }
    }
    lines
}

/// Whether the field carries `#[serde(default)]` (with or without a path)
fn has_serde_default(attrs: &[syn::Attribute]) -> bool {
    attrs.iter().any(|attr| {
        if !attr.path().is_ident("serde") {
            return false;
        }
        match attr.meta.require_list() {
            Ok(meta_list) => meta_list.tokens.to_string().contains("default"),
            Err(_) => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AstParser;

    fn create_resolver_from_code(code: &str) -> TypeResolver {
        let parsed = AstParser::parse_source(code).unwrap();
        TypeResolver::new(vec![Arc::new(parsed)])
    }

    #[test]
    fn test_resolve_primitive_types() {
        let resolver = create_resolver_from_code("");

        let primitives = vec![
            ("String", PrimitiveType::String),
            ("i32", PrimitiveType::I32),
            ("u64", PrimitiveType::U64),
            ("f32", PrimitiveType::F32),
            ("bool", PrimitiveType::Bool),
        ];

        for (type_name, expected_primitive) in primitives {
            let resolved = resolver.resolve_type(type_name).unwrap();
            assert_eq!(resolved.name, type_name);

            match resolved.kind {
                TypeKind::Primitive(prim) => assert_eq!(prim, expected_primitive),
                _ => panic!("Expected primitive type for {}", type_name),
            }
        }
    }

    #[test]
    fn test_resolve_simple_struct() {
        let code = r#"
            pub struct User {
                pub id: u32,
                pub name: String,
                pub active: bool,
            }
        "#;

        let resolver = create_resolver_from_code(code);
        let resolved = resolver.resolve_type("User").unwrap();
        assert_eq!(resolved.name, "User");

        let TypeKind::Struct(struct_def) = resolved.kind else {
            panic!("Expected struct type");
        };
        assert_eq!(struct_def.fields.len(), 3);
        assert_eq!(struct_def.fields[0].name, "id");
        assert_eq!(struct_def.fields[1].name, "name");
        assert_eq!(struct_def.fields[2].name, "active");
        assert_eq!(struct_def.fields[0].type_info.name, "u32");
    }

    #[test]
    fn test_resolve_struct_with_option_field() {
        let code = r#"
            pub struct User {
                pub id: u32,
                pub email: Option<String>,
            }
        "#;

        let resolver = create_resolver_from_code(code);
        let resolved = resolver.resolve_type("User").unwrap();

        let TypeKind::Struct(struct_def) = resolved.kind else {
            panic!("Expected struct type");
        };
        let email_field = &struct_def.fields[1];
        assert!(email_field.type_info.is_option);
        assert!(email_field.optional);
        assert_eq!(email_field.type_info.name, "String");
    }

    #[test]
    fn test_resolve_enum() {
        let code = r#"
            pub enum Status {
                Active,
                Inactive,
            }
        "#;

        let resolver = create_resolver_from_code(code);
        let resolved = resolver.resolve_type("Status").unwrap();

        let TypeKind::Enum(enum_def) = resolved.kind else {
            panic!("Expected enum type");
        };
        assert_eq!(enum_def.variants, vec!["Active", "Inactive"]);
    }

    #[test]
    fn test_unknown_type_resolves_to_none() {
        let resolver = create_resolver_from_code("");
        assert!(resolver.resolve_type("Phantom").is_none());
        // Second lookup hits the negative cache
        assert!(resolver.resolve_type("Phantom").is_none());
    }

    #[test]
    fn test_field_docs_and_default_attr() {
        let code = r#"
            pub struct Filter {
                /// @var string
                pub term: String,
                #[serde(default)]
                pub page: u32,
            }
        "#;

        let resolver = create_resolver_from_code(code);
        let resolved = resolver.resolve_type("Filter").unwrap();

        let TypeKind::Struct(struct_def) = resolved.kind else {
            panic!("Expected struct type");
        };
        assert_eq!(struct_def.fields[0].docs, vec!["@var string"]);
        assert!(!struct_def.fields[0].has_default);
        assert!(struct_def.fields[1].has_default);
    }

    #[test]
    fn test_find_free_handler_function() {
        let code = r#"
            pub fn show_user(id: u64) -> User {
                todo!()
            }
        "#;

        let resolver = create_resolver_from_code(code);
        let (handler, _file) = resolver.find_handler("show_user").unwrap();
        assert_eq!(handler.signature.ident, "show_user");
    }

    #[test]
    fn test_find_impl_method_handler() {
        let code = r#"
            pub struct UserController;

            impl UserController {
                /// Returns one user.
                pub fn show(id: u64) -> User {
                    todo!()
                }
            }
        "#;

        let resolver = create_resolver_from_code(code);
        let (handler, _file) = resolver.find_handler("show").unwrap();
        assert_eq!(handler.signature.ident, "show");
        assert_eq!(handler.docs, vec!["Returns one user."]);
    }

    #[test]
    fn test_find_handler_missing() {
        let resolver = create_resolver_from_code("pub fn other() {}");
        assert!(resolver.find_handler("absent").is_none());
    }

    #[test]
    fn test_type_info_from_nested_generics() {
        let ty: syn::Type = syn::parse_str("Option<Vec<User>>").unwrap();
        let info = TypeInfo::from_type(&ty);

        assert!(info.is_option);
        let inner = &info.generic_args[0];
        assert!(inner.is_vec);
        assert_eq!(inner.generic_args[0].name, "User");
    }
}

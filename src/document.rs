//! OpenAPI object model and document assembly.
//!
//! The assembler folds per-route operations into the final document. Paths
//! keep route-registration order and methods within a path follow the fixed
//! field order of [`PathItem`], so two runs over the same route table emit
//! byte-identical documents.

use crate::route::HttpMethod;
use crate::schema::{self, Schema};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

/// OpenAPI Info object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    /// Schema for this media type
    pub schema: Schema,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    /// Content types and their schemas
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI Response object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Parameter location (path, query, header, cookie)
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    pub schema: Schema,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI SecurityScheme object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityScheme {
    #[serde(rename = "type")]
    pub scheme_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(rename = "bearerFormat", skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SecurityScheme {
    /// HTTP bearer-token scheme
    pub fn bearer() -> Self {
        Self {
            scheme_type: "http".to_string(),
            scheme: Some("bearer".to_string()),
            bearer_format: None,
            location: None,
            name: None,
            description: None,
        }
    }

    /// HTTP basic-auth scheme
    pub fn basic() -> Self {
        Self {
            scheme_type: "http".to_string(),
            scheme: Some("basic".to_string()),
            bearer_format: None,
            location: None,
            name: None,
            description: None,
        }
    }

    /// API-key scheme read from a header
    pub fn api_key(header_name: &str) -> Self {
        Self {
            scheme_type: "apiKey".to_string(),
            scheme: None,
            bearer_format: None,
            location: Some("header".to_string()),
            name: Some(header_name.to_string()),
            description: None,
        }
    }
}

/// A security requirement: scheme name to required scopes.
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

/// OpenAPI Operation object - the per-route aggregate every extractor
/// contributes to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code, in extraction order
    pub responses: IndexMap<String, Response>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<SecurityRequirement>>,
}

/// OpenAPI PathItem object.
///
/// The explicit per-method fields give the emitted document its canonical
/// method ordering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
}

impl PathItem {
    /// The slot for an HTTP method
    pub fn slot(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
        }
    }

    /// The operation registered for an HTTP method, if any
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
        }
    }
}

/// OpenAPI Components object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Components {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schemas: Option<IndexMap<String, Schema>>,
    #[serde(rename = "securitySchemes", skip_serializing_if = "Option::is_none")]
    pub security_schemes: Option<IndexMap<String, SecurityScheme>>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    pub info: Info,
    /// Paths in route-registration order
    pub paths: IndexMap<String, PathItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
}

impl OpenApiDocument {
    /// Resolves one level of `$ref` indirection against this document's
    /// components; non-reference schemas come back unchanged.
    pub fn resolve_schema<'a>(&'a self, schema: &'a Schema) -> &'a Schema {
        match self
            .components
            .as_ref()
            .and_then(|c| c.schemas.as_ref())
        {
            Some(schemas) => schema::resolve_ref(schema, schemas),
            None => schema,
        }
    }
}

/// Folds per-route operations into the final document.
pub struct DocumentAssembler {
    info: Info,
    paths: IndexMap<String, PathItem>,
    security_schemes: IndexMap<String, SecurityScheme>,
}

impl DocumentAssembler {
    pub fn new() -> Self {
        Self {
            info: Info {
                title: "Generated API".to_string(),
                version: "1.0.0".to_string(),
                description: Some("API documentation generated from the route table".to_string()),
            },
            paths: IndexMap::new(),
            security_schemes: IndexMap::new(),
        }
    }

    /// Set custom info for the API
    pub fn with_info(mut self, title: &str, version: &str, description: Option<String>) -> Self {
        self.info = Info {
            title: title.to_string(),
            version: version.to_string(),
            description,
        };
        self
    }

    /// Adds one operation under its path and method.
    pub fn add_operation(&mut self, uri: &str, method: HttpMethod, operation: Operation) {
        debug!("Adding operation: {} {}", method.as_str(), uri);
        let path = convert_path_format(uri);
        let item = self.paths.entry(path).or_default();
        *item.slot(method) = Some(operation);
    }

    /// Records a security scheme definition; re-adding the same name keeps
    /// the first definition.
    pub fn add_security_scheme(&mut self, name: &str, scheme: SecurityScheme) {
        self.security_schemes
            .entry(name.to_string())
            .or_insert(scheme);
    }

    /// Build the final document, attaching the accumulated components.
    pub fn build(self, schemas: IndexMap<String, Schema>) -> OpenApiDocument {
        debug!("Building final OpenAPI document");

        let components = if schemas.is_empty() && self.security_schemes.is_empty() {
            None
        } else {
            Some(Components {
                schemas: if schemas.is_empty() {
                    None
                } else {
                    Some(schemas)
                },
                security_schemes: if self.security_schemes.is_empty() {
                    None
                } else {
                    Some(self.security_schemes)
                },
            })
        };

        OpenApiDocument {
            openapi: "3.0.0".to_string(),
            info: self.info,
            paths: self.paths,
            components,
        }
    }
}

impl Default for DocumentAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert legacy `:param` path segments to the OpenAPI `{param}` format
fn convert_path_format(path: &str) -> String {
    path.split('/')
        .map(|part| match part.strip_prefix(':') {
            Some(name) => format!("{{{}}}", name),
            None => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

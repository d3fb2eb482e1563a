//! Extractor and transformer contracts.
//!
//! Each contract is a single-method trait polymorphic over the per-route
//! [`AnalysisContext`]. A concrete component may implement several contracts
//! at once (for example contribute both responses and security schemes); the
//! plugin registry holds it under each contract it implements.
//!
//! Extractors are fallible. An `Err` is recorded as a fault for that route
//! and the extractor's contribution is treated as empty; it never aborts the
//! run unless strict mode is enabled.

pub mod params;
pub mod response;
pub mod security;
pub mod signature;

use crate::context::AnalysisContext;
use crate::document::{Operation, SecurityScheme};
use crate::schema::Schema;
use crate::schema_engine::SchemaEngine;
use anyhow::Result;

/// Base contract every extension implements; the name identifies the
/// extension in logs and fault records.
pub trait Extension: Send + Sync {
    fn name(&self) -> &'static str;
}

/// The location a parameter value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterLocation {
    Query,
    Path,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Query => "query",
            ParameterLocation::Path => "path",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
        }
    }
}

/// One extracted operation parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterResult {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: Schema,
    pub description: Option<String>,
}

/// An extracted request body.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBodyResult {
    pub schema: Schema,
    pub required: bool,
    pub content_type: String,
    pub description: Option<String>,
}

impl RequestBodyResult {
    pub fn json(schema: Schema) -> Self {
        Self {
            schema,
            required: true,
            content_type: "application/json".to_string(),
            description: None,
        }
    }
}

/// One extracted response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseResult {
    /// HTTP status code (100-599)
    pub status_code: u16,
    pub description: String,
    pub schema: Option<Schema>,
    pub content_type: String,
}

impl ResponseResult {
    pub fn new(status_code: u16, description: &str) -> Self {
        debug_assert!(
            (100..=599).contains(&status_code),
            "status code {} outside 100-599",
            status_code
        );
        Self {
            status_code,
            description: description.to_string(),
            schema: None,
            content_type: "application/json".to_string(),
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// A detected security requirement together with its scheme definition.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityResult {
    /// Name the scheme is registered under in `components.securitySchemes`
    pub scheme_name: String,
    /// The scheme definition
    pub scheme: SecurityScheme,
}

/// Extracts operation parameters (query, path, header, cookie) for a route.
pub trait ParameterExtractor: Extension {
    fn extract_parameters(
        &self,
        ctx: &AnalysisContext,
        engine: &SchemaEngine,
    ) -> Result<Vec<ParameterResult>>;
}

/// Extracts the request body schema for a route.
pub trait RequestBodyExtractor: Extension {
    fn extract_request_body(
        &self,
        ctx: &AnalysisContext,
        engine: &SchemaEngine,
    ) -> Result<Option<RequestBodyResult>>;
}

/// Extracts responses a route can produce.
pub trait ResponseExtractor: Extension {
    fn extract_responses(
        &self,
        ctx: &AnalysisContext,
        engine: &SchemaEngine,
    ) -> Result<Vec<ResponseResult>>;
}

/// Detects security requirements for a route.
pub trait SecuritySchemeDetector: Extension {
    fn detect_security(&self, ctx: &AnalysisContext) -> Result<Vec<SecurityResult>>;
}

/// Post-processes an assembled operation.
///
/// Transformers run after every extractor, in priority order; each receives
/// the operation and may add, remove, or rewrite any field.
pub trait OperationTransformer: Extension {
    fn transform(&self, ctx: &AnalysisContext, operation: Operation) -> Result<Operation>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "outside 100-599")]
    fn test_out_of_range_status_code_rejected() {
        ResponseResult::new(9999, "bogus");
    }

    #[test]
    fn test_boundary_status_codes_accepted() {
        assert_eq!(ResponseResult::new(100, "Continue").status_code, 100);
        assert_eq!(ResponseResult::new(599, "Timeout").status_code, 599);
    }
}

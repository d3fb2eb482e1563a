//! AST-driven exception analyzer.
//!
//! Walks a handler's statement tree and reports the failure responses the
//! handler can produce, without executing it. Every construction of a
//! recognized error type counts as a throw site, wherever it sits in the
//! control flow; the analyzer is conservatively over-approximate and makes no
//! attempt to prove a branch reachable. Unrecognized error types are ignored
//! rather than defaulted, so the response table never gains a spurious
//! generic entry.
//!
//! The recognized set is a closed lookup table from error-type paths to
//! status codes, extensible through [`StatusMap::with_mapping`] instead of
//! scattered conditionals.

use crate::context::AnalysisContext;
use crate::extractor::{Extension, ResponseExtractor, ResponseResult};
use crate::schema_engine::SchemaEngine;
use anyhow::Result;
use log::debug;
use std::collections::HashMap;
use syn::visit::{self, Visit};

/// Status code and default description for one recognized error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMapping {
    pub status_code: u16,
    pub description: String,
}

/// Closed table of recognized error-type paths.
#[derive(Debug, Clone)]
pub struct StatusMap {
    entries: HashMap<String, StatusMapping>,
}

impl StatusMap {
    /// An empty table with no recognized types
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Adds (or replaces) a mapping for an error-type path.
    pub fn with_mapping(mut self, type_path: &str, status_code: u16, description: &str) -> Self {
        debug_assert!(
            (100..=599).contains(&status_code),
            "status code {} outside 100-599",
            status_code
        );
        self.entries.insert(
            type_path.to_string(),
            StatusMapping {
                status_code,
                description: description.to_string(),
            },
        );
        self
    }

    /// Looks up a path, first verbatim, then by its last segment so that
    /// `errors::NotFoundError` matches a mapping registered as
    /// `NotFoundError`.
    pub fn lookup(&self, path: &str) -> Option<&StatusMapping> {
        if let Some(mapping) = self.entries.get(path) {
            return Some(mapping);
        }
        path.rsplit("::")
            .next()
            .and_then(|last| self.entries.get(last))
    }
}

impl Default for StatusMap {
    fn default() -> Self {
        Self::empty()
            .with_mapping("NotFoundError", 404, "Not found")
            .with_mapping("RecordNotFoundError", 404, "Record not found")
            .with_mapping("ModelNotFoundError", 404, "Record not found")
            .with_mapping("AccessDeniedError", 403, "Access denied")
            .with_mapping("AuthorizationError", 403, "Access denied")
            .with_mapping("ValidationError", 400, "Validation failed")
            .with_mapping("UnauthenticatedError", 401, "Unauthenticated")
            .with_mapping("AuthenticationError", 401, "Unauthenticated")
    }
}

/// The exception analyzer; registered as a response extractor.
#[derive(Debug, Clone, Default)]
pub struct ExceptionAnalyzer {
    status_map: StatusMap,
}

impl ExceptionAnalyzer {
    pub fn new(status_map: StatusMap) -> Self {
        Self { status_map }
    }

    /// Analyzes a handler body and returns one response per distinct
    /// recognized status code, in the order the codes are first reached.
    pub fn analyze(&self, block: &syn::Block) -> Vec<ResponseResult> {
        let mut visitor = ThrowSiteVisitor {
            status_map: &self.status_map,
            responses: Vec::new(),
        };
        visitor.visit_block(block);
        visitor.responses
    }
}

impl Extension for ExceptionAnalyzer {
    fn name(&self) -> &'static str {
        "exception-analyzer"
    }
}

impl ResponseExtractor for ExceptionAnalyzer {
    fn extract_responses(
        &self,
        ctx: &AnalysisContext,
        _engine: &SchemaEngine,
    ) -> Result<Vec<ResponseResult>> {
        // Degraded mode: no AST, no contribution
        let Some(handler) = &ctx.handler else {
            debug!("No handler AST for {}, skipping exception analysis", ctx.route.uri);
            return Ok(Vec::new());
        };

        Ok(self.analyze(&handler.block))
    }
}

/// Visits every expression in the body, including those nested inside
/// conditionals, loops, matches, and closures.
struct ThrowSiteVisitor<'a> {
    status_map: &'a StatusMap,
    responses: Vec<ResponseResult>,
}

impl ThrowSiteVisitor<'_> {
    fn record(&mut self, path: &syn::Path) {
        let joined = path_to_string(path);

        // A constructor call path carries the function segment; try the
        // full path first, then the path without it.
        let mapping = self.status_map.lookup(&joined).or_else(|| {
            joined
                .rsplit_once("::")
                .and_then(|(type_path, _ctor)| self.status_map.lookup(type_path))
        });

        let Some(mapping) = mapping else {
            return;
        };

        if self
            .responses
            .iter()
            .any(|r| r.status_code == mapping.status_code)
        {
            return;
        }

        self.responses.push(ResponseResult::new(
            mapping.status_code,
            &mapping.description,
        ));
    }
}

// Only constructor expressions count as throw sites: a call through the
// error type's path or a struct literal. A bare mention of the type as a
// value is not a construction and is ignored.
impl<'ast> Visit<'ast> for ThrowSiteVisitor<'_> {
    fn visit_expr_call(&mut self, node: &'ast syn::ExprCall) {
        if let syn::Expr::Path(expr_path) = &*node.func {
            self.record(&expr_path.path);
        }
        visit::visit_expr_call(self, node);
    }

    fn visit_expr_struct(&mut self, node: &'ast syn::ExprStruct) {
        self.record(&node.path);
        visit::visit_expr_struct(self, node);
    }
}

fn path_to_string(path: &syn::Path) -> String {
    path.segments
        .iter()
        .map(|segment| segment.ident.to_string())
        .collect::<Vec<_>>()
        .join("::")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AnalysisContext;
    use crate::parser::AstParser;
    use crate::route::{HttpMethod, RouteInfo};
    use crate::type_resolver::TypeResolver;
    use std::sync::Arc;

    fn analyze_body(body: &str) -> Vec<ResponseResult> {
        let block: syn::Block = syn::parse_str(&format!("{{ {} }}", body)).unwrap();
        ExceptionAnalyzer::default().analyze(&block)
    }

    fn status_codes(responses: &[ResponseResult]) -> Vec<u16> {
        responses.iter().map(|r| r.status_code).collect()
    }

    #[test]
    fn test_body_without_throws_yields_empty() {
        let responses = analyze_body("let x = 1; x + 1;");
        assert!(responses.is_empty());
    }

    #[test]
    fn test_recognized_throw_maps_to_status() {
        let responses = analyze_body(r#"return Err(NotFoundError::new("missing"));"#);
        assert_eq!(status_codes(&responses), vec![404]);
        assert_eq!(responses[0].description, "Not found");
    }

    #[test]
    fn test_qualified_error_path_matches() {
        let responses = analyze_body(r#"return Err(crate::errors::AccessDeniedError::new());"#);
        assert_eq!(status_codes(&responses), vec![403]);
    }

    #[test]
    fn test_struct_expression_counts_as_throw_site() {
        let responses =
            analyze_body(r#"return Err(ValidationError { field: "name".to_string() });"#);
        assert_eq!(status_codes(&responses), vec![400]);
    }

    #[test]
    fn test_throws_in_different_branches_all_reported() {
        let body = r#"
            if id == 0 {
                return Err(NotFoundError::new("missing"));
            }
            return Err(AccessDeniedError::new());
        "#;
        let responses = analyze_body(body);
        assert_eq!(status_codes(&responses), vec![404, 403]);
    }

    #[test]
    fn test_throws_inside_loops_and_matches_are_found() {
        let body = r#"
            for item in items {
                match item.kind {
                    Kind::Missing => return Err(RecordNotFoundError::new(item.id)),
                    Kind::Locked => {
                        while locked {
                            return Err(UnauthenticatedError::new());
                        }
                    }
                    _ => {}
                }
            }
        "#;
        let responses = analyze_body(body);
        assert_eq!(status_codes(&responses), vec![404, 401]);
    }

    #[test]
    fn test_same_status_from_multiple_sites_deduplicated() {
        let body = r#"
            if a {
                return Err(NotFoundError::new("a"));
            }
            if b {
                return Err(RecordNotFoundError::new("b"));
            }
        "#;
        // Both types map to 404; one entry survives
        let responses = analyze_body(body);
        assert_eq!(status_codes(&responses), vec![404]);
        assert_eq!(responses[0].description, "Not found");
    }

    #[test]
    fn test_non_constructing_mention_is_ignored() {
        let body = r#"
            let marker = NotFoundError;
            let code = AccessDeniedError::CODE;
            register(marker, code);
        "#;
        assert!(analyze_body(body).is_empty());
    }

    #[test]
    fn test_unrecognized_error_types_are_ignored() {
        let body = r#"
            return Err(TotallyCustomError::new("?"));
        "#;
        assert!(analyze_body(body).is_empty());
    }

    #[test]
    fn test_custom_mapping_extends_the_table() {
        let map = StatusMap::default().with_mapping("TeapotError", 418, "I'm a teapot");
        let analyzer = ExceptionAnalyzer::new(map);
        let block: syn::Block =
            syn::parse_str(r#"{ return Err(TeapotError::new()); }"#).unwrap();

        let responses = analyzer.analyze(&block);
        assert_eq!(status_codes(&responses), vec![418]);
    }

    #[test]
    #[should_panic(expected = "outside 100-599")]
    fn test_out_of_range_mapping_rejected() {
        StatusMap::empty().with_mapping("BogusError", 9999, "bogus");
    }

    #[test]
    fn test_context_without_ast_yields_empty() {
        let parsed = AstParser::parse_source("").unwrap();
        let engine = SchemaEngine::new(TypeResolver::new(vec![Arc::new(parsed)]));
        let ctx = AnalysisContext::without_source(RouteInfo::new(
            "/users/{id}",
            vec![HttpMethod::Get],
        ));

        let responses = ExceptionAnalyzer::default()
            .extract_responses(&ctx, &engine)
            .unwrap();
        assert!(responses.is_empty());
    }
}

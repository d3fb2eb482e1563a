//! Success-response extraction and the default-response fallback.

use crate::context::AnalysisContext;
use crate::document::{Operation, Response};
use crate::extractor::{Extension, OperationTransformer, ResponseExtractor, ResponseResult};
use crate::schema_engine::SchemaEngine;
use crate::type_resolver::TypeInfo;
use anyhow::Result;

/// Derives the success response from the handler's return type.
///
/// `Result<T, E>` and `Json<T>` wrappers are unwrapped down to `T`; a unit or
/// unresolvable return type yields a schema-less 200.
#[derive(Debug, Default)]
pub struct ReturnTypeResponseExtractor;

impl Extension for ReturnTypeResponseExtractor {
    fn name(&self) -> &'static str {
        "return-type-response"
    }
}

impl ResponseExtractor for ReturnTypeResponseExtractor {
    fn extract_responses(
        &self,
        ctx: &AnalysisContext,
        engine: &SchemaEngine,
    ) -> Result<Vec<ResponseResult>> {
        let Some(handler) = &ctx.handler else {
            return Ok(Vec::new());
        };

        let syn::ReturnType::Type(_, return_type) = &handler.signature.output else {
            return Ok(vec![ResponseResult::new(200, "Successful response")]);
        };

        let payload = unwrap_payload(TypeInfo::from_type(return_type));
        let mut response = ResponseResult::new(200, "Successful response");
        if engine.resolver().resolve_type(&payload.name).is_some()
            || payload.is_vec
            || payload.is_option
        {
            response = response.with_schema(engine.schema_for(&payload)?);
        }

        Ok(vec![response])
    }
}

/// Strips `Result<T, E>` and `Json<T>` wrappers down to the payload type
fn unwrap_payload(type_info: TypeInfo) -> TypeInfo {
    match type_info.name.as_str() {
        "Result" | "Json" => match type_info.generic_args.into_iter().next() {
            Some(inner) => unwrap_payload(inner),
            None => TypeInfo::new("Unknown"),
        },
        _ => type_info,
    }
}

/// Guarantees every operation carries at least one response.
///
/// Runs at the bottom of the core priority band, after every extractor has
/// had its chance to contribute.
#[derive(Debug, Default)]
pub struct DefaultResponseTransformer;

impl Extension for DefaultResponseTransformer {
    fn name(&self) -> &'static str {
        "default-response"
    }
}

impl OperationTransformer for DefaultResponseTransformer {
    fn transform(&self, _ctx: &AnalysisContext, mut operation: Operation) -> Result<Operation> {
        if operation.responses.is_empty() {
            operation.responses.insert(
                "200".to_string(),
                Response {
                    description: "Successful response".to_string(),
                    content: None,
                },
            );
        }
        Ok(operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AstParser;
    use crate::route::{HttpMethod, RouteInfo};
    use crate::schema::Schema;
    use crate::type_resolver::TypeResolver;
    use std::sync::Arc;

    fn context_from(code: &str, action: &str) -> (AnalysisContext, SchemaEngine) {
        let parsed = AstParser::parse_source(code).unwrap();
        let engine = SchemaEngine::new(TypeResolver::new(vec![Arc::new(parsed)]));
        let route = RouteInfo::new("/things", vec![HttpMethod::Get]).with_action(action);
        let ctx = AnalysisContext::resolve(route, engine.resolver());
        (ctx, engine)
    }

    #[test]
    fn test_named_return_type_drives_response_schema() {
        let code = r#"
            pub struct User {
                pub id: u64,
            }

            pub fn show_user() -> User {
                todo!()
            }
        "#;
        let (ctx, engine) = context_from(code, "show_user");

        let responses = ReturnTypeResponseExtractor
            .extract_responses(&ctx, &engine)
            .unwrap();

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].status_code, 200);
        assert_eq!(responses[0].schema, Some(Schema::reference("User")));
    }

    #[test]
    fn test_result_and_json_wrappers_are_unwrapped() {
        let code = r#"
            pub struct User {
                pub id: u64,
            }

            pub fn show_user() -> Result<Json<User>, ApiError> {
                todo!()
            }
        "#;
        let (ctx, engine) = context_from(code, "show_user");

        let responses = ReturnTypeResponseExtractor
            .extract_responses(&ctx, &engine)
            .unwrap();

        assert_eq!(responses[0].schema, Some(Schema::reference("User")));
    }

    #[test]
    fn test_vec_return_type_yields_array_schema() {
        let code = r#"
            pub struct User {
                pub id: u64,
            }

            pub fn list_users() -> Vec<User> {
                todo!()
            }
        "#;
        let (ctx, engine) = context_from(code, "list_users");

        let responses = ReturnTypeResponseExtractor
            .extract_responses(&ctx, &engine)
            .unwrap();

        assert_eq!(
            responses[0].schema,
            Some(Schema::array(Schema::reference("User")))
        );
    }

    #[test]
    fn test_unit_return_yields_schemaless_200() {
        let (ctx, engine) = context_from("pub fn ping() {}", "ping");

        let responses = ReturnTypeResponseExtractor
            .extract_responses(&ctx, &engine)
            .unwrap();

        assert_eq!(responses[0].status_code, 200);
        assert!(responses[0].schema.is_none());
    }

    #[test]
    fn test_context_without_ast_yields_empty() {
        let parsed = AstParser::parse_source("").unwrap();
        let engine = SchemaEngine::new(TypeResolver::new(vec![Arc::new(parsed)]));
        let ctx =
            AnalysisContext::without_source(RouteInfo::new("/things", vec![HttpMethod::Get]));

        let responses = ReturnTypeResponseExtractor
            .extract_responses(&ctx, &engine)
            .unwrap();
        assert!(responses.is_empty());
    }

    #[test]
    fn test_default_response_added_when_missing() {
        let (ctx, _engine) = context_from("", "absent");
        let operation = Operation::default();

        let transformed = DefaultResponseTransformer
            .transform(&ctx, operation)
            .unwrap();

        assert!(transformed.responses.contains_key("200"));
    }

    #[test]
    fn test_default_response_does_not_overwrite() {
        let (ctx, _engine) = context_from("", "absent");
        let mut operation = Operation::default();
        operation.responses.insert(
            "204".to_string(),
            Response {
                description: "No content".to_string(),
                content: None,
            },
        );

        let transformed = DefaultResponseTransformer
            .transform(&ctx, operation)
            .unwrap();

        assert_eq!(transformed.responses.len(), 1);
        assert!(transformed.responses.contains_key("204"));
    }
}

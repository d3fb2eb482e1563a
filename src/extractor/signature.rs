//! Query-parameter and request-body extraction from handler signatures.
//!
//! A handler argument wrapped in `Query<T>` contributes one query parameter
//! per field of `T`; an argument wrapped in `Json<T>`, or whose type name
//! ends in `Request` (validator style), contributes the request body.

use crate::context::AnalysisContext;
use crate::extractor::{
    Extension, ParameterExtractor, ParameterLocation, ParameterResult, RequestBodyExtractor,
    RequestBodyResult,
};
use crate::schema_engine::{parse_annotations, SchemaEngine};
use crate::type_resolver::{TypeInfo, TypeKind};
use anyhow::Result;
use log::debug;

/// Derives parameters and the request body from the handler's typed
/// arguments.
#[derive(Debug, Default)]
pub struct HandlerSignatureExtractor;

impl Extension for HandlerSignatureExtractor {
    fn name(&self) -> &'static str {
        "handler-signature"
    }
}

impl ParameterExtractor for HandlerSignatureExtractor {
    fn extract_parameters(
        &self,
        ctx: &AnalysisContext,
        engine: &SchemaEngine,
    ) -> Result<Vec<ParameterResult>> {
        let Some(handler) = &ctx.handler else {
            return Ok(Vec::new());
        };

        let mut parameters = Vec::new();
        for type_info in typed_arguments(handler) {
            if type_info.name != "Query" {
                continue;
            }
            let Some(inner) = type_info.generic_args.first() else {
                continue;
            };

            let Some(resolved) = engine.resolver().resolve_type(&inner.name) else {
                debug!("Query type {} not resolvable, skipping", inner.name);
                continue;
            };
            let TypeKind::Struct(struct_def) = resolved.kind else {
                continue;
            };

            for field in &struct_def.fields {
                let annotations = parse_annotations(&field.docs);
                parameters.push(ParameterResult {
                    name: field.name.clone(),
                    location: ParameterLocation::Query,
                    required: annotations.required
                        || (!field.optional && !field.has_default),
                    schema: engine.schema_for(&field.type_info)?,
                    description: None,
                });
            }
        }

        Ok(parameters)
    }
}

impl RequestBodyExtractor for HandlerSignatureExtractor {
    fn extract_request_body(
        &self,
        ctx: &AnalysisContext,
        engine: &SchemaEngine,
    ) -> Result<Option<RequestBodyResult>> {
        let Some(handler) = &ctx.handler else {
            return Ok(None);
        };

        for type_info in typed_arguments(handler) {
            let body_type = if type_info.name == "Json" {
                type_info.generic_args.first().cloned()
            } else if type_info.name.ends_with("Request") {
                Some(type_info.clone())
            } else {
                None
            };

            if let Some(body_type) = body_type {
                let schema = engine.schema_for(&body_type)?;
                return Ok(Some(RequestBodyResult::json(schema)));
            }
        }

        Ok(None)
    }
}

/// Declared types of the handler's non-receiver arguments
fn typed_arguments(handler: &crate::type_resolver::HandlerFn) -> Vec<TypeInfo> {
    handler
        .signature
        .inputs
        .iter()
        .filter_map(|input| match input {
            syn::FnArg::Typed(pat_type) => Some(TypeInfo::from_type(&pat_type.ty)),
            syn::FnArg::Receiver(_) => None,
        })
        .collect()
}

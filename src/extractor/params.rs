//! Path-parameter extraction from the route descriptor.

use crate::context::AnalysisContext;
use crate::extractor::{Extension, ParameterExtractor, ParameterLocation, ParameterResult};
use crate::schema::Schema;
use crate::schema_engine::SchemaEngine;
use crate::type_resolver::TypeInfo;
use anyhow::Result;

/// Emits one required path parameter per `{param}` segment in the route URI.
///
/// When the handler signature declares an argument with the same name, the
/// declared type drives the parameter schema; otherwise string is assumed.
#[derive(Debug, Default)]
pub struct PathParameterExtractor;

impl Extension for PathParameterExtractor {
    fn name(&self) -> &'static str {
        "path-parameters"
    }
}

impl ParameterExtractor for PathParameterExtractor {
    fn extract_parameters(
        &self,
        ctx: &AnalysisContext,
        engine: &SchemaEngine,
    ) -> Result<Vec<ParameterResult>> {
        let mut parameters = Vec::with_capacity(ctx.route.path_parameters.len());

        for name in &ctx.route.path_parameters {
            let schema = match typed_argument(ctx, name) {
                Some(type_info) => engine.schema_for(&type_info)?,
                None => Schema::primitive("string"),
            };

            parameters.push(ParameterResult {
                name: name.clone(),
                location: ParameterLocation::Path,
                required: true,
                schema,
                description: None,
            });
        }

        Ok(parameters)
    }
}

/// The declared type of a handler argument named `name`, if any
fn typed_argument(ctx: &AnalysisContext, name: &str) -> Option<TypeInfo> {
    let handler = ctx.handler.as_ref()?;
    for input in &handler.signature.inputs {
        let syn::FnArg::Typed(pat_type) = input else {
            continue;
        };
        if let syn::Pat::Ident(pat_ident) = &*pat_type.pat {
            if pat_ident.ident == name {
                return Some(TypeInfo::from_type(&pat_type.ty));
            }
        }
    }
    None
}

//! Plugin registry and per-route dispatch.
//!
//! The registry owns every registered extractor and transformer, bucketed by
//! contract. Higher priority runs earlier; ties keep registration order.
//! Core analyzers register in the 60-100 band, third-party extensions at 50
//! or below, so core results are always on the table before a third-party
//! transformer sees the operation.
//!
//! A faulting extractor is isolated: its error is recorded, its contribution
//! treated as empty, and the remaining extractors run. The one exception is
//! a schema-consistency conflict, which is escalated because the components
//! table can no longer be trusted.

use crate::context::AnalysisContext;
use crate::document::{MediaType, Operation, Parameter, RequestBody, Response, SecurityScheme};
use crate::error::Error;
use crate::exception::ExceptionAnalyzer;
use crate::extractor::{
    Extension, OperationTransformer, ParameterExtractor, ParameterResult, RequestBodyExtractor,
    RequestBodyResult, ResponseExtractor, ResponseResult, SecurityResult, SecuritySchemeDetector,
};
use crate::extractor::params::PathParameterExtractor;
use crate::extractor::response::{DefaultResponseTransformer, ReturnTypeResponseExtractor};
use crate::extractor::security::MiddlewareSecurityDetector;
use crate::extractor::signature::HandlerSignatureExtractor;
use crate::route::HttpMethod;
use crate::schema_engine::SchemaEngine;
use indexmap::IndexMap;
use log::warn;
use std::sync::Arc;

/// One recorded extractor fault.
#[derive(Debug, Clone)]
pub struct AnalysisFault {
    /// Label of the route being analyzed
    pub route: String,
    /// Name of the faulting extension
    pub extension: String,
    /// The underlying error message
    pub message: String,
}

/// A registered extension with its priority.
struct Registration<T: ?Sized> {
    instance: Arc<T>,
    priority: i32,
}

/// What one dispatch produced for a single path+method.
pub struct DispatchOutcome {
    pub operation: Operation,
    /// Security schemes referenced by the operation, for the global table
    pub security_schemes: Vec<(String, SecurityScheme)>,
    pub faults: Vec<AnalysisFault>,
}

/// The registry of extractors and transformers driving per-route analysis.
#[derive(Default)]
pub struct PluginRegistry {
    parameter_extractors: Vec<Registration<dyn ParameterExtractor>>,
    request_body_extractors: Vec<Registration<dyn RequestBodyExtractor>>,
    response_extractors: Vec<Registration<dyn ResponseExtractor>>,
    security_detectors: Vec<Registration<dyn SecuritySchemeDetector>>,
    transformers: Vec<Registration<dyn OperationTransformer>>,
}

impl PluginRegistry {
    /// An empty registry with no extensions
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-loaded with the core analyzers, registered in the
    /// 60-100 priority band.
    pub fn with_core_extensions() -> Self {
        let mut registry = Self::new();

        registry.register_parameter_extractor(Arc::new(PathParameterExtractor), 100);

        let signature = Arc::new(HandlerSignatureExtractor);
        registry.register_parameter_extractor(signature.clone(), 90);
        registry.register_request_body_extractor(signature, 90);

        registry.register_response_extractor(Arc::new(ReturnTypeResponseExtractor), 85);
        registry.register_response_extractor(Arc::new(ExceptionAnalyzer::default()), 80);
        registry.register_security_detector(Arc::new(MiddlewareSecurityDetector), 70);
        registry.register_transformer(Arc::new(DefaultResponseTransformer), 60);

        registry
    }

    pub fn register_parameter_extractor(
        &mut self,
        extractor: Arc<dyn ParameterExtractor>,
        priority: i32,
    ) {
        Self::insert(&mut self.parameter_extractors, extractor, priority);
    }

    pub fn register_request_body_extractor(
        &mut self,
        extractor: Arc<dyn RequestBodyExtractor>,
        priority: i32,
    ) {
        Self::insert(&mut self.request_body_extractors, extractor, priority);
    }

    pub fn register_response_extractor(
        &mut self,
        extractor: Arc<dyn ResponseExtractor>,
        priority: i32,
    ) {
        Self::insert(&mut self.response_extractors, extractor, priority);
    }

    pub fn register_security_detector(
        &mut self,
        detector: Arc<dyn SecuritySchemeDetector>,
        priority: i32,
    ) {
        Self::insert(&mut self.security_detectors, detector, priority);
    }

    pub fn register_transformer(
        &mut self,
        transformer: Arc<dyn OperationTransformer>,
        priority: i32,
    ) {
        Self::insert(&mut self.transformers, transformer, priority);
    }

    /// Insert keeping the bucket ordered: higher priority first, ties in
    /// registration order (stable sort).
    fn insert<T: ?Sized>(bucket: &mut Vec<Registration<T>>, instance: Arc<T>, priority: i32) {
        bucket.push(Registration { instance, priority });
        bucket.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Runs every registered extension against one context and method,
    /// merging partial results into a single operation.
    ///
    /// # Errors
    ///
    /// Only a schema-consistency conflict aborts the dispatch; every other
    /// extractor fault is recorded in the outcome and skipped.
    pub fn run_for(
        &self,
        ctx: &AnalysisContext,
        method: HttpMethod,
        engine: &SchemaEngine,
    ) -> Result<DispatchOutcome, Error> {
        let mut faults = Vec::new();

        // Parameters: replace-by-(name, location), later writes win
        let mut parameters: IndexMap<(String, &'static str), ParameterResult> = IndexMap::new();
        for registration in &self.parameter_extractors {
            match registration.instance.extract_parameters(ctx, engine) {
                Ok(results) => {
                    for parameter in results {
                        let key = (parameter.name.clone(), parameter.location.as_str());
                        parameters.insert(key, parameter);
                    }
                }
                Err(e) => Self::record(&mut faults, ctx, registration.instance.name(), e)?,
            }
        }

        // Request body: highest-priority non-empty result wins
        let mut request_body: Option<RequestBodyResult> = None;
        for registration in &self.request_body_extractors {
            match registration.instance.extract_request_body(ctx, engine) {
                Ok(Some(result)) => {
                    request_body = Some(result);
                    break;
                }
                Ok(None) => {}
                Err(e) => Self::record(&mut faults, ctx, registration.instance.name(), e)?,
            }
        }

        // Responses: merge by status code; later contributions only fill
        // fields earlier ones left unset
        let mut responses: IndexMap<u16, ResponseResult> = IndexMap::new();
        for registration in &self.response_extractors {
            match registration.instance.extract_responses(ctx, engine) {
                Ok(results) => {
                    for response in results {
                        merge_response(&mut responses, response);
                    }
                }
                Err(e) => Self::record(&mut faults, ctx, registration.instance.name(), e)?,
            }
        }

        // Security: accumulate in priority order, deduplicated by scheme name
        let mut security: Vec<SecurityResult> = Vec::new();
        for registration in &self.security_detectors {
            match registration.instance.detect_security(ctx) {
                Ok(results) => {
                    for result in results {
                        if !security.iter().any(|s| s.scheme_name == result.scheme_name) {
                            security.push(result);
                        }
                    }
                }
                Err(e) => Self::record(&mut faults, ctx, registration.instance.name(), e)?,
            }
        }

        let mut operation = assemble_operation(ctx, method, parameters, request_body, &responses, &security);

        // Transformers see the fully merged operation, in priority order
        for registration in &self.transformers {
            match registration.instance.transform(ctx, operation.clone()) {
                Ok(transformed) => operation = transformed,
                Err(e) => Self::record(&mut faults, ctx, registration.instance.name(), e)?,
            }
        }

        Ok(DispatchOutcome {
            operation,
            security_schemes: security
                .into_iter()
                .map(|s| (s.scheme_name, s.scheme))
                .collect(),
            faults,
        })
    }

    /// Records a fault, or escalates it when the components table is the
    /// thing that failed.
    fn record(
        faults: &mut Vec<AnalysisFault>,
        ctx: &AnalysisContext,
        extension: &str,
        error: anyhow::Error,
    ) -> Result<(), Error> {
        if let Some(Error::SchemaConflict { name }) = error.downcast_ref::<Error>() {
            return Err(Error::SchemaConflict { name: name.clone() });
        }

        warn!(
            "Extension '{}' faulted on {}: {}",
            extension,
            ctx.route.label(),
            error
        );
        faults.push(AnalysisFault {
            route: ctx.route.label(),
            extension: extension.to_string(),
            message: error.to_string(),
        });
        Ok(())
    }
}

/// Merge one extracted response into the table without erasing fields an
/// earlier (higher-priority) extractor already set.
fn merge_response(responses: &mut IndexMap<u16, ResponseResult>, incoming: ResponseResult) {
    match responses.get_mut(&incoming.status_code) {
        Some(existing) => {
            if existing.description.is_empty() {
                existing.description = incoming.description;
            }
            if existing.schema.is_none() {
                existing.schema = incoming.schema;
            }
        }
        None => {
            responses.insert(incoming.status_code, incoming);
        }
    }
}

fn assemble_operation(
    ctx: &AnalysisContext,
    method: HttpMethod,
    parameters: IndexMap<(String, &'static str), ParameterResult>,
    request_body: Option<RequestBodyResult>,
    responses: &IndexMap<u16, ResponseResult>,
    security: &[SecurityResult],
) -> Operation {
    let parameters: Vec<Parameter> = parameters
        .into_values()
        .map(|p| Parameter {
            name: p.name,
            location: p.location.as_str().to_string(),
            required: p.required,
            schema: p.schema,
            description: p.description,
        })
        .collect();

    let request_body = request_body.map(|body| {
        let mut content = IndexMap::new();
        content.insert(body.content_type, MediaType { schema: body.schema });
        RequestBody {
            description: body.description,
            required: body.required,
            content,
        }
    });

    let mut response_table = IndexMap::new();
    for (status_code, response) in responses {
        let content = response.schema.clone().map(|schema| {
            let mut content = IndexMap::new();
            content.insert(response.content_type.clone(), MediaType { schema });
            content
        });
        response_table.insert(
            status_code.to_string(),
            Response {
                description: response.description.clone(),
                content,
            },
        );
    }

    let security_requirements = if security.is_empty() {
        None
    } else {
        Some(
            security
                .iter()
                .map(|s| {
                    let mut requirement = IndexMap::new();
                    requirement.insert(s.scheme_name.clone(), Vec::new());
                    requirement
                })
                .collect(),
        )
    };

    let description = ctx
        .handler
        .as_ref()
        .and_then(|h| h.docs.first())
        .filter(|line| !line.is_empty() && !line.starts_with('@'))
        .cloned();

    Operation {
        summary: Some(format!("{} {}", method.as_str(), ctx.route.uri)),
        description,
        operation_id: ctx.route.action.clone(),
        parameters: if parameters.is_empty() {
            None
        } else {
            Some(parameters)
        },
        request_body,
        responses: response_table,
        security: security_requirements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::AstParser;
    use crate::route::RouteInfo;
    use crate::schema::Schema;
    use crate::type_resolver::TypeResolver;
    use anyhow::anyhow;

    fn engine() -> SchemaEngine {
        let parsed = AstParser::parse_source("").unwrap();
        SchemaEngine::new(TypeResolver::new(vec![Arc::new(parsed)]))
    }

    fn plain_context(uri: &str) -> AnalysisContext {
        AnalysisContext::without_source(RouteInfo::new(uri, vec![HttpMethod::Get]))
    }

    /// Response extractor returning a fixed result
    struct FixedResponses {
        name: &'static str,
        responses: Vec<ResponseResult>,
    }

    impl Extension for FixedResponses {
        fn name(&self) -> &'static str {
            self.name
        }
    }

    impl ResponseExtractor for FixedResponses {
        fn extract_responses(
            &self,
            _ctx: &AnalysisContext,
            _engine: &SchemaEngine,
        ) -> anyhow::Result<Vec<ResponseResult>> {
            Ok(self.responses.clone())
        }
    }

    /// Extractor that always fails
    struct Faulty;

    impl Extension for Faulty {
        fn name(&self) -> &'static str {
            "faulty"
        }
    }

    impl ResponseExtractor for Faulty {
        fn extract_responses(
            &self,
            _ctx: &AnalysisContext,
            _engine: &SchemaEngine,
        ) -> anyhow::Result<Vec<ResponseResult>> {
            Err(anyhow!("deliberate failure"))
        }
    }

    impl ParameterExtractor for Faulty {
        fn extract_parameters(
            &self,
            _ctx: &AnalysisContext,
            _engine: &SchemaEngine,
        ) -> anyhow::Result<Vec<ParameterResult>> {
            Err(anyhow!("deliberate failure"))
        }
    }

    #[test]
    fn test_priority_order_and_non_destructive_merge() {
        let mut registry = PluginRegistry::new();

        // A at priority 90 sets description and schema for 200
        registry.register_response_extractor(
            Arc::new(FixedResponses {
                name: "a",
                responses: vec![
                    ResponseResult::new(200, "From A").with_schema(Schema::primitive("string"))
                ],
            }),
            90,
        );
        // B at priority 10 contributes to the same status code
        registry.register_response_extractor(
            Arc::new(FixedResponses {
                name: "b",
                responses: vec![
                    ResponseResult::new(200, "From B")
                        .with_schema(Schema::primitive("integer")),
                    ResponseResult::new(404, "Missing"),
                ],
            }),
            10,
        );

        let outcome = registry
            .run_for(&plain_context("/things"), HttpMethod::Get, &engine())
            .unwrap();

        // A's fields survive; B only adds the absent 404
        let ok = &outcome.operation.responses["200"];
        assert_eq!(ok.description, "From A");
        assert_eq!(
            ok.content.as_ref().unwrap()["application/json"].schema,
            Schema::primitive("string")
        );
        assert!(outcome.operation.responses.contains_key("404"));
    }

    #[test]
    fn test_fault_is_isolated_and_recorded() {
        let mut registry = PluginRegistry::new();
        registry.register_response_extractor(Arc::new(Faulty), 90);
        registry.register_response_extractor(
            Arc::new(FixedResponses {
                name: "ok",
                responses: vec![ResponseResult::new(200, "Fine")],
            }),
            50,
        );

        let outcome = registry
            .run_for(&plain_context("/things"), HttpMethod::Get, &engine())
            .unwrap();

        assert_eq!(outcome.faults.len(), 1);
        assert_eq!(outcome.faults[0].extension, "faulty");
        assert!(outcome.faults[0].message.contains("deliberate failure"));
        // The healthy extractor still contributed
        assert!(outcome.operation.responses.contains_key("200"));
    }

    #[test]
    fn test_multi_contract_extension_faults_recorded_per_contract() {
        let mut registry = PluginRegistry::new();
        let faulty = Arc::new(Faulty);
        registry.register_parameter_extractor(faulty.clone(), 80);
        registry.register_response_extractor(faulty, 80);

        let outcome = registry
            .run_for(&plain_context("/things"), HttpMethod::Get, &engine())
            .unwrap();

        assert_eq!(outcome.faults.len(), 2);
    }

    #[test]
    fn test_schema_conflict_escalates() {
        struct Conflicting;

        impl Extension for Conflicting {
            fn name(&self) -> &'static str {
                "conflicting"
            }
        }

        impl ResponseExtractor for Conflicting {
            fn extract_responses(
                &self,
                _ctx: &AnalysisContext,
                engine: &SchemaEngine,
            ) -> anyhow::Result<Vec<ResponseResult>> {
                engine.components().register("User", Schema::primitive("string"))?;
                engine.components().register("User", Schema::primitive("integer"))?;
                Ok(Vec::new())
            }
        }

        let mut registry = PluginRegistry::new();
        registry.register_response_extractor(Arc::new(Conflicting), 90);

        let result = registry.run_for(&plain_context("/things"), HttpMethod::Get, &engine());
        match result {
            Err(Error::SchemaConflict { name }) => assert_eq!(name, "User"),
            other => panic!("expected schema conflict, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_ties_keep_registration_order() {
        let mut registry = PluginRegistry::new();
        registry.register_response_extractor(
            Arc::new(FixedResponses {
                name: "first",
                responses: vec![ResponseResult::new(200, "first wins")],
            }),
            50,
        );
        registry.register_response_extractor(
            Arc::new(FixedResponses {
                name: "second",
                responses: vec![ResponseResult::new(200, "second loses")],
            }),
            50,
        );

        let outcome = registry
            .run_for(&plain_context("/things"), HttpMethod::Get, &engine())
            .unwrap();

        assert_eq!(outcome.operation.responses["200"].description, "first wins");
    }

    #[test]
    fn test_core_registry_produces_default_response() {
        let registry = PluginRegistry::with_core_extensions();
        let outcome = registry
            .run_for(&plain_context("/health"), HttpMethod::Get, &engine())
            .unwrap();

        // Degraded context: no AST, but the default transformer still
        // guarantees a response
        assert!(outcome.operation.responses.contains_key("200"));
        assert!(outcome.faults.is_empty());
    }

    #[test]
    fn test_operation_summary_and_id() {
        let registry = PluginRegistry::with_core_extensions();
        let route = RouteInfo::new("/users/{id}", vec![HttpMethod::Get]).with_action("show_user");
        let ctx = AnalysisContext::without_source(route);

        let outcome = registry.run_for(&ctx, HttpMethod::Get, &engine()).unwrap();

        assert_eq!(
            outcome.operation.summary.as_deref(),
            Some("GET /users/{id}")
        );
        assert_eq!(outcome.operation.operation_id.as_deref(), Some("show_user"));
    }

    #[test]
    fn test_path_parameters_flow_through_core_registry() {
        let registry = PluginRegistry::with_core_extensions();
        let ctx = plain_context("/users/{id}");

        let outcome = registry.run_for(&ctx, HttpMethod::Get, &engine()).unwrap();
        let parameters = outcome.operation.parameters.unwrap();

        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters[0].name, "id");
        assert_eq!(parameters[0].location, "path");
    }
}

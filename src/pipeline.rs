//! The document-generation pipeline.
//!
//! Wires the stages together: scan the source tree, parse it once through the
//! shared cache, resolve a context per route, dispatch the registry per route,
//! and fold the per-route operations into the final document in route-table
//! order.

use crate::context::AnalysisContext;
use crate::document::{DocumentAssembler, OpenApiDocument, Operation};
use crate::error::Error;
use crate::parser::{ParsedFile, SourceCache};
use crate::registry::{AnalysisFault, PluginRegistry};
use crate::route::{HttpMethod, RouteInfo};
use crate::scanner::SourceScanner;
use crate::schema_engine::SchemaEngine;
use crate::type_resolver::TypeResolver;
use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

/// Run-level configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Abort the run on the first extractor fault instead of degrading
    pub strict: bool,
    /// API title for the document's info block
    pub title: String,
    /// API version for the document's info block
    pub version: String,
    /// Optional API description
    pub description: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strict: false,
            title: "Generated API".to_string(),
            version: "1.0.0".to_string(),
            description: Some("API documentation generated from the route table".to_string()),
        }
    }
}

/// The outcome of one generation run.
#[derive(Debug)]
pub struct GenerationReport {
    pub document: OpenApiDocument,
    /// Extractor faults recorded during analysis (empty in strict mode, which
    /// aborts instead)
    pub faults: Vec<AnalysisFault>,
}

/// Drives document generation end to end.
pub struct GenerationPipeline {
    registry: PluginRegistry,
    config: PipelineConfig,
}

impl GenerationPipeline {
    pub fn new(registry: PluginRegistry, config: PipelineConfig) -> Self {
        Self { registry, config }
    }

    /// A pipeline with the core analyzers registered.
    pub fn with_core_extensions(config: PipelineConfig) -> Self {
        Self::new(PluginRegistry::with_core_extensions(), config)
    }

    /// The registry, for registering additional extensions.
    pub fn registry_mut(&mut self) -> &mut PluginRegistry {
        &mut self.registry
    }

    /// Runs the pipeline against a route table and a source directory.
    pub fn run(&self, routes: Vec<RouteInfo>, source_dir: &Path) -> Result<GenerationReport> {
        let scan = SourceScanner::new(source_dir.to_path_buf())
            .scan()
            .with_context(|| format!("Failed to scan source directory: {}", source_dir.display()))?;
        info!(
            "Scanned {}: {} Rust files",
            source_dir.display(),
            scan.rust_files.len()
        );

        let cache = SourceCache::new();
        let parsed_files = cache.parse_all(&scan.rust_files);
        self.run_with_files(routes, parsed_files)
    }

    /// Runs the pipeline against already-parsed source files.
    ///
    /// An empty file list is the fully degraded mode: every context resolves
    /// without a handler body and AST-dependent extractors contribute nothing.
    pub fn run_with_files(
        &self,
        routes: Vec<RouteInfo>,
        parsed_files: Vec<Arc<ParsedFile>>,
    ) -> Result<GenerationReport> {
        info!(
            "Analyzing {} routes against {} parsed files",
            routes.len(),
            parsed_files.len()
        );

        let engine = SchemaEngine::new(TypeResolver::new(parsed_files));
        let contexts: Vec<AnalysisContext> = routes
            .into_iter()
            .map(|route| AnalysisContext::resolve(route, engine.resolver()))
            .collect();

        let mut assembler = DocumentAssembler::new().with_info(
            &self.config.title,
            &self.config.version,
            self.config.description.clone(),
        );
        let mut faults = Vec::new();

        // Analysis walks the syntax trees, which are not Send, so dispatch
        // stays on this thread; assembly follows route-table order
        for ctx in &contexts {
            let analysis = self
                .analyze_route(ctx, &engine)
                .context("Document generation aborted")?;

            // Strict mode aborts at the first faulting route; remaining
            // routes are not analyzed
            if self.config.strict {
                if let Some(fault) = analysis.faults.first() {
                    bail!(Error::ExtractorFault {
                        route: fault.route.clone(),
                        extractor: fault.extension.clone(),
                        message: fault.message.clone(),
                    });
                }
            }

            for (method, operation) in analysis.operations {
                assembler.add_operation(&analysis.uri, method, operation);
            }
            for (name, scheme) in analysis.security_schemes {
                assembler.add_security_scheme(&name, scheme);
            }
            faults.extend(analysis.faults);
        }

        for fault in &faults {
            warn!(
                "Fault on {} in '{}': {}",
                fault.route, fault.extension, fault.message
            );
        }

        let document = assembler.build(engine.components().snapshot());
        info!(
            "Generated document: {} paths, {} faults",
            document.paths.len(),
            faults.len()
        );
        Ok(GenerationReport { document, faults })
    }

    /// Dispatches the registry once per method of one route.
    fn analyze_route(
        &self,
        ctx: &AnalysisContext,
        engine: &SchemaEngine,
    ) -> std::result::Result<RouteAnalysis, Error> {
        let mut analysis = RouteAnalysis {
            uri: ctx.route.uri.clone(),
            operations: Vec::new(),
            security_schemes: Vec::new(),
            faults: Vec::new(),
        };

        for &method in &ctx.route.methods {
            let outcome = self.registry.run_for(ctx, method, engine)?;
            analysis.operations.push((method, outcome.operation));
            analysis.security_schemes.extend(outcome.security_schemes);
            analysis.faults.extend(outcome.faults);
        }

        Ok(analysis)
    }
}

/// Everything one route contributed to the document.
struct RouteAnalysis {
    uri: String,
    operations: Vec<(HttpMethod, Operation)>,
    security_schemes: Vec<(String, crate::document::SecurityScheme)>,
    faults: Vec<AnalysisFault>,
}

//! Per-route analysis contexts.
//!
//! An [`AnalysisContext`] bundles one route descriptor with the handler's
//! parsed body, when source resolution succeeded. It is constructed right
//! before dispatch and read-only to every extractor. A context without a
//! handler node is the designed degraded mode: AST-dependent extractors see
//! it and contribute nothing.

use crate::route::RouteInfo;
use crate::type_resolver::{HandlerFn, TypeResolver};
use log::debug;
use std::path::PathBuf;

/// The unit of work handed to every extractor.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    /// The route under analysis
    pub route: RouteInfo,
    /// The handler's parsed body, if source resolution succeeded
    pub handler: Option<HandlerFn>,
    /// The source file the handler was found in
    pub source_file: Option<PathBuf>,
}

impl AnalysisContext {
    /// A context with no resolved handler source
    pub fn without_source(route: RouteInfo) -> Self {
        Self {
            route,
            handler: None,
            source_file: None,
        }
    }

    /// Builds a context for `route`, resolving the handler body best-effort.
    ///
    /// Resolution failure is not an error; the context simply carries no AST
    /// node and AST-dependent extractors degrade to empty results.
    pub fn resolve(route: RouteInfo, resolver: &TypeResolver) -> Self {
        let Some(action) = route.action.clone() else {
            debug!("Route {} has no action, skipping source resolution", route.uri);
            return Self::without_source(route);
        };

        match resolver.find_handler(&action) {
            Some((handler, file)) => {
                debug!("Resolved handler {} in {}", action, file.path.display());
                Self {
                    route,
                    handler: Some(handler),
                    source_file: Some(file.path.clone()),
                }
            }
            None => {
                debug!("Handler {} not found in parsed sources", action);
                Self::without_source(route)
            }
        }
    }
}

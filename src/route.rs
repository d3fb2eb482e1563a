//! Route descriptors and the route-table loader.
//!
//! A [`RouteInfo`] is the immutable description of one registered endpoint.
//! Descriptors normally arrive as a JSON dump produced by the host
//! application's route loader; [`load_route_table`] reads that dump and
//! derives the path-parameter names from the URI pattern.

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// HTTP methods recognized in route tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    /// Parses a method name, case-insensitively. Unknown methods (and the
    /// pseudo-method HEAD fallback some frameworks add) map to `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "DELETE" => Some(HttpMethod::Delete),
            "PATCH" => Some(HttpMethod::Patch),
            "OPTIONS" => Some(HttpMethod::Options),
            "HEAD" => Some(HttpMethod::Head),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }
}

/// Immutable descriptor for one registered endpoint.
///
/// Created once per endpoint when the route table is loaded and never mutated
/// afterwards; every analyzer sees the same descriptor.
#[derive(Debug, Clone)]
pub struct RouteInfo {
    /// The URL path pattern (e.g., "/users/{id}")
    pub uri: String,
    /// HTTP methods registered for this path, in registration order
    pub methods: Vec<HttpMethod>,
    /// Controller (type or module) owning the handler, if known
    pub controller: Option<String>,
    /// Name of the handler function
    pub action: Option<String>,
    /// Middleware applied to the route, in application order
    pub middleware: Vec<String>,
    /// Domain constraint, if any
    pub domain: Option<String>,
    /// Path-parameter names, in the order they appear in the URI
    pub path_parameters: Vec<String>,
    /// Route name, if the application assigned one
    pub name: Option<String>,
}

impl RouteInfo {
    /// Create a descriptor for a URI and methods, deriving path parameters
    pub fn new(uri: &str, methods: Vec<HttpMethod>) -> Self {
        Self {
            path_parameters: extract_path_parameters(uri),
            uri: uri.to_string(),
            methods,
            controller: None,
            action: None,
            middleware: Vec::new(),
            domain: None,
            name: None,
        }
    }

    /// Set the handler action name
    pub fn with_action(mut self, action: &str) -> Self {
        self.action = Some(action.to_string());
        self
    }

    /// Set the middleware list
    pub fn with_middleware(mut self, middleware: Vec<String>) -> Self {
        self.middleware = middleware;
        self
    }

    /// A human-readable label used in logs and fault records
    pub fn label(&self) -> String {
        let methods: Vec<&str> = self.methods.iter().map(|m| m.as_str()).collect();
        format!("{} {}", methods.join("|"), self.uri)
    }
}

/// One record in the JSON route dump.
#[derive(Debug, Deserialize)]
struct RouteRecord {
    uri: String,
    methods: Vec<String>,
    #[serde(default)]
    controller: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    middleware: Vec<String>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// Loads a route table from a JSON dump.
///
/// Unknown method names are skipped; a record whose methods all fail to parse
/// is dropped with a warning rather than failing the load.
pub fn load_route_table(path: &Path) -> Result<Vec<RouteInfo>> {
    debug!("Loading route table from {}", path.display());

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read route table: {}", path.display()))?;
    let records: Vec<RouteRecord> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse route table: {}", path.display()))?;

    let mut routes = Vec::with_capacity(records.len());
    for record in records {
        let mut methods = Vec::new();
        for raw in &record.methods {
            match HttpMethod::parse(raw) {
                Some(method) if !methods.contains(&method) => methods.push(method),
                Some(_) => {}
                None => debug!("Skipping unknown method '{}' on {}", raw, record.uri),
            }
        }
        if methods.is_empty() {
            log::warn!("Route {} has no recognized methods, skipping", record.uri);
            continue;
        }

        routes.push(RouteInfo {
            path_parameters: extract_path_parameters(&record.uri),
            uri: record.uri,
            methods,
            controller: record.controller,
            action: record.action,
            middleware: record.middleware,
            domain: record.domain,
            name: record.name,
        });
    }

    debug!("Loaded {} routes", routes.len());
    Ok(routes)
}

/// Extracts `{param}` (and legacy `:param`) names from a URI pattern
fn extract_path_parameters(uri: &str) -> Vec<String> {
    uri.split('/')
        .filter_map(|segment| {
            if let Some(rest) = segment.strip_prefix('{') {
                rest.strip_suffix('}').map(|name| name.trim_end_matches('?').to_string())
            } else {
                segment.strip_prefix(':').map(|name| name.to_string())
            }
        })
        .collect()
}

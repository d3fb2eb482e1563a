//! Security-scheme detection from route middleware.

use crate::context::AnalysisContext;
use crate::document::SecurityScheme;
use crate::extractor::{Extension, SecurityResult, SecuritySchemeDetector};
use anyhow::Result;

/// Maps well-known authentication middleware names to security schemes.
///
/// `auth`, `auth:api`, `auth:sanctum` and similar guards map to a bearer
/// scheme; `auth.basic` maps to HTTP basic. Unrecognized middleware is
/// ignored.
#[derive(Debug, Default)]
pub struct MiddlewareSecurityDetector;

impl Extension for MiddlewareSecurityDetector {
    fn name(&self) -> &'static str {
        "middleware-security"
    }
}

impl SecuritySchemeDetector for MiddlewareSecurityDetector {
    fn detect_security(&self, ctx: &AnalysisContext) -> Result<Vec<SecurityResult>> {
        let mut results = Vec::new();

        for middleware in &ctx.route.middleware {
            let detected = if middleware == "auth.basic" {
                Some(("basicAuth", SecurityScheme::basic()))
            } else if middleware == "auth" || middleware.starts_with("auth:") {
                Some(("bearerAuth", SecurityScheme::bearer()))
            } else if middleware == "api_key" {
                Some(("apiKeyAuth", SecurityScheme::api_key("X-Api-Key")))
            } else {
                None
            };

            if let Some((name, scheme)) = detected {
                results.push(SecurityResult {
                    scheme_name: name.to_string(),
                    scheme,
                });
            }
        }

        Ok(results)
    }
}

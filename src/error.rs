/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the application.
///
/// These are the failures callers are expected to match on; everything else
/// in the pipeline reports through `anyhow` with context.
#[derive(Debug)]
pub enum Error {
    /// A component name was re-registered with a structurally different shape
    SchemaConflict { name: String },
    /// An extractor failed while strict mode was enabled
    ExtractorFault {
        route: String,
        extractor: String,
        message: String,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::SchemaConflict { name } => write!(
                f,
                "component schema '{}' registered twice with different shapes",
                name
            ),
            Error::ExtractorFault {
                route,
                extractor,
                message,
            } => write!(
                f,
                "extractor '{}' failed on route {}: {}",
                extractor, route, message
            ),
        }
    }
}

impl std::error::Error for Error {}

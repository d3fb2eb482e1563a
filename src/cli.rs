use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{debug, info};
use std::path::PathBuf;

/// Route Doc Generator - Generate OpenAPI documentation from a route table and
/// handler source code
#[derive(Parser, Debug)]
#[command(name = "routedoc")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the JSON route-table dump
    #[arg(value_name = "ROUTES_JSON")]
    pub routes_path: PathBuf,

    /// Path to the handler source directory
    #[arg(short = 's', long = "src", value_name = "DIR")]
    pub source_path: PathBuf,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// API title for the document's info block
    #[arg(long = "title", default_value = "Generated API")]
    pub title: String,

    /// API version for the document's info block
    #[arg(long = "api-version", default_value = "1.0.0")]
    pub api_version: String,

    /// Abort on the first extractor fault instead of degrading
    #[arg(long = "strict")]
    pub strict: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Validate and log already-parsed arguments
pub fn validate_args(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.routes_path.exists() {
        anyhow::bail!(
            "Route table file does not exist: {}",
            args.routes_path.display()
        );
    }
    if !args.source_path.is_dir() {
        anyhow::bail!(
            "Source path is not a directory: {}",
            args.source_path.display()
        );
    }

    info!("Route table: {}", args.routes_path.display());
    info!("Source directory: {}", args.source_path.display());
    info!("Output format: {:?}", args.output_format);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    use crate::pipeline::{GenerationPipeline, PipelineConfig};
    use crate::route::load_route_table;
    use crate::serializer::{serialize_json, serialize_yaml, write_to_file};

    info!("Starting OpenAPI document generation...");

    // Step 1: Load the route table
    info!("Loading route table...");
    let routes = load_route_table(&args.routes_path)?;
    info!("Loaded {} routes", routes.len());

    if routes.is_empty() {
        log::warn!("Route table is empty; the document will have no paths");
    }

    // Step 2: Run the analysis pipeline
    let config = PipelineConfig {
        strict: args.strict,
        title: args.title.clone(),
        version: args.api_version.clone(),
        description: Some("API documentation generated from the route table".to_string()),
    };
    let pipeline = GenerationPipeline::with_core_extensions(config);
    let report = pipeline.run(routes, &args.source_path)?;

    // Step 3: Serialize to the requested format
    info!("Serializing to {:?} format...", args.output_format);
    let content = match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&report.document)?,
        OutputFormat::Json => serialize_json(&report.document)?,
    };

    // Step 4: Output to file or stdout
    if let Some(output_path) = &args.output_path {
        write_to_file(&content, output_path)?;
        info!(
            "Successfully wrote OpenAPI document to {}",
            output_path.display()
        );
    } else {
        println!("{}", content);
    }

    // Step 5: Display summary
    info!("Generation complete!");
    info!("Summary:");
    info!("  - Paths: {}", report.document.paths.len());
    info!("  - Extractor faults: {}", report.faults.len());

    Ok(())
}

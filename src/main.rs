//! Route Doc Generator - Command-line tool for generating OpenAPI documentation.
//!
//! This binary generates an OpenAPI 3.0 document from two inputs: a JSON dump
//! of the application's route table and the directory holding the handler
//! source code. Handler bodies are statically analyzed to derive parameters,
//! request bodies, responses, and error responses.
//!
//! # Usage
//!
//! ```bash
//! routedoc [OPTIONS] <ROUTES_JSON> --src <DIR>
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation:
//! ```bash
//! routedoc routes.json --src ./src -o openapi.yaml
//! ```
//!
//! Generate JSON documentation, aborting on any extractor fault:
//! ```bash
//! routedoc routes.json --src ./src -f json --strict -o openapi.json
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use routedoc::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("Route Doc Generator starting...");

    let args = cli::validate_args(args)?;
    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}

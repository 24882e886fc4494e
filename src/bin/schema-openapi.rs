//! Schema OpenAPI CLI
//!
//! Command-line interface for generating OpenAPI documents from definitions files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use schema_openapi::{
    generate_document, load_definitions, DefinitionsFile, OpenApiGenerator, OpenApiVersion,
    SUPPORTED_VERSIONS,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-openapi")]
#[command(about = "Generate OpenAPI documents from schema definitions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a document (or its components) from a definitions file
    Generate {
        /// Definitions file
        definitions: PathBuf,

        /// Target OpenAPI version (default: the file's document.openapi, else the latest)
        #[arg(long)]
        openapi: Option<String>,

        /// Emit only {"components": ...} even when the file has document fields
        #[arg(long)]
        components_only: bool,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List supported OpenAPI versions
    Versions,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            definitions,
            openapi,
            components_only,
            output,
            pretty,
        } => run_generate(&definitions, openapi, components_only, output, pretty),

        Commands::Versions => {
            for version in SUPPORTED_VERSIONS {
                println!("{}", version);
            }
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_generate(
    path: &Path,
    openapi: Option<String>,
    components_only: bool,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let DefinitionsFile {
        document,
        definitions,
    } = load_definitions(path).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    // Version: explicit flag > document.openapi > latest
    let version_str = openapi.or_else(|| document.as_ref().map(|d| d.openapi.clone()));
    let version = match version_str {
        Some(v) => v.parse::<OpenApiVersion>().map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?,
        None => OpenApiVersion::LATEST,
    };

    let generated: Result<Value, _> = match document {
        Some(mut config) if !components_only => {
            config.openapi = version.to_string();
            generate_document(definitions, &config)
        }
        _ => OpenApiGenerator::new(definitions, version).generate_components(),
    };
    let generated = generated.map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let json_output = if pretty {
        serde_json::to_string_pretty(&generated)
    } else {
        serde_json::to_string(&generated)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

//! jsonschema-rest CLI
//!
//! Command-line interface for compiling JSON Schemas into REST API surfaces.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::Level;

use jsonschema_rest::{
    blank_object, check_schema, dereference, is_url, load_schema, load_schema_auto, to_component,
    BuildConfig, JsonSchemaController, Plugin, PluginOptions, SurfaceBuilder,
};

#[derive(Parser)]
#[command(name = "jsonschema-rest")]
#[command(about = "Compile JSON Schemas into REST resource paths")]
#[command(version)]
struct Cli {
    /// Log compiler decisions to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile schemas into OpenAPI paths and component schemas
    Generate {
        /// Schema source: file path or URL (http:// or https://)
        #[arg(required_unless_present = "config")]
        schema: Option<String>,

        /// Path prefix for the compiled paths
        #[arg(long, default_value = "", conflicts_with = "config")]
        base_url: String,

        /// Dispatch entry name bound into every path
        #[arg(long)]
        controller: Option<String>,

        /// OpenAPI 3.x document to merge the result into
        #[arg(long)]
        doc: Option<PathBuf>,

        /// Build configuration listing several schemas
        #[arg(long, conflicts_with = "schema")]
        config: Option<PathBuf>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the blank instance of a schema
    Blank {
        /// Schema source: file path or URL
        schema: String,

        #[arg(long)]
        pretty: bool,
    },

    /// Print the OpenAPI component definition of a schema
    Component {
        /// Schema source: file path or URL
        schema: String,

        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            Level::DEBUG
        } else {
            Level::WARN
        })
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Generate {
            schema,
            base_url,
            controller,
            doc,
            config,
            output,
            pretty,
        } => run_generate(GenerateArgs {
            schema,
            base_url,
            controller,
            doc,
            config,
            output,
            pretty,
        }),
        Commands::Blank { schema, pretty } => {
            load_resolved(&schema).and_then(|s| emit(&blank_object(&s), None, pretty))
        }
        Commands::Component { schema, pretty } => {
            load_resolved(&schema).and_then(|s| emit(&to_component(&s), None, pretty))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

struct GenerateArgs {
    schema: Option<String>,
    base_url: String,
    controller: Option<String>,
    doc: Option<PathBuf>,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    pretty: bool,
}

fn run_generate(args: GenerateArgs) -> Result<(), u8> {
    let (options, config_controller, config_doc) = match (&args.config, &args.schema) {
        (Some(path), _) => {
            let config = BuildConfig::load(path).map_err(|e| {
                eprintln!("Error: {}", e);
                e.exit_code() as u8
            })?;
            let options = config.plugin_options().map_err(|e| {
                eprintln!("Error: {}", e);
                e.exit_code() as u8
            })?;
            (options, config.controller, config.document)
        }
        (None, Some(source)) => {
            let mut options = PluginOptions::new();
            options.add_schema(load_resolved(source)?, args.base_url.as_str());
            (options, None, None)
        }
        (None, None) => {
            eprintln!("Error: a schema or --config is required");
            return Err(2);
        }
    };

    for source in &options.schemas {
        check_schema(&source.schema).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;
    }

    let controller = args.controller.or(config_controller);
    let result = match args.doc.or(config_doc) {
        Some(doc_path) => {
            let mut doc = load_schema(&doc_path).map_err(|e| {
                eprintln!("Error: {}", e);
                e.exit_code() as u8
            })?;
            let plugin = match controller {
                Some(name) => Plugin::with_name(&mut doc, &options, name),
                None => Plugin::new(&mut doc, &options),
            };
            plugin.map(|_| doc)
        }
        None => {
            let name = controller.unwrap_or_else(|| JsonSchemaController::new().name().to_string());
            options
                .schemas
                .iter()
                .try_fold(SurfaceBuilder::new(name), |builder, source| {
                    builder.add_schema(&source.schema, &source.base_url)
                })
                .map(|builder| builder.build().to_openapi())
        }
    };

    let compiled = result.map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    emit(&compiled, args.output.as_deref(), args.pretty)
}

/// Load a schema and inline its `$ref`s.
fn load_resolved(source: &str) -> Result<Value, u8> {
    let schema = load_schema_auto(source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let base_dir = if is_url(source) {
        Path::new(".")
    } else {
        Path::new(source).parent().unwrap_or(Path::new("."))
    };
    dereference(&schema, base_dir).map_err(|e| {
        eprintln!("Error dereferencing {}: {}", source, e);
        e.exit_code() as u8
    })
}

fn emit(value: &Value, output: Option<&Path>, pretty: bool) -> Result<(), u8> {
    let json_output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(path, &json_output).map_err(|e| {
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

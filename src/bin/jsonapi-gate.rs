//! JSON:API gate CLI
//!
//! Command-line interface for checking documents and query strings against
//! a registry description.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use jsonapi_gate::{
    coerce_attributes, load_registry, validate_document, validate_query, Operation, QueryError,
    QueryParams, SchemaRegistry, Violation,
};

#[derive(Parser)]
#[command(name = "jsonapi-gate")]
#[command(about = "Validate JSON:API documents and query strings against a schema registry")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a write document against the envelope rules and coerce its attributes
    CheckDoc {
        /// Document file to check
        document: PathBuf,

        /// Registry description file
        #[arg(long)]
        registry: PathBuf,

        /// Resource type the document targets
        #[arg(long = "type")]
        resource_type: String,

        /// HTTP method of the request (decides whether `id` is optional)
        #[arg(long, default_value = "POST")]
        method: String,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Check a query string and print the translated fetch specification
    CheckQuery {
        /// Raw query string (e.g. "include=comments&fields[posts]=title,comments")
        #[arg(default_value = "")]
        query: String,

        /// Registry description file
        #[arg(long)]
        registry: PathBuf,

        /// Resource type the request targets
        #[arg(long = "type")]
        resource_type: String,

        /// Target a single resource by id
        #[arg(long)]
        id: Option<String>,

        /// Related sub-resource name
        #[arg(long)]
        relationship: Option<String>,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print the schemas built from a registry description
    Describe {
        /// Registry description file
        registry: PathBuf,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::CheckDoc {
            document,
            registry,
            resource_type,
            method,
            json,
        } => run_check_doc(&document, &registry, &resource_type, &method, json),

        Commands::CheckQuery {
            query,
            registry,
            resource_type,
            id,
            relationship,
            json,
            pretty,
        } => run_check_query(
            &query,
            &registry,
            &resource_type,
            id.as_deref(),
            relationship.as_deref(),
            json,
            pretty,
        ),

        Commands::Describe { registry, pretty } => run_describe(&registry, pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_check_doc(
    document_path: &Path,
    registry_path: &Path,
    resource_type: &str,
    method: &str,
    json_output: bool,
) -> Result<(), u8> {
    let registry = open_registry(registry_path)?;
    let document = read_json(document_path)?;

    let Some(operation) = Operation::from_method(method) else {
        eprintln!("Error: unknown method: {}", method);
        return Err(2);
    };

    let Some(schema) = registry.get(resource_type) else {
        eprintln!("Error: unknown resource type: {}", resource_type);
        return Err(2);
    };

    if !schema.operation_allowed(operation) {
        report_error(
            json_output,
            &format!("operation not allowed for resource type {}", resource_type),
        );
        return Err(1);
    }

    let mut violations = validate_document(&document, operation);

    // Coercion runs only on a structurally sound document.
    if violations.is_empty() {
        let (_, coercion) = coerce_attributes(schema, &document);
        violations = coercion;
    }

    if violations.is_empty() {
        if json_output {
            println!(r#"{{"valid":true}}"#);
        } else {
            println!("Valid");
        }
        Ok(())
    } else {
        report_violations(json_output, &violations);
        Err(1)
    }
}

fn run_check_query(
    query: &str,
    registry_path: &Path,
    resource_type: &str,
    id: Option<&str>,
    relationship: Option<&str>,
    json_output: bool,
    pretty: bool,
) -> Result<(), u8> {
    let registry = open_registry(registry_path)?;
    let params = QueryParams::parse(query);

    match validate_query(&registry, resource_type, id, relationship, &params) {
        Ok(spec) => {
            print_json(&spec, pretty)?;
            Ok(())
        }
        Err(QueryError::Invalid(violations)) => {
            report_violations(json_output, &violations);
            Err(1)
        }
        Err(e) => {
            report_error(json_output, &e.to_string());
            Err(e.exit_code() as u8)
        }
    }
}

fn run_describe(registry_path: &Path, pretty: bool) -> Result<(), u8> {
    let registry = open_registry(registry_path)?;
    print_json(&registry, pretty)
}

fn open_registry(path: &Path) -> Result<SchemaRegistry, u8> {
    load_registry(path).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn read_json(path: &Path) -> Result<serde_json::Value, u8> {
    if !path.exists() {
        eprintln!("Error: file not found: {}", path.display());
        return Err(3);
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        eprintln!("Error: cannot read {}: {}", path.display(), e);
        3u8
    })?;

    serde_json::from_str(&content).map_err(|e| {
        eprintln!("Error: invalid JSON: {}", e);
        2u8
    })
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<(), u8> {
    let output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    println!("{}", output);
    Ok(())
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!(r#"{{"valid":false,"error":"{}"}}"#, msg);
    } else {
        eprintln!("Error: {}", msg);
    }
}

fn report_violations(json_output: bool, violations: &[Violation]) {
    if json_output {
        let output = serde_json::json!({
            "valid": false,
            "errors": violations
        });
        println!("{}", output);
    } else {
        eprintln!("Validation failed:");
        for violation in violations {
            eprintln!("  {}", violation);
        }
    }
}

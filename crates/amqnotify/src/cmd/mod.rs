use std::path::PathBuf;
use std::sync::Arc;

use amqnotify_schema::{RegistryConfig, SchemaRegistry, SCHEMA_DIR_ENV};
use clap::{Args, Subcommand};
use serde_json::Value;

use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, USAGE};
use crate::output::OutputFormat;

pub mod schemas;
pub mod send;
pub mod validate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build notifications from a JSON document and publish them.
    Send(SendArgs),
    /// Check a JSON document against a schema.
    Validate(ValidateArgs),
    /// List schemas known to the registry.
    Schemas(SchemasArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Validate(args) => validate::run(args, format),
        Command::Schemas(args) => schemas::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Where the input document comes from.
#[derive(Args, Debug)]
pub struct DocumentArgs {
    /// Inline JSON document.
    #[arg(long, conflicts_with = "file")]
    pub json: Option<String>,
    /// Read the JSON document from a file.
    #[arg(long, conflicts_with = "json")]
    pub file: Option<PathBuf>,
}

impl DocumentArgs {
    pub fn read(&self) -> CliResult<Value> {
        let text = match (&self.json, &self.file) {
            (Some(json), _) => json.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?,
            (None, None) => return Err(CliError::new(USAGE, "one of --json or --file is required")),
        };
        serde_json::from_str(&text)
            .map_err(|err| CliError::new(DATA_INVALID, format!("document is not valid JSON: {err}")))
    }
}

/// Where schemas are looked up besides literal file paths.
#[derive(Args, Debug)]
pub struct RegistryArgs {
    /// Directory of schema files.
    #[arg(long, value_name = "DIR", env = SCHEMA_DIR_ENV)]
    pub schema_dir: Option<PathBuf>,
    /// Also load `*.schema.json` JSON Schema documents.
    #[arg(long)]
    pub include_json_schemas: bool,
}

impl RegistryArgs {
    pub fn registry(&self) -> Arc<SchemaRegistry> {
        let mut config = RegistryConfig {
            include_json_schemas: self.include_json_schemas,
            ..RegistryConfig::default()
        };
        if let Some(dir) = &self.schema_dir {
            config = config.with_directory(dir);
        }
        Arc::new(SchemaRegistry::with_config(config))
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Destination topic.
    #[arg(long, short = 't')]
    pub topic: String,
    /// Producer name placed in headers and metadata.
    #[arg(long, short = 'p')]
    pub producer: String,
    /// Notification type header.
    #[arg(long = "type", value_name = "TYPE")]
    pub doc_type: String,
    #[command(flatten)]
    pub document: DocumentArgs,
    /// Broker endpoint as host:port (repeatable). Defaults to the CERN broker.
    #[arg(long = "endpoint", value_name = "HOST:PORT")]
    pub endpoints: Vec<String>,
    /// Broker login. Ignored when a client certificate is given.
    #[arg(long, env = "AMQNOTIFY_USERNAME")]
    pub username: Option<String>,
    /// Broker passcode.
    #[arg(long, env = "AMQNOTIFY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// Client certificate (PEM) for TLS authentication.
    #[arg(long, value_name = "FILE", requires = "key")]
    pub cert: Option<PathBuf>,
    /// Client private key (PEM).
    #[arg(long, value_name = "FILE", requires = "cert")]
    pub key: Option<PathBuf>,
    /// CA bundle used to verify the broker.
    #[arg(long, value_name = "FILE")]
    pub ca: Option<PathBuf>,
    /// Schema name or path to validate against.
    #[arg(long)]
    pub schema: Option<String>,
    #[command(flatten)]
    pub registry: RegistryArgs,
    /// Remove keys whose value the schema rejects.
    #[arg(long)]
    pub drop_offending: bool,
    /// Remove keys the schema does not know.
    #[arg(long)]
    pub drop_unknown: bool,
    /// Document id (applies to every notification).
    #[arg(long)]
    pub doc_id: Option<String>,
    /// Body key holding the payload.
    #[arg(long, default_value = "data", conflicts_with = "merge")]
    pub data_subfield: String,
    /// Merge payload keys into the body instead of nesting them.
    #[arg(long)]
    pub merge: bool,
    /// Extra header as NAME=VALUE (repeatable).
    #[arg(long = "header", value_name = "NAME=VALUE")]
    pub headers: Vec<String>,
    /// Socket timeout for connect, reads and writes (e.g. 5s, 500ms).
    #[arg(long, default_value = "10s")]
    pub timeout: String,
    /// Build and print notifications without connecting.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Schema name or path.
    #[arg(long)]
    pub schema: String,
    #[command(flatten)]
    pub document: DocumentArgs,
    #[command(flatten)]
    pub registry: RegistryArgs,
}

#[derive(Args, Debug)]
pub struct SchemasArgs {
    #[command(flatten)]
    pub registry: RegistryArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

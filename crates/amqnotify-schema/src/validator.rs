use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::cache::{LocalSchemaCache, SchemaReader};
use crate::config::ValidationLevel;
use crate::document::{SchemaDocument, ValidationReport};
use crate::error::{Result, SchemaError};
use crate::registry::SchemaRegistry;

macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            ValidationLevel::Error => error!($($arg)+),
            ValidationLevel::Warn => warn!($($arg)+),
            ValidationLevel::Info => info!($($arg)+),
            ValidationLevel::Debug => debug!($($arg)+),
        }
    };
}

/// Resolves schema names and classifies document keys against them.
pub struct SchemaValidator {
    local: LocalSchemaCache,
    registry: Arc<SchemaRegistry>,
    level: ValidationLevel,
}

impl SchemaValidator {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            local: LocalSchemaCache::new(),
            registry,
            level: ValidationLevel::default(),
        }
    }

    /// Replace the local file reader.
    pub fn with_reader(mut self, reader: Box<dyn SchemaReader>) -> Self {
        self.local = LocalSchemaCache::with_reader(reader);
        self
    }

    /// Log level used for validation findings.
    pub fn with_level(mut self, level: ValidationLevel) -> Self {
        self.level = level;
        self
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn level(&self) -> ValidationLevel {
        self.level
    }

    /// Find the schema for `name`: a local file at that path first, then the
    /// shared registry by exact key or base name.
    pub fn resolve(&self, name: &str) -> Result<Arc<SchemaDocument>> {
        match self.local.get_or_load(name) {
            Ok(Some(document)) => return Ok(document),
            Ok(None) => {}
            Err(err) => error!(schema = name, error = %err, "unable to load local schema"),
        }

        match self.registry.find(name) {
            Some((key, document)) => {
                debug!(schema = name, entry = %key, "resolved schema from registry");
                Ok(document)
            }
            None => Err(SchemaError::NotFound(name.to_string())),
        }
    }

    /// Validate `document` against `schema`.
    ///
    /// Returns `None` when the schema cannot be resolved; the failure is logged.
    pub fn validate(&self, document: &Map<String, Value>, schema: &str) -> Option<ValidationReport> {
        let resolved = match self.resolve(schema) {
            Ok(resolved) => resolved,
            Err(err) => {
                error!(schema, error = %err, "schema not found, document not validated");
                return None;
            }
        };

        let report = resolved.validate(document);
        if !report.offending.is_empty() {
            log_at!(self.level, schema, keys = ?report.offending, "offending keys");
        }
        if !report.unknown.is_empty() {
            log_at!(self.level, schema, keys = ?report.unknown, "unknown keys");
        }
        Some(report)
    }

    /// Parse `text` as a JSON object and validate it.
    pub fn validate_json(&self, text: &str, schema: &str) -> Result<Option<ValidationReport>> {
        let value: Value = serde_json::from_str(text)?;
        match value {
            Value::Object(document) => Ok(self.validate(&document, schema)),
            _ => Err(SchemaError::malformed("document", "expected a JSON object")),
        }
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new(Arc::new(SchemaRegistry::new()))
    }
}

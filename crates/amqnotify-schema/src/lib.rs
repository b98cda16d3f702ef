//! Schema resolution and document validation.
//!
//! A schema name is resolved first as a local file path (cached after the
//! first successful load), then against a shared [`SchemaRegistry`] of
//! schema directories that refreshes itself periodically.
//!
//! Validation never fails a document outright: it reports *offending* keys
//! (value not allowed by the schema) and *unknown* keys (absent from the
//! schema) and leaves the decision to the caller.

pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod registry;
pub mod rules;
pub mod validator;

pub use cache::{FsReader, LocalSchemaCache, SchemaReader};
pub use config::{RegistryConfig, ValidationLevel, SCHEMA_DIR_ENV};
pub use document::{SchemaDocument, ValidationReport};
pub use error::{Result, SchemaError};
pub use registry::SchemaRegistry;
pub use rules::{KeyRules, SchemaSource, CLASSADS_SCHEMA_ENV};
pub use validator::SchemaValidator;

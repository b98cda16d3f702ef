use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming an extra directory of schema files.
pub const SCHEMA_DIR_ENV: &str = "AMQNOTIFY_SCHEMA_DIR";

/// Controls where the shared registry finds schemas and how often it reloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Reload directories once the snapshot is older than this.
    pub refresh_interval: Duration,
    /// Also load `*.schema.json` JSON Schema documents.
    pub include_json_schemas: bool,
    /// Directories scanned on every refresh, in order.
    pub directories: Vec<PathBuf>,
    /// Maximum number of schemas loaded from a directory.
    pub max_schemas_from_directory: usize,
    /// Maximum bytes allowed per schema file loaded from a directory.
    pub max_schema_file_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(3600),
            include_json_schemas: false,
            directories: Vec::new(),
            max_schemas_from_directory: 256,
            max_schema_file_size: 256 * 1024,
        }
    }
}

impl RegistryConfig {
    /// Default config plus the directory named by `AMQNOTIFY_SCHEMA_DIR`, if set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dir) = std::env::var_os(SCHEMA_DIR_ENV).filter(|dir| !dir.is_empty()) {
            config.directories.push(PathBuf::from(dir));
        }
        config
    }

    /// Append a schema directory.
    pub fn with_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directories.push(dir.into());
        self
    }
}

/// Log severity used to report validation findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
}

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use tracing::{debug, error, warn};

use crate::config::RegistryConfig;
use crate::document::SchemaDocument;
use crate::error::{Result, SchemaError};

type SchemaMap = BTreeMap<String, Arc<SchemaDocument>>;

struct Snapshot {
    schemas: Arc<SchemaMap>,
    loaded_at: Option<Instant>,
}

/// Shared, periodically refreshed set of named schemas.
///
/// Entries come from schemas registered in code plus every `*.json` file in
/// the configured directories (keyed by file path). The directory scan is
/// repeated lazily once the snapshot is older than
/// [`RegistryConfig::refresh_interval`]. Readers always see a complete
/// snapshot; a refresh swaps it in atomically.
pub struct SchemaRegistry {
    config: RegistryConfig,
    embedded: SchemaMap,
    state: RwLock<Snapshot>,
    refresh_lock: Mutex<()>,
}

impl SchemaRegistry {
    /// Create an empty registry with default config.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with explicit config. Nothing is loaded until first use.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            embedded: SchemaMap::new(),
            state: RwLock::new(Snapshot {
                schemas: Arc::new(SchemaMap::new()),
                loaded_at: None,
            }),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Registry over a single directory.
    pub fn from_directory(path: impl AsRef<Path>) -> Self {
        Self::with_config(RegistryConfig::default().with_directory(path.as_ref()))
    }

    /// Load from embedded `(name, schema_json)` pairs.
    pub fn from_embedded(schemas: &[(&str, &str)]) -> Result<Self> {
        let mut registry = Self::new();
        for (name, schema) in schemas {
            registry.register(name, schema)?;
        }
        Ok(registry)
    }

    /// Register a schema under `name`. It survives every refresh.
    pub fn register(&mut self, name: &str, schema_json: &str) -> Result<()> {
        let document = SchemaDocument::parse(name, schema_json)?;
        self.embedded.insert(name.to_string(), Arc::new(document));
        self.state_mut().loaded_at = None;
        Ok(())
    }

    /// Current schemas, refreshing first if the snapshot is stale.
    pub fn schemas(&self) -> Arc<SchemaMap> {
        {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            if !self.is_stale(&state) {
                return Arc::clone(&state.schemas);
            }
        }

        let _guard = self.refresh_lock.lock().unwrap_or_else(PoisonError::into_inner);
        {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            if !self.is_stale(&state) {
                return Arc::clone(&state.schemas);
            }
        }
        self.reload()
    }

    /// Reload every directory now, regardless of age. Returns the entry count.
    pub fn refresh(&self) -> usize {
        let _guard = self.refresh_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.reload().len()
    }

    /// Find a schema whose key, file name, or base file name up to the first
    /// `.` equals `name`. Keys are searched in sorted order.
    pub fn find(&self, name: &str) -> Option<(String, Arc<SchemaDocument>)> {
        self.schemas()
            .iter()
            .find(|(key, _)| {
                key.as_str() == name || file_name(key) == name || base_name(key) == name
            })
            .map(|(key, document)| (key.clone(), Arc::clone(document)))
    }

    /// Registered schema keys, sorted.
    pub fn names(&self) -> Vec<String> {
        self.schemas().keys().cloned().collect()
    }

    /// Get registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn is_stale(&self, state: &Snapshot) -> bool {
        state
            .loaded_at
            .is_none_or(|loaded| loaded.elapsed() >= self.config.refresh_interval)
    }

    fn state_mut(&mut self) -> &mut Snapshot {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    fn reload(&self) -> Arc<SchemaMap> {
        let mut schemas = self.embedded.clone();
        for dir in &self.config.directories {
            match load_directory(dir, &self.config) {
                Ok(loaded) => schemas.extend(loaded),
                Err(err) => warn!(dir = %dir.display(), error = %err, "skipping schema directory"),
            }
        }
        debug!(count = schemas.len(), "schema registry refreshed");

        let schemas = Arc::new(schemas);
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.schemas = Arc::clone(&schemas);
        state.loaded_at = Some(Instant::now());
        schemas
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn file_name(key: &str) -> &str {
    Path::new(key)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(key)
}

fn base_name(key: &str) -> &str {
    let file_name = file_name(key);
    file_name.split('.').next().unwrap_or(file_name)
}

fn load_directory(path: &Path, config: &RegistryConfig) -> Result<SchemaMap> {
    let entries = std::fs::read_dir(path)
        .map_err(|err| SchemaError::LoadFailed(format!("{}: {err}", path.display())))?;

    let mut schemas = SchemaMap::new();
    for entry in entries {
        let entry = entry.map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        if !file_name.to_ascii_lowercase().ends_with(".json") {
            continue;
        }
        if SchemaDocument::is_json_schema_name(&file_name) && !config.include_json_schemas {
            continue;
        }

        let entry_path = entry.path();
        let file_type = std::fs::symlink_metadata(&entry_path)
            .map_err(|err| SchemaError::LoadFailed(err.to_string()))?
            .file_type();
        if file_type.is_symlink() {
            warn!(path = %entry_path.display(), "refusing to load schema symlink");
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        if schemas.len() >= config.max_schemas_from_directory {
            return Err(SchemaError::LoadFailed(format!(
                "schema count exceeds configured max ({}) in {}",
                config.max_schemas_from_directory,
                path.display()
            )));
        }

        let key = entry_path.display().to_string();
        let content = match read_limited(&entry_path, config.max_schema_file_size) {
            Ok(content) => content,
            Err(err) => {
                error!(schema = %key, error = %err, "failed to read schema");
                continue;
            }
        };
        match SchemaDocument::parse(&key, &content) {
            Ok(document) => {
                schemas.insert(key, Arc::new(document));
            }
            Err(err) => error!(schema = %key, error = %err, "skipping malformed schema"),
        }
    }

    Ok(schemas)
}

fn read_limited(path: &Path, max_bytes: usize) -> Result<String> {
    let file = std::fs::File::open(path)
        .map_err(|err| SchemaError::LoadFailed(format!("{}: {err}", path.display())))?;
    let read_limit = u64::try_from(max_bytes.saturating_add(1)).unwrap_or(u64::MAX);
    let mut content = String::new();
    file.take(read_limit)
        .read_to_string(&mut content)
        .map_err(|err| SchemaError::LoadFailed(format!("{}: {err}", path.display())))?;
    if content.len() > max_bytes {
        return Err(SchemaError::LoadFailed(format!(
            "schema file too large (max {max_bytes} bytes): {}",
            path.display()
        )));
    }
    Ok(content)
}

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::document::SchemaDocument;
use crate::error::{Result, SchemaError};

/// Source of local schema file contents.
pub trait SchemaReader: Send + Sync {
    fn read(&self, path: &Path) -> std::io::Result<String>;
}

/// Reads schema files from the filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsReader;

impl SchemaReader for FsReader {
    fn read(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Lazily populated cache of schemas loaded from literal file paths.
///
/// Entries are keyed by the exact name they were requested with. A file is
/// read at most once per successful load; concurrent first requests for the
/// same name serialize on the load lock and re-check before reading.
/// Missing and malformed files are not cached.
pub struct LocalSchemaCache {
    reader: Box<dyn SchemaReader>,
    entries: RwLock<HashMap<String, Arc<SchemaDocument>>>,
    load_lock: Mutex<()>,
}

impl LocalSchemaCache {
    pub fn new() -> Self {
        Self::with_reader(Box::new(FsReader))
    }

    pub fn with_reader(reader: Box<dyn SchemaReader>) -> Self {
        Self {
            reader,
            entries: RwLock::new(HashMap::new()),
            load_lock: Mutex::new(()),
        }
    }

    /// Cached schema for `name`, loading the file at that path on first use.
    ///
    /// Returns `Ok(None)` when no file exists at the path.
    pub fn get_or_load(&self, name: &str) -> Result<Option<Arc<SchemaDocument>>> {
        if let Some(hit) = self.cached(name) {
            return Ok(Some(hit));
        }

        let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = self.cached(name) {
            return Ok(Some(hit));
        }

        let text = match self.reader.read(Path::new(name)) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) if err.kind() == ErrorKind::IsADirectory => return Ok(None),
            Err(err) => return Err(SchemaError::LoadFailed(format!("{name}: {err}"))),
        };

        let document = match SchemaDocument::parse(name, &text) {
            Ok(document) => Arc::new(document),
            Err(err) => {
                warn!(schema = name, "local schema is not json compliant");
                return Err(err);
            }
        };

        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), Arc::clone(&document));
        debug!(schema = name, "loaded local schema");
        Ok(Some(document))
    }

    /// Whether `name` is already cached.
    pub fn contains(&self, name: &str) -> bool {
        self.cached(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached(&self, name: &str) -> Option<Arc<SchemaDocument>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

impl Default for LocalSchemaCache {
    fn default() -> Self {
        Self::new()
    }
}

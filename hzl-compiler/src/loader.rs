//! Definition loading and compiled output writing
//!
//! Definitions live at `<base_dir>/<namespace>/<name>.yaml`. Compiled sets
//! are written with the same layout under the output directory, so a
//! compiled set can be referenced by later virtual sets.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use hzl_common::{DefinitionRef, Document, Error, PartialStateSet, Result};
use tracing::{debug, info};

/// Resolves a namespace + name reference to a parsed document
pub trait Loader {
    fn load(&self, reference: &DefinitionRef) -> Result<Document>;
}

/// `<namespace>/<name>.yaml` under `root`
pub fn definition_path(root: &Path, reference: &DefinitionRef) -> PathBuf {
    root.join(&reference.namespace)
        .join(format!("{}.yaml", reference.name))
}

/// Parse a document from YAML text
pub fn parse_document(text: &str) -> Result<Document> {
    serde_yaml::from_str(text).map_err(|e| Error::Parse(e.to_string()))
}

/// Read and parse a document from disk
pub fn read_document(path: &Path) -> Result<Document> {
    let text = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(path.display().to_string())
        } else {
            Error::Io(e)
        }
    })?;
    parse_document(&text).map_err(|e| match e {
        Error::Parse(msg) => Error::Parse(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

/// Loads definitions from a directory tree
#[derive(Debug, Clone)]
pub struct FileLoader {
    base_dir: PathBuf,
}

impl FileLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl Loader for FileLoader {
    fn load(&self, reference: &DefinitionRef) -> Result<Document> {
        let path = definition_path(&self.base_dir, reference);
        debug!("Loading {} from {}", reference, path.display());
        read_document(&path)
    }
}

/// In-memory definitions keyed by reference
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    documents: HashMap<DefinitionRef, Document>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, reference: DefinitionRef, document: Document) {
        self.documents.insert(reference, document);
    }

    /// Builder-style insert
    pub fn with(mut self, namespace: &str, name: &str, document: Document) -> Self {
        self.insert(DefinitionRef::new(namespace, name), document);
        self
    }
}

impl Loader for MemoryLoader {
    fn load(&self, reference: &DefinitionRef) -> Result<Document> {
        self.documents
            .get(reference)
            .cloned()
            .ok_or_else(|| Error::NotFound(reference.to_string()))
    }
}

/// Serialize a compiled set under its `partial_state_set` top-level key
pub fn to_yaml_string(set: &PartialStateSet) -> Result<String> {
    serde_yaml::to_string(&Document::PartialStateSet(set.clone())).map_err(|e| Error::Parse(e.to_string()))
}

/// Write `<output_dir>/<namespace>/<name>.yaml`, creating directories as needed
pub fn write_partial_state_set(set: &PartialStateSet, output_dir: &Path) -> Result<PathBuf> {
    let path = definition_path(output_dir, &DefinitionRef::new(&set.namespace, &set.name));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, to_yaml_string(set)?)?;
    info!("Compiled partial state set {} written to {}", set.id(), path.display());
    Ok(path)
}

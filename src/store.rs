use std::collections::HashSet;
use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::error::ReportError;

const DOWNLOAD_DIR: &str = "downloads";
const EXTRACT_DIR: &str = "descompactados";
const OUTPUT_DIR: &str = "relatorios";
const DOWNLOADS_STATE: &str = "historico_downloads.json";
const EXTRACTED_STATE: &str = "historico_descompactados.json";

/// Directory layout of one pipeline root.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: Utf8PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn download_dir(&self) -> Utf8PathBuf {
        self.root.join(DOWNLOAD_DIR)
    }

    pub fn extract_dir(&self) -> Utf8PathBuf {
        self.root.join(EXTRACT_DIR)
    }

    pub fn output_dir(&self) -> Utf8PathBuf {
        self.root.join(OUTPUT_DIR)
    }

    pub fn state_path(&self, key: StateKey) -> Utf8PathBuf {
        self.root.join(key.file_name())
    }

    pub fn state_store(&self) -> StateStore {
        StateStore::new(self.root.clone())
    }

    pub fn ensure_dirs(&self) -> Result<(), ReportError> {
        for dir in [self.download_dir(), self.extract_dir(), self.output_dir()] {
            fs::create_dir_all(dir.as_std_path())
                .map_err(|err| ReportError::Filesystem(format!("create {dir}: {err}")))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    Downloads,
    Extracted,
}

impl StateKey {
    pub fn file_name(self) -> &'static str {
        match self {
            StateKey::Downloads => DOWNLOADS_STATE,
            StateKey::Extracted => EXTRACTED_STATE,
        }
    }
}

/// Identifiers of work items that are already done.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedSet {
    items: HashSet<String>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains(id)
    }

    /// Returns false if the identifier was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.items.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Identifiers in ascending order.
    pub fn sorted(&self) -> Vec<&str> {
        let mut items = self.items.iter().map(String::as_str).collect::<Vec<_>>();
        items.sort_unstable();
        items
    }
}

impl FromIterator<String> for ProcessedSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// Persists [`ProcessedSet`]s as JSON string arrays under one directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: Utf8PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, key: StateKey) -> Utf8PathBuf {
        self.dir.join(key.file_name())
    }

    /// A missing state file is an empty set.
    pub fn load(&self, key: StateKey) -> Result<ProcessedSet, ReportError> {
        let path = self.path(key);
        if !path.as_std_path().exists() {
            return Ok(ProcessedSet::new());
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| ReportError::State(format!("read {path}: {err}")))?;
        let items: Vec<String> = serde_json::from_str(&content)
            .map_err(|err| ReportError::State(format!("parse {path}: {err}")))?;
        Ok(items.into_iter().collect())
    }

    /// Rewrites the whole file through a sibling temp file.
    pub fn save(&self, key: StateKey, set: &ProcessedSet) -> Result<(), ReportError> {
        let path = self.path(key);
        fs::create_dir_all(self.dir.as_std_path())
            .map_err(|err| ReportError::State(format!("create {}: {err}", self.dir)))?;
        let content = serde_json::to_vec_pretty(&set.sorted())
            .map_err(|err| ReportError::State(err.to_string()))?;
        write_atomic(&path, &content)
    }
}

pub fn write_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), ReportError> {
    let parent = path
        .parent()
        .ok_or_else(|| ReportError::Filesystem(format!("invalid path {path}")))?;
    let mut temp = Builder::new()
        .prefix(".consumidor-reports")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| ReportError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| ReportError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| ReportError::Filesystem(format!("persist {path}: {err}")))?;
    Ok(())
}

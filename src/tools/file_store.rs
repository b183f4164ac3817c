use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Source and sink of file content for file-editing tool approval.
pub trait FileStore: Send + Sync {
    /// Current content, or `None` if the file does not exist yet.
    fn fetch(&self, path: &str) -> Result<Option<String>>;

    fn persist(&self, path: &str, content: &str) -> Result<()>;
}

/// Files under one working directory. Paths that would escape it are
/// rejected.
pub struct WorkspaceFileStore {
    working_dir: PathBuf,
    canonical_working_dir: PathBuf,
}

impl WorkspaceFileStore {
    pub fn new(working_dir: PathBuf) -> Self {
        let canonical_working_dir =
            fs::canonicalize(&working_dir).unwrap_or_else(|_| working_dir.clone());
        Self {
            working_dir,
            canonical_working_dir,
        }
    }

    fn resolve_path(&self, path: &str) -> Result<PathBuf> {
        let path = path.trim();
        if path.is_empty() {
            bail!("empty path");
        }
        if path.starts_with('/') || path.contains('\\') {
            bail!("absolute or platform-specific path not allowed: {path}");
        }

        let relative_path = Path::new(path);
        if relative_path
            .components()
            .any(|component| matches!(component, Component::ParentDir))
        {
            bail!("path traversal detected: {path}");
        }

        let requested = self.working_dir.join(relative_path);
        self.ensure_path_is_within_workspace(&requested)?;
        Ok(requested)
    }

    fn ensure_path_is_within_workspace(&self, path: &Path) -> Result<()> {
        let guard_path = nearest_existing_ancestor(path)
            .context("could not find an existing parent path")?;

        let canonical_guard = fs::canonicalize(guard_path)
            .with_context(|| format!("failed to canonicalize {}", guard_path.display()))?;
        if !canonical_guard.starts_with(&self.canonical_working_dir) {
            bail!(
                "path escapes working directory via symlink: {}",
                path.display()
            );
        }
        Ok(())
    }
}

impl FileStore for WorkspaceFileStore {
    fn fetch(&self, path: &str) -> Result<Option<String>> {
        let resolved = self.resolve_path(path)?;
        match fs::read_to_string(&resolved) {
            Ok(content) => Ok(Some(content)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => {
                Err(error).with_context(|| format!("failed to read {}", resolved.display()))
            }
        }
    }

    fn persist(&self, path: &str, content: &str) -> Result<()> {
        let resolved = self.resolve_path(path)?;
        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&resolved, content)
            .with_context(|| format!("failed to write {}", resolved.display()))
    }
}

fn nearest_existing_ancestor(path: &Path) -> Option<&Path> {
    let mut current = path;
    while !current.exists() {
        current = current.parent()?;
    }
    Some(current)
}

/// In-memory store; clones share the same files.
#[derive(Clone, Default)]
pub struct MemoryFileStore {
    files: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<String>, content: impl Into<String>) -> Self {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.into(), content.into());
        }
        self
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.files.lock().ok()?.get(path).cloned()
    }
}

impl FileStore for MemoryFileStore {
    fn fetch(&self, path: &str) -> Result<Option<String>> {
        let files = self
            .files
            .lock()
            .map_err(|_| anyhow::anyhow!("file map poisoned"))?;
        Ok(files.get(path).cloned())
    }

    fn persist(&self, path: &str, content: &str) -> Result<()> {
        let mut files = self
            .files
            .lock()
            .map_err(|_| anyhow::anyhow!("file map poisoned"))?;
        files.insert(path.to_string(), content.to_string());
        Ok(())
    }
}

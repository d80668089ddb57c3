//! Sandboxed file operations for the file browser.
//!
//! Every path that reaches the filesystem goes through the [`Sandbox`]
//! first; no operation ever concatenates a raw client string onto a
//! filesystem path. Multi-item operations apply per item in request order
//! and abort on the first failure without rolling back items already
//! applied, so callers must tolerate partial application.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::sandbox::{PathError, Sandbox};

#[derive(Debug, Error)]
pub enum FileError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("file operation failed: {0}")]
    Io(#[from] io::Error),
}

/// Strip the `"<adapter>://"` prefix from a file-path query value.
///
/// The adapter names a storage namespace in the query syntax only; it
/// never selects a different root. A path without the prefix is returned
/// unchanged.
pub fn strip_adapter<'a>(path: &'a str, adapter: &str) -> &'a str {
    match path.strip_prefix(adapter) {
        Some(rest) => rest.strip_prefix("://").unwrap_or(path),
        None => path,
    }
}

/// One listing entry; the user-facing JSON shape is assembled elsewhere.
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub modified_ms: i64,
}

pub struct FileStore {
    sandbox: Sandbox,
}

impl FileStore {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn read(&self, requested: &str) -> Result<Vec<u8>, FileError> {
        Ok(fs::read(self.sandbox.resolve_absolute(requested)?)?)
    }

    pub fn list(&self, requested: &str) -> Result<Vec<EntryInfo>, FileError> {
        let dir = self.sandbox.resolve_absolute(requested)?;
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            // entries whose metadata cannot be read are skipped, not fatal
            let Ok(meta) = entry.metadata() else { continue };
            let modified_ms = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0);
            entries.push(EntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: meta.is_dir(),
                size: meta.len(),
                modified_ms,
            });
        }
        Ok(entries)
    }

    pub fn create_dir(&self, requested: &str) -> Result<(), FileError> {
        Ok(fs::create_dir(self.sandbox.resolve_absolute(requested)?)?)
    }

    /// Rename an item in place. The destination is rebuilt from the
    /// validated item's parent directory plus the new name, and the
    /// result is re-validated; a traversal sequence smuggled through the
    /// "new name" field cannot escape the root.
    pub fn rename(&self, item: &str, new_name: &str) -> Result<(), FileError> {
        let source = self.sandbox.resolve_absolute(item)?;
        let parent = self
            .sandbox
            .resolve(item)?
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dest = self
            .sandbox
            .resolve_absolute(&format!("{}/{}", parent, new_name))?;
        Ok(fs::rename(source, dest)?)
    }

    /// Move items into a destination directory, one rename per item.
    ///
    /// Each destination is the validated directory joined with the base
    /// name of the validated source. An existing destination fails that
    /// item; earlier moves stay applied.
    pub fn move_items(&self, dest_dir: &str, items: &[String]) -> Result<(), FileError> {
        let dest_rel = self.sandbox.resolve(dest_dir)?;
        for item in items {
            let source = self.sandbox.resolve_absolute(item)?;
            let base = source
                .file_name()
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "item has no base name"))?
                .to_string_lossy()
                .into_owned();
            let dest = self
                .sandbox
                .resolve_absolute(&format!("{}/{}", dest_rel.display(), base))?;
            rename_no_clobber(&source, &dest)?;
        }
        Ok(())
    }

    /// Remove items one by one; directories must be empty. Aborts on the
    /// first failure, leaving earlier removals in place.
    pub fn remove_items(&self, items: &[String]) -> Result<(), FileError> {
        for item in items {
            let target = self.sandbox.resolve_absolute(item)?;
            if fs::metadata(&target)?.is_dir() {
                fs::remove_dir(&target)?;
            } else {
                fs::remove_file(&target)?;
            }
        }
        Ok(())
    }
}

/// `fs::rename` overwrites existing files on Unix; moves must not.
fn rename_no_clobber(source: &Path, dest: &Path) -> Result<(), io::Error> {
    if dest.symlink_metadata().is_ok() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("destination {:?} already exists", dest),
        ));
    }
    fs::rename(source, dest)
}

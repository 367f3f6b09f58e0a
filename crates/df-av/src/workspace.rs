//! Scratch directory for one synthesis run.
//!
//! A [`Workspace`] starts empty and only creates its temporary directory on
//! [`ensure`](Workspace::ensure). [`close`](Workspace::close) removes it and
//! everything under it; dropping the workspace does the same.

use std::path::{Path, PathBuf};

use df_core::{Error, Result};
use tempfile::TempDir;

const PREFIX: &str = "deckforge";

#[derive(Debug, Default)]
pub struct Workspace {
    dir: Option<TempDir>,
}

impl Workspace {
    /// A workspace with no directory yet.
    pub fn new() -> Self {
        Self { dir: None }
    }

    /// Create the scratch directory if needed and return its path.
    pub fn ensure(&mut self) -> Result<&Path> {
        if self.dir.is_none() {
            let dir = tempfile::Builder::new()
                .prefix(PREFIX)
                .tempdir()
                .map_err(|e| Error::tool("workspace", format!("failed to create temp dir: {e}")))?;
            tracing::debug!("Created scratch directory {}", dir.path().display());
            self.dir = Some(dir);
        }
        match &self.dir {
            Some(dir) => Ok(dir.path()),
            None => Err(Error::Internal("scratch directory vanished".into())),
        }
    }

    /// The scratch directory, if it has been created.
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(TempDir::path)
    }

    /// Path of `name` inside the scratch directory, creating the directory
    /// if needed.
    pub fn file(&mut self, name: &str) -> Result<PathBuf> {
        Ok(self.ensure()?.join(name))
    }

    /// Remove the scratch directory. Safe to call repeatedly.
    pub fn close(&mut self) -> Result<()> {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            dir.close().map_err(|e| {
                Error::tool(
                    "workspace",
                    format!("failed to remove {}: {e}", path.display()),
                )
            })?;
            tracing::debug!("Removed scratch directory {}", path.display());
        }
        Ok(())
    }
}

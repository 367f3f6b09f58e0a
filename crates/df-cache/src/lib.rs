//! # df-cache
//!
//! Persistent cache of fetched resources, keyed by origin URL.
//!
//! Each URL maps to one file under the cache root, the URL string itself
//! being used as a relative path (`http://host/a/b.jpg` is stored at
//! `<root>/http:/host/a/b.jpg`). Entries are written to a temporary sibling
//! and renamed into place, so a reader never observes a half-written entry.
//! Large media is hard-linked into the cache when possible and copied
//! otherwise.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use df_core::config::CacheConfig;
use df_core::{Error, FileLinker, HardLinker, Result};
use walkdir::WalkDir;

/// Disk cache for remote resources.
pub struct ResourceCache {
    root: PathBuf,
    linker: Arc<dyn FileLinker>,
}

impl std::fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl ResourceCache {
    /// Create a cache rooted at `root`. Nothing is created on disk until the
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            linker: Arc::new(HardLinker),
        }
    }

    /// Create a cache at the configured (or default XDG) location.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.resolved_dir())
    }

    /// Builder: replace the linker used by [`put_file`](Self::put_file).
    pub fn with_linker(mut self, linker: Arc<dyn FileLinker>) -> Self {
        self.linker = linker;
        self
    }

    /// The cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a URL to its entry path under the root.
    fn entry_path(&self, url: &str) -> Result<PathBuf> {
        let mut path = self.root.clone();
        let mut depth = 0usize;
        for component in Path::new(url).components() {
            match component {
                Component::Normal(part) => {
                    path.push(part);
                    depth += 1;
                }
                Component::ParentDir => {
                    return Err(Error::cache(
                        &self.root,
                        format!("refusing to cache {url}: key escapes the cache root"),
                    ));
                }
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            }
        }
        if depth == 0 {
            return Err(Error::cache(&self.root, format!("invalid cache key '{url}'")));
        }
        Ok(path)
    }

    /// Return the cached content of `url`, or `None` if it is not cached.
    pub fn get(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let Some(path) = self.get_path(url) else {
            return Ok(None);
        };
        match std::fs::read(&path) {
            Ok(content) => {
                tracing::debug!("Cache hit for {url}");
                Ok(Some(content))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::cache(path, format!("failed to read entry: {e}"))),
        }
    }

    /// Return the path of the cached entry for `url`, or `None` if absent.
    pub fn get_path(&self, url: &str) -> Option<PathBuf> {
        let path = self.entry_path(url).ok()?;
        path.is_file().then_some(path)
    }

    /// Store `content` as the entry for `url`, replacing any previous one.
    pub fn put(&self, url: &str, content: &[u8]) -> Result<PathBuf> {
        let dest = self.entry_path(url)?;
        let staging = self.staging_path(&dest)?;

        if let Err(e) = std::fs::write(&staging, content) {
            let _ = std::fs::remove_file(&staging);
            return Err(Error::cache(
                &dest,
                format!("failed to cache content for {url}: {e}"),
            ));
        }

        self.commit(&staging, &dest, url)?;
        Ok(dest)
    }

    /// Store the file at `src` as the entry for `url`.
    ///
    /// The file is hard-linked into the cache; if linking fails for any
    /// reason (other device, permissions, link-count ceiling) it is copied.
    pub fn put_file(&self, url: &str, src: &Path) -> Result<PathBuf> {
        let dest = self.entry_path(url)?;
        if src == dest {
            return Ok(dest);
        }
        let staging = self.staging_path(&dest)?;

        if let Err(link_err) = self.linker.hard_link(src, &staging) {
            tracing::debug!(
                "Hard link {} -> {} failed ({link_err}); copying instead",
                src.display(),
                dest.display()
            );
            let _ = std::fs::remove_file(&staging);
            if let Err(e) = std::fs::copy(src, &staging) {
                let _ = std::fs::remove_file(&staging);
                return Err(Error::cache(
                    &dest,
                    format!("failed to cache {} for {url}: {e}", src.display()),
                ));
            }
        }

        self.commit(&staging, &dest, url)?;
        Ok(dest)
    }

    /// Create the entry's parent directories and pick a unique staging name
    /// next to `dest`.
    fn staging_path(&self, dest: &Path) -> Result<PathBuf> {
        let parent = dest
            .parent()
            .ok_or_else(|| Error::cache(dest, "entry has no parent directory"))?;
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::cache(parent, format!("failed to create cache directories: {e}"))
        })?;
        Ok(parent.join(format!(".{}.partial", uuid::Uuid::new_v4().simple())))
    }

    fn commit(&self, staging: &Path, dest: &Path, url: &str) -> Result<()> {
        std::fs::rename(staging, dest).map_err(|e| {
            let _ = std::fs::remove_file(staging);
            Error::cache(dest, format!("failed to publish entry for {url}: {e}"))
        })?;
        tracing::debug!("Cached {url} at {}", dest.display());
        Ok(())
    }

    /// Delete every cached resource. The cache stays usable afterwards.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => {
                tracing::info!("Cleared cache at {}", self.root.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::cache(&self.root, format!("failed to clear cache: {e}"))),
        }
    }

    /// Total apparent size in bytes of all files under the cache root.
    ///
    /// Entries that vanish or cannot be inspected during the walk are skipped.
    pub fn size(&self) -> u64 {
        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.metadata().ok())
            .map(|meta| meta.len())
            .sum()
    }
}

//! Cache-aware fetching and transactional downloads.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use df_cache::ResourceCache;
use df_core::config::FetchConfig;
use df_core::{Error, Result};
use futures::stream::{self, StreamExt};

use crate::transport::Transport;

/// Fetches remote resources, consulting the resource cache first when one is
/// attached.
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    cache: Option<Arc<ResourceCache>>,
    not_found_url: Option<String>,
    parallelism: usize,
}

impl Fetcher {
    /// A fetcher with no cache, no not-found probe and sequential batches.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            cache: None,
            not_found_url: None,
            parallelism: 1,
        }
    }

    pub fn from_config(transport: Arc<dyn Transport>, config: &FetchConfig) -> Self {
        Self::new(transport)
            .with_not_found_url(config.not_found_url.clone())
            .with_parallelism(config.parallel_downloads)
    }

    /// Builder: attach a resource cache.
    pub fn with_cache(mut self, cache: Arc<ResourceCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Builder: set the final URL that marks a disguised not-found page.
    pub fn with_not_found_url(mut self, url: Option<String>) -> Self {
        self.not_found_url = url;
        self
    }

    /// Builder: number of concurrent requests in [`download_all`](Self::download_all).
    pub fn with_parallelism(mut self, n: usize) -> Self {
        self.parallelism = n.max(1);
        self
    }

    pub fn cache(&self) -> Option<&Arc<ResourceCache>> {
        self.cache.as_ref()
    }

    /// Fetch `url`, serving it from the cache when present and writing a
    /// fresh response back into it.
    pub async fn fetch(&self, url: &str) -> Result<Bytes> {
        if let Some(cache) = &self.cache {
            if let Some(content) = cache.get(url)? {
                return Ok(Bytes::from(content));
            }
        }

        let content = self.fetch_no_cache(url).await?;

        if let Some(cache) = &self.cache {
            cache.put(url, &content)?;
        }
        Ok(content)
    }

    /// Fetch `url` from the network, bypassing the cache.
    pub async fn fetch_no_cache(&self, url: &str) -> Result<Bytes> {
        tracing::debug!("GET {url}");
        let resp = self.transport.get(url).await?;

        if self.not_found_url.as_deref() == Some(resp.final_url.as_str()) {
            return Err(Error::download(url, "resource not found (redirected to error page)"));
        }
        if !resp.is_success() {
            return Err(Error::download(url, format!("HTTP status {}", resp.status)));
        }
        Ok(resp.body)
    }

    /// Fetch `url` into `dir`, named `filename` or the URL's last segment.
    pub async fn download(&self, url: &str, dir: &Path, filename: Option<&str>) -> Result<PathBuf> {
        let name = match filename {
            Some(name) => name.to_string(),
            None => filename_from_url(url)?,
        };
        let dest = dir.join(name);

        let content = self.fetch(url).await?;
        // A local write failure is an I/O error, not a missing resource.
        if let Err(e) = tokio::fs::write(&dest, &content).await {
            tracing::warn!("Failed to write {}: {e}", dest.display());
            let _ = tokio::fs::remove_file(&dest).await;
            return Err(e.into());
        }
        Ok(dest)
    }

    /// Download every URL into `dir`, returning paths in input order.
    ///
    /// All or nothing: if any download fails, every file this call created
    /// is removed before the first error is returned. Files that existed in
    /// `dir` beforehand are left alone. URLs whose file names collide are
    /// rejected before anything is fetched.
    pub async fn download_all(&self, urls: &[String], dir: &Path) -> Result<Vec<PathBuf>> {
        let mut names = HashSet::new();
        let mut pre_existing = HashSet::new();
        for url in urls {
            let name = filename_from_url(url)?;
            let target = dir.join(&name);
            if !names.insert(name) {
                return Err(Error::Validation(format!(
                    "{url} would overwrite another download named {}",
                    target.display()
                )));
            }
            if target.exists() {
                pre_existing.insert(target);
            }
        }

        tracing::info!("Downloading {} resources into {}", urls.len(), dir.display());
        let results: Vec<Result<PathBuf>> = stream::iter(urls)
            .map(|url| self.download(url, dir, None))
            .buffered(self.parallelism)
            .collect()
            .await;

        let mut written = Vec::with_capacity(results.len());
        let mut first_err = None;
        for result in results {
            match result {
                Ok(path) => written.push(path),
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            None => Ok(written),
            Some(err) => {
                let created: HashSet<_> = written
                    .into_iter()
                    .filter(|p| !pre_existing.contains(p))
                    .collect();
                tracing::warn!("Batch download failed; removing {} files", created.len());
                for path in created {
                    if let Err(e) = tokio::fs::remove_file(&path).await {
                        tracing::warn!("Failed to remove {}: {e}", path.display());
                    }
                }
                Err(err)
            }
        }
    }
}

/// Local file name for `url`: its last path segment without query or fragment.
pub fn filename_from_url(url: &str) -> Result<String> {
    let without_suffix = url.split(&['?', '#'][..]).next().unwrap_or(url);
    match without_suffix.rsplit('/').next() {
        Some(name) if !name.is_empty() && name != "." && name != ".." => Ok(name.to_string()),
        _ => Err(Error::Validation(format!("cannot derive a file name from URL '{url}'"))),
    }
}

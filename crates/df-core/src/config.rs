//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML and carries all
//! sub-configs for the cache, external tools, fetching, stream download and
//! output. Every section defaults sensibly so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::talk::{Profile, DEFAULT_STREAM_URL};
use crate::Error;

/// Page the origin redirects to instead of answering 404.
pub const DEFAULT_NOT_FOUND_URL: &str = "http://www.infoq.com/error?sc=404";

/// Locations searched by [`Config::load_or_default`] when no path is given.
const DEFAULT_PATHS: &[&str] = &["./deckforge.toml", "~/.config/deckforge/config.toml"];

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub tools: ToolsConfig,
    pub fetch: FetchConfig,
    pub stream: StreamConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file, failing if it cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Validation(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml(&contents)
    }

    /// Load from `path` if given, else from the first default location that
    /// exists, else return defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        for candidate in DEFAULT_PATHS {
            let expanded = shellexpand::tilde(candidate);
            let candidate = Path::new(expanded.as_ref());
            if candidate.exists() {
                tracing::info!("Loading config from {}", candidate.display());
                return Self::load(candidate);
            }
        }

        tracing::debug!("No config file found; using defaults");
        Ok(Self::default())
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.fetch.parallel_downloads == 0 {
            warnings.push("fetch.parallel_downloads is 0; slides will download one at a time".into());
        }

        if self.stream.max_resumes == 0 {
            warnings.push(
                "stream.max_resumes is 0; an interrupted stream download will not be resumed".into(),
            );
        }

        for (name, path) in [
            ("ffmpeg_path", &self.tools.ffmpeg_path),
            ("rtmpdump_path", &self.tools.rtmpdump_path),
            ("swfrender_path", &self.tools.swfrender_path),
        ] {
            if let Some(p) = path {
                if !p.exists() {
                    warnings.push(format!("tools.{name} {} does not exist", p.display()));
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Disk cache settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: Option<PathBuf>,
}

impl CacheConfig {
    /// Cache root: the configured directory, else
    /// `$XDG_CACHE_HOME/deckforge/resources`.
    pub fn resolved_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.dir {
            return PathBuf::from(shellexpand::tilde(&dir.to_string_lossy()).as_ref());
        }
        let base = dirs::cache_dir().unwrap_or_else(|| {
            PathBuf::from(shellexpand::tilde("~/.cache").as_ref())
        });
        base.join("deckforge").join("resources")
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub rtmpdump_path: Option<PathBuf>,
    pub swfrender_path: Option<PathBuf>,
}

/// HTTP fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Final URL that marks a disguised not-found; `None` disables the probe.
    pub not_found_url: Option<String>,
    #[serde(default = "default_parallel_downloads")]
    pub parallel_downloads: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_parallel_downloads() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            not_found_url: Some(DEFAULT_NOT_FOUND_URL.into()),
            parallel_downloads: default_parallel_downloads(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Streaming video download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub video_url: String,
    #[serde(default = "default_max_resumes")]
    pub max_resumes: u32,
}

fn default_max_resumes() -> u32 {
    64
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            video_url: DEFAULT_STREAM_URL.into(),
            max_resumes: default_max_resumes(),
        }
    }
}

/// Output defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub profile: Profile,
    pub overwrite: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert!(!cfg.cache.enabled);
        assert_eq!(cfg.fetch.parallel_downloads, 4);
        assert_eq!(cfg.fetch.not_found_url.as_deref(), Some(DEFAULT_NOT_FOUND_URL));
        assert_eq!(cfg.stream.video_url, DEFAULT_STREAM_URL);
        assert_eq!(cfg.output.profile, Profile::Legacy);
        assert!(!cfg.output.overwrite);
    }

    #[test]
    fn default_config_no_warnings() {
        let warnings = Config::default().validate();
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg.fetch.timeout_secs, 60);
        assert_eq!(cfg.stream.max_resumes, 64);
    }

    #[test]
    fn parse_toml_sections() {
        let cfg = Config::from_toml(
            r#"
[cache]
enabled = true
dir = "/var/cache/df"

[tools]
ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"

[fetch]
parallel_downloads = 8

[output]
profile = "h264_overlay"
overwrite = true
"#,
        )
        .unwrap();
        assert!(cfg.cache.enabled);
        assert_eq!(cfg.cache.resolved_dir(), PathBuf::from("/var/cache/df"));
        assert_eq!(cfg.tools.ffmpeg_path, Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg")));
        assert_eq!(cfg.fetch.parallel_downloads, 8);
        assert_eq!(cfg.output.profile, Profile::H264Overlay);
        assert!(cfg.output.overwrite);
    }

    #[test]
    fn bad_profile_is_rejected() {
        let err = Config::from_toml("[output]\nprofile = \"webm\"\n").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn default_cache_dir_ends_with_app_name() {
        let dir = CacheConfig::default().resolved_dir();
        assert!(dir.ends_with("deckforge/resources"));
    }

    #[test]
    fn load_missing_file_fails() {
        assert!(Config::load(Path::new("/nonexistent/deckforge.toml")).is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deckforge.toml");
        std::fs::write(&path, "[stream]\nmax_resumes = 3\n").unwrap();
        let cfg = Config::load_or_default(Some(&path)).unwrap();
        assert_eq!(cfg.stream.max_resumes, 3);
    }

    #[test]
    fn zero_parallelism_warns() {
        let mut cfg = Config::default();
        cfg.fetch.parallel_downloads = 0;
        assert!(cfg.validate().iter().any(|w| w.contains("parallel_downloads")));
    }
}

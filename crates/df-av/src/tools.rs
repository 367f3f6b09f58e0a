//! External tool discovery.
//!
//! The [`ToolRegistry`] resolves where ffmpeg, rtmpdump and swfrender live:
//! an explicit configured path wins, then a `PATH` lookup, and finally the
//! bare binary name so that a late install is still picked up at spawn time.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use df_core::config::ToolsConfig;
use serde::{Deserialize, Serialize};

use crate::command::ToolCommand;

/// The external programs deckforge drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Audio/video transcoder.
    Ffmpeg,
    /// RTMP stream downloader.
    Rtmpdump,
    /// SWF slide rasterizer from swftools.
    Swfrender,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Ffmpeg, Tool::Rtmpdump, Tool::Swfrender];

    /// Default binary name.
    pub fn binary(&self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::Rtmpdump => "rtmpdump",
            Tool::Swfrender => "swfrender",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            Tool::Ffmpeg => "-version",
            Tool::Rtmpdump => "-h",
            Tool::Swfrender => "--version",
        }
    }

    fn configured<'a>(&self, config: &'a ToolsConfig) -> Option<&'a Path> {
        match self {
            Tool::Ffmpeg => config.ffmpeg_path.as_deref(),
            Tool::Rtmpdump => config.rtmpdump_path.as_deref(),
            Tool::Swfrender => config.swfrender_path.as_deref(),
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub tool: Tool,
    pub available: bool,
    /// First non-empty line of the tool's version banner.
    pub version: Option<String>,
    pub path: PathBuf,
}

/// Resolved executable paths for every [`Tool`].
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    paths: HashMap<Tool, PathBuf>,
}

impl ToolRegistry {
    /// Resolve every tool from `config`, then `PATH`, then its bare name.
    pub fn discover(config: &ToolsConfig) -> Self {
        let paths = Tool::ALL
            .iter()
            .map(|&tool| {
                let path = match tool.configured(config) {
                    Some(p) => p.to_path_buf(),
                    None => which::which(tool.binary())
                        .unwrap_or_else(|_| PathBuf::from(tool.binary())),
                };
                tracing::debug!("Resolved {tool} to {}", path.display());
                (tool, path)
            })
            .collect();
        Self { paths }
    }

    /// Path to run `tool` with.
    pub fn path(&self, tool: Tool) -> &Path {
        self.paths
            .get(&tool)
            .map(PathBuf::as_path)
            .unwrap_or_else(|| Path::new(tool.binary()))
    }

    /// A fresh command for `tool`.
    pub fn command(&self, tool: Tool) -> ToolCommand {
        ToolCommand::new(self.path(tool))
    }

    /// Probe every tool and report whether it can be run.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        Tool::ALL
            .iter()
            .map(|&tool| {
                let path = self.path(tool).to_path_buf();
                let version = detect_version(tool, &path);
                ToolInfo {
                    tool,
                    available: version.is_some(),
                    version: version.filter(|v| !v.is_empty()),
                    path,
                }
            })
            .collect()
    }
}

/// Run the tool's version flag and return the first non-empty line of its
/// output, or `None` if it cannot be spawned.
///
/// rtmpdump and swfrender print their banners on stderr and exit non-zero
/// for `-h`, so the exit status is ignored.
fn detect_version(tool: Tool, path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg(tool.version_arg())
        .output()
        .ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let line = stdout
        .lines()
        .chain(stderr.lines())
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    Some(line.to_string())
}

//! Resumable download of the talk video over RTMP.
//!
//! The streaming server tends to reset the connection partway through long
//! (over an hour) streams. rtmpdump reports that with exit code 2 and can
//! continue from the partial file, so that code triggers a resume; any other
//! failure discards the partial file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use df_core::config::StreamConfig;
use df_core::{Error, Result, VideoLocator};

use crate::command::{ToolCommand, ToolRunner};

/// rtmpdump's exit code for an incomplete download that can be resumed.
pub const RESUMABLE_EXIT_CODE: i32 = 2;

pub struct StreamDownloader {
    rtmpdump: PathBuf,
    runner: Arc<dyn ToolRunner>,
    max_resumes: u32,
}

impl StreamDownloader {
    pub fn new(rtmpdump: impl Into<PathBuf>, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            rtmpdump: rtmpdump.into(),
            runner,
            max_resumes: StreamConfig::default().max_resumes,
        }
    }

    /// Builder: cap on resume attempts after the first run.
    pub fn with_max_resumes(mut self, n: u32) -> Self {
        self.max_resumes = n;
        self
    }

    fn command(&self, locator: &VideoLocator, out: &Path, resume: bool) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.rtmpdump);
        cmd.arg("-q");
        if resume {
            cmd.arg("-e");
        }
        cmd.args(["-r", locator.url.as_str(), "-y", locator.path.as_str(), "-o"])
            .path_arg(out);
        cmd
    }

    /// Download the stream at `locator` into `out`, resuming on
    /// [`RESUMABLE_EXIT_CODE`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Download`] with the exit code and captured output if
    /// rtmpdump fails for any other reason or keeps asking to resume past
    /// the cap. The partial file is removed in that case.
    pub async fn download(&self, locator: &VideoLocator, out: &Path) -> Result<PathBuf> {
        let source = locator.cache_key();
        tracing::info!("Downloading video stream {source}");

        let mut resumes = 0u32;
        loop {
            let cmd = self.command(locator, out, resumes > 0);
            let output = self.runner.run(&cmd).await?;

            match output.code {
                Some(0) => return Ok(out.to_path_buf()),
                Some(RESUMABLE_EXIT_CODE) if resumes < self.max_resumes => {
                    resumes += 1;
                    tracing::warn!(
                        "Stream download interrupted; resuming ({resumes}/{})",
                        self.max_resumes
                    );
                }
                code => {
                    if let Err(e) = std::fs::remove_file(out) {
                        if e.kind() != std::io::ErrorKind::NotFound {
                            tracing::warn!("Failed to remove partial video {}: {e}", out.display());
                        }
                    }
                    let status = code.map_or_else(|| "a signal".to_string(), |c| c.to_string());
                    let mut message = format!("rtmpdump exited with {status}");
                    if code == Some(RESUMABLE_EXIT_CODE) {
                        message.push_str(&format!(" after {resumes} resumes"));
                    }
                    let captured = output.combined();
                    if !captured.trim().is_empty() {
                        message.push_str(&format!(".\n\tOutput:\n{}", captured.trim_end()));
                    }
                    return Err(Error::download(source, message));
                }
            }
        }
    }
}

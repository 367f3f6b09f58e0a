//! Expansion of a sparse slide timeline into one still frame per second.
//!
//! ffmpeg's image2 demuxer reads a numbered file sequence at a fixed rate,
//! so a slide shown for 40 seconds becomes 40 consecutive frame files. The
//! files are hard links to the slide image, falling back to a copy when the
//! source inode runs out of links.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use df_core::{is_too_many_links, Error, FileLinker, HardLinker, Result, Timeline};

/// Frame file prefix inside the destination directory.
const FRAME_PREFIX: &str = "frame-";

/// A materialized frame sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePattern {
    /// printf-style path, e.g. `/tmp/x/frame-%04d.png`.
    pub pattern: PathBuf,
    /// Talk second shown by frame 0.
    pub first_second: u32,
    pub frame_count: usize,
}

impl FramePattern {
    /// Frame number showing talk second `second`.
    pub fn frame_at(&self, second: u32) -> u32 {
        second.saturating_sub(self.first_second)
    }

    pub fn pattern_str(&self) -> String {
        self.pattern.to_string_lossy().into_owned()
    }
}

/// Materializes per-second frame files from slides and a timeline.
pub struct FrameExpander {
    linker: Arc<dyn FileLinker>,
}

impl Default for FrameExpander {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameExpander {
    pub fn new() -> Self {
        Self {
            linker: Arc::new(HardLinker),
        }
    }

    /// Builder: replace the linker.
    pub fn with_linker(mut self, linker: Arc<dyn FileLinker>) -> Self {
        self.linker = linker;
        self
    }

    /// Write one frame per second of `timeline` into `dest`.
    ///
    /// Slide `i` fills seconds `[timecodes[i], timecodes[i+1])`. Frames are
    /// numbered from 0 with a zero-padded counter and keep the slides' file
    /// extension, which must be the same for every slide.
    pub fn expand(&self, slides: &[PathBuf], timeline: &Timeline, dest: &Path) -> Result<FramePattern> {
        if slides.len() != timeline.slide_count() {
            return Err(Error::Validation(format!(
                "{} slide images for a timeline of {} slides",
                slides.len(),
                timeline.slide_count()
            )));
        }
        let ext = common_extension(slides)?;

        let mut frame = 0usize;
        for (index, slide) in slides.iter().enumerate() {
            let mut src = slide.clone();
            for _ in timeline.slide_range(index) {
                let dst = dest.join(format!("{FRAME_PREFIX}{frame:04}.{ext}"));
                if let Err(e) = self.linker.hard_link(&src, &dst) {
                    if !is_too_many_links(&e) {
                        return Err(Error::Io { source: e });
                    }
                    tracing::debug!(
                        "Link limit reached on {}; copying to {}",
                        src.display(),
                        dst.display()
                    );
                    std::fs::copy(&src, &dst)?;
                    src = dst;
                }
                frame += 1;
            }
        }

        tracing::info!("Expanded {} slides into {frame} frames", slides.len());
        Ok(FramePattern {
            pattern: dest.join(format!("{FRAME_PREFIX}%04d.{ext}")),
            first_second: timeline.start(),
            frame_count: frame,
        })
    }
}

fn common_extension(slides: &[PathBuf]) -> Result<String> {
    let ext_of = |p: &Path| {
        p.extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    let Some(first) = slides.first() else {
        return Ok(String::new());
    };
    let ext = ext_of(first);
    if let Some(other) = slides.iter().find(|s| ext_of(s) != ext) {
        return Err(Error::Validation(format!(
            "slides must share one image format ({} vs {})",
            first.display(),
            other.display()
        )));
    }
    Ok(ext)
}

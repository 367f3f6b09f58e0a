//! Talk-domain types: the scraper's manifest, timelines, assets and output
//! selection.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default streaming endpoint the video locator path is relative to.
pub const DEFAULT_STREAM_URL: &str = "rtmpe://video.infoq.com/cfx/st/";

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Everything the scraper knows about one recorded talk.
///
/// This is the hand-over format between page scraping and synthesis; it is
/// read from JSON so the two can run independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TalkManifest {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Total duration in seconds, as advertised by the page.
    pub duration: u32,
    /// Slide image URLs in display order.
    pub slides: Vec<String>,
    /// Slide-change offsets; one more entry than `slides`.
    pub timecodes: Vec<u32>,
    pub video: VideoLocator,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub demo_timings: Vec<u32>,
}

impl TalkManifest {
    /// Deserialize a manifest from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("manifest parse error: {e}")))
    }

    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Validation(format!("failed to read manifest {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
    }

    /// The validated slide timeline.
    pub fn timeline(&self) -> Result<Timeline> {
        Timeline::new(self.timecodes.clone(), self.slides.len())
    }

    /// The validated demo switch points.
    pub fn demo_timings(&self) -> Result<DemoTimings> {
        DemoTimings::new(self.demo_timings.clone())
    }

    /// Output file name used when the caller does not pick one.
    pub fn default_output(&self) -> PathBuf {
        PathBuf::from(format!("{}.avi", self.id))
    }
}

/// Where the talk's video lives on the streaming server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoLocator {
    /// Server application URL; defaults to [`DEFAULT_STREAM_URL`].
    #[serde(default = "default_stream_url")]
    pub url: String,
    /// Stream path on that server (e.g. `mp4:presentations/talk.mp4`).
    pub path: String,
}

fn default_stream_url() -> String {
    DEFAULT_STREAM_URL.into()
}

impl VideoLocator {
    /// Key under which the downloaded stream is cached.
    pub fn cache_key(&self) -> String {
        format!("{}{}", self.url, self.path)
    }
}

// ---------------------------------------------------------------------------
// Timelines
// ---------------------------------------------------------------------------

/// Strictly ascending slide-change offsets; `timecodes[i]` is the second at
/// which slide `i` appears and the last entry is the end of the talk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    timecodes: Vec<u32>,
}

impl Timeline {
    /// Validate `timecodes` against the number of slides it describes.
    pub fn new(timecodes: Vec<u32>, slide_count: usize) -> Result<Self> {
        if timecodes.len() != slide_count + 1 {
            return Err(Error::Validation(format!(
                "timeline has {} timecodes for {} slides (expected {})",
                timecodes.len(),
                slide_count,
                slide_count + 1
            )));
        }
        if let Some(w) = timecodes.windows(2).find(|w| w[0] >= w[1]) {
            return Err(Error::Validation(format!(
                "timecodes must be strictly ascending ({} then {})",
                w[0], w[1]
            )));
        }
        Ok(Self { timecodes })
    }

    /// Number of slides covered by this timeline.
    pub fn slide_count(&self) -> usize {
        self.timecodes.len() - 1
    }

    /// Half-open second range `[start, end)` during which slide `index` shows.
    pub fn slide_range(&self, index: usize) -> std::ops::Range<u32> {
        self.timecodes[index]..self.timecodes[index + 1]
    }

    /// Second of the first slide change.
    pub fn start(&self) -> u32 {
        self.timecodes[0]
    }

    /// Total duration covered, i.e. the last timecode.
    pub fn end(&self) -> u32 {
        self.timecodes[self.timecodes.len() - 1]
    }

    pub fn timecodes(&self) -> &[u32] {
        &self.timecodes
    }
}

/// Ascending offsets at which the overlay output switches between slides and
/// live video. Empty means the whole talk shows slides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemoTimings {
    offsets: Vec<u32>,
}

impl DemoTimings {
    pub fn new(offsets: Vec<u32>) -> Result<Self> {
        if let Some(w) = offsets.windows(2).find(|w| w[0] >= w[1]) {
            return Err(Error::Validation(format!(
                "demo timings must be strictly ascending ({} then {})",
                w[0], w[1]
            )));
        }
        Ok(Self { offsets })
    }

    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// What a downloaded resource is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Video,
    Slide,
    Audio,
}

/// One downloaded resource on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub origin: String,
    pub path: PathBuf,
    pub kind: AssetKind,
}

impl Asset {
    pub fn new(origin: impl Into<String>, path: impl Into<PathBuf>, kind: AssetKind) -> Self {
        Self {
            origin: origin.into(),
            path: path.into(),
            kind,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Transcoder command profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// MPEG-4 / MP3, compatible with very old ffmpeg releases.
    #[default]
    Legacy,
    /// H.264 baseline with the audio track copied as is.
    H264,
    /// H.264 with live video and slides composited segment by segment.
    H264Overlay,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Legacy => "legacy",
            Profile::H264 => "h264",
            Profile::H264Overlay => "h264_overlay",
        }
    }

    /// Whether the profile needs a recent ffmpeg built with libx264.
    pub fn requires_recent_encoder(&self) -> bool {
        !matches!(self, Profile::Legacy)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "legacy" => Ok(Profile::Legacy),
            "h264" => Ok(Profile::H264),
            "h264_overlay" => Ok(Profile::H264Overlay),
            other => Err(Error::Validation(format!(
                "unknown output type '{other}' (valid: legacy, h264, h264_overlay)"
            ))),
        }
    }
}

/// Destination and encoding choices for the final video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    pub path: PathBuf,
    pub overwrite: bool,
    pub profile: Profile,
}

impl OutputSpec {
    pub fn new(path: impl Into<PathBuf>, profile: Profile) -> Self {
        Self {
            path: path.into(),
            overwrite: false,
            profile,
        }
    }

    /// Builder: set the overwrite policy.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Fail when the destination exists and overwriting is not allowed.
    pub fn check_writable(&self) -> Result<()> {
        if !self.overwrite && self.path.exists() {
            return Err(Error::conversion(format!(
                "File {} already exists and overwrite is not enabled",
                self.path.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "id": "Java-GC-Azul-C4",
        "title": "The C4 Collector",
        "author": "Gil Tene",
        "date": "2012-05-14",
        "duration": 3000,
        "slides": ["http://www.infoq.com/resource/s1.swf", "http://www.infoq.com/resource/s2.swf"],
        "timecodes": [0, 12, 3000],
        "video": {"path": "mp4:presentations/c4.mp4"},
        "audio_url": "http://www.infoq.com/mp3download.action?filename=c4.mp3"
    }"#;

    #[test]
    fn parse_manifest_with_defaults() {
        let m = TalkManifest::from_json(MANIFEST).unwrap();
        assert_eq!(m.id, "Java-GC-Azul-C4");
        assert_eq!(m.video.url, DEFAULT_STREAM_URL);
        assert!(m.demo_timings.is_empty());
        assert!(m.pdf_url.is_none());
        assert_eq!(m.date, NaiveDate::from_ymd_opt(2012, 5, 14));
        assert_eq!(m.default_output(), PathBuf::from("Java-GC-Azul-C4.avi"));
        assert_eq!(m.timeline().unwrap().slide_count(), 2);
    }

    #[test]
    fn manifest_parse_error_is_validation() {
        let err = TalkManifest::from_json("{").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn locator_cache_key_joins_url_and_path() {
        let loc = VideoLocator {
            url: DEFAULT_STREAM_URL.into(),
            path: "mp4:presentations/c4.mp4".into(),
        };
        assert_eq!(
            loc.cache_key(),
            "rtmpe://video.infoq.com/cfx/st/mp4:presentations/c4.mp4"
        );
    }

    #[test]
    fn timeline_rejects_wrong_length() {
        assert!(Timeline::new(vec![0, 2], 2).is_err());
        assert!(Timeline::new(vec![0, 2, 5, 7], 2).is_err());
    }

    #[test]
    fn timeline_rejects_non_ascending() {
        assert!(Timeline::new(vec![0, 5, 5], 2).is_err());
        assert!(Timeline::new(vec![3, 1, 5], 2).is_err());
    }

    #[test]
    fn timeline_ranges() {
        let t = Timeline::new(vec![0, 2, 5], 2).unwrap();
        assert_eq!(t.slide_range(0), 0..2);
        assert_eq!(t.slide_range(1), 2..5);
        assert_eq!(t.start(), 0);
        assert_eq!(t.end(), 5);
    }

    #[test]
    fn demo_timings_validation() {
        assert!(DemoTimings::new(vec![]).unwrap().is_empty());
        assert_eq!(DemoTimings::new(vec![0, 30]).unwrap().offsets(), &[0, 30]);
        assert!(DemoTimings::new(vec![30, 10]).is_err());
    }

    #[test]
    fn profile_round_trips_names() {
        for p in [Profile::Legacy, Profile::H264, Profile::H264Overlay] {
            assert_eq!(p.as_str().parse::<Profile>().unwrap(), p);
        }
        assert!("mkv".parse::<Profile>().is_err());
        assert!(!Profile::Legacy.requires_recent_encoder());
        assert!(Profile::H264Overlay.requires_recent_encoder());
    }

    #[test]
    fn output_spec_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("talk.avi");
        std::fs::write(&path, b"old").unwrap();

        let spec = OutputSpec::new(&path, Profile::H264);
        assert!(matches!(spec.check_writable(), Err(Error::Conversion { .. })));
        assert!(spec.with_overwrite(true).check_writable().is_ok());
    }
}

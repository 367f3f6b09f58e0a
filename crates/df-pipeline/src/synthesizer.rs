//! The synthesis orchestrator.
//!
//! A run acquires the talk video (resuming interrupted streams and reusing
//! the cache), picks the soundtrack, downloads and rasterizes the slides,
//! expands them into per-second frames and hands everything to the
//! transcoder. All intermediate files live in a scratch [`Workspace`] that
//! is removed when the run ends, whether it succeeded or not.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use df_av::{
    extract_audio, FrameExpander, SlideRenderer, StreamDownloader, SystemRunner, Tool,
    ToolRegistry, ToolRunner, Transcoder, Workspace,
};
use df_core::config::StreamConfig;
use df_core::{Asset, AssetKind, Error, OutputSpec, Profile, Result, TalkManifest, VideoLocator};
use df_fetch::Fetcher;

use crate::context::{StateObserver, Transition};
use crate::state::SynthesisState;

const VIDEO_FILE: &str = "video.avi";
const AUDIO_FILE: &str = "audio.mp3";
const EXTRACTED_AUDIO_FILE: &str = "audio.ogg";
const SLIDES_DIR: &str = "slides";
const FRAMES_DIR: &str = "frames";

/// Mutable state of one run.
struct Run {
    state: SynthesisState,
    workspace: Workspace,
}

/// Builds a talk video from a [`TalkManifest`].
pub struct Synthesizer {
    fetcher: Arc<Fetcher>,
    tools: ToolRegistry,
    runner: Arc<dyn ToolRunner>,
    expander: FrameExpander,
    max_resumes: u32,
    observer: StateObserver,
}

impl Synthesizer {
    pub fn new(fetcher: Arc<Fetcher>, tools: ToolRegistry) -> Self {
        Self {
            fetcher,
            tools,
            runner: Arc::new(SystemRunner),
            expander: FrameExpander::new(),
            max_resumes: StreamConfig::default().max_resumes,
            observer: StateObserver::noop(),
        }
    }

    /// Builder: run external tools through `runner`.
    pub fn with_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Builder: replace the frame expander.
    pub fn with_expander(mut self, expander: FrameExpander) -> Self {
        self.expander = expander;
        self
    }

    /// Builder: cap on stream download resumes.
    pub fn with_max_resumes(mut self, n: u32) -> Self {
        self.max_resumes = n;
        self
    }

    /// Builder: receive every state transition.
    pub fn with_observer(mut self, observer: StateObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Produce `output` from `manifest` and return its path.
    ///
    /// The scratch directory is removed before this returns, on success and
    /// on failure alike.
    pub async fn synthesize(&self, manifest: &TalkManifest, output: &OutputSpec) -> Result<PathBuf> {
        tracing::info!("Synthesizing '{}' into {}", manifest.title, output.path.display());
        let mut run = Run {
            state: SynthesisState::Created,
            workspace: Workspace::new(),
        };
        self.notify(&run);

        let result = self.execute(&mut run, manifest, output).await;
        let cleanup = run.workspace.close();

        match (result, cleanup) {
            (Ok(path), Ok(())) => {
                self.advance(&mut run, SynthesisState::Done)?;
                tracing::info!("Created {}", path.display());
                Ok(path)
            }
            (Ok(_), Err(e)) => {
                self.fail(&mut run);
                Err(e)
            }
            (Err(e), cleanup) => {
                if let Err(c) = cleanup {
                    tracing::warn!("Scratch cleanup failed: {c}");
                }
                self.fail(&mut run);
                Err(e)
            }
        }
    }

    async fn execute(&self, run: &mut Run, manifest: &TalkManifest, output: &OutputSpec) -> Result<PathBuf> {
        // Checked before any download so a doomed run costs no bandwidth.
        output.check_writable()?;
        if manifest.slides.is_empty() {
            return Err(Error::Validation(format!("talk '{}' has no slides", manifest.id)));
        }
        let timeline = manifest.timeline()?;
        let demo = manifest.demo_timings()?;

        let video = self.acquire_video(run, &manifest.video).await?;
        let media = match output.profile {
            Profile::H264Overlay => video,
            Profile::Legacy | Profile::H264 => self.acquire_audio(run, manifest, video).await?,
        };
        self.advance(run, SynthesisState::VideoAcquired)?;

        let scratch = run.workspace.ensure()?.to_path_buf();
        let slides_dir = scratch.join(SLIDES_DIR);
        tokio::fs::create_dir_all(&slides_dir).await?;
        let slides = self.fetcher.download_all(&manifest.slides, &slides_dir).await?;
        self.advance(run, SynthesisState::SlidesAcquired)?;

        let renderer = SlideRenderer::new(self.tools.path(Tool::Swfrender), self.runner.clone());
        let images = renderer.render_all(&slides).await?;
        let frames_dir = scratch.join(FRAMES_DIR);
        tokio::fs::create_dir_all(&frames_dir).await?;
        let frames = self.expander.expand(&images, &timeline, &frames_dir)?;
        self.advance(run, SynthesisState::FramesExpanded)?;

        let duration = if manifest.duration > 0 {
            manifest.duration
        } else {
            timeline.end()
        };
        let transcoder = Transcoder::new(self.tools.path(Tool::Ffmpeg), self.runner.clone());
        let path = transcoder
            .assemble(output, &media, &frames, &demo, duration, &scratch)
            .await?;
        self.advance(run, SynthesisState::Assembled)?;
        Ok(path)
    }

    /// The talk video: from the cache when present, else streamed into the
    /// scratch directory and written back to the cache.
    async fn acquire_video(&self, run: &mut Run, locator: &VideoLocator) -> Result<Asset> {
        let key = locator.cache_key();
        if let Some(cache) = self.fetcher.cache() {
            if let Some(path) = cache.get_path(&key) {
                tracing::info!("Using cached video {}", path.display());
                return Ok(Asset::new(key, path, AssetKind::Video));
            }
        }

        let out = run.workspace.file(VIDEO_FILE)?;
        StreamDownloader::new(self.tools.path(Tool::Rtmpdump), self.runner.clone())
            .with_max_resumes(self.max_resumes)
            .download(locator, &out)
            .await?;

        if let Some(cache) = self.fetcher.cache() {
            cache.put_file(&key, &out)?;
        }
        Ok(Asset::new(key, out, AssetKind::Video))
    }

    /// The soundtrack: the audio-only download when the talk has one, else
    /// the video itself. If the audio-only download turns out not to exist,
    /// the audio is extracted from the video instead.
    async fn acquire_audio(&self, run: &mut Run, manifest: &TalkManifest, video: Asset) -> Result<Asset> {
        let Some(url) = manifest.audio_url.as_deref() else {
            return Ok(video);
        };
        let scratch = run.workspace.ensure()?.to_path_buf();

        match self.fetcher.download(url, &scratch, Some(AUDIO_FILE)).await {
            Ok(path) => Ok(Asset::new(url, path, AssetKind::Audio)),
            Err(e) if e.is_download() => {
                tracing::warn!("Audio track unavailable ({e}); extracting it from the video");
                let out = scratch.join(EXTRACTED_AUDIO_FILE);
                extract_audio(
                    self.runner.as_ref(),
                    self.tools.path(Tool::Ffmpeg),
                    &video.path,
                    &out,
                )
                .await?;
                Ok(Asset::new(video.origin, out, AssetKind::Audio))
            }
            Err(e) => Err(e),
        }
    }

    fn advance(&self, run: &mut Run, to: SynthesisState) -> Result<()> {
        if !run.state.can_transition_to(to) {
            return Err(Error::Internal(format!(
                "illegal synthesis transition {} -> {to}",
                run.state
            )));
        }
        tracing::debug!("Synthesis {} -> {to}", run.state);
        run.state = to;
        self.notify(run);
        Ok(())
    }

    fn fail(&self, run: &mut Run) {
        if run.state.can_transition_to(SynthesisState::Failed) {
            run.state = SynthesisState::Failed;
            self.notify(run);
        }
    }

    fn notify(&self, run: &Run) {
        self.observer.notify(&Transition {
            state: run.state,
            scratch: run.workspace.path().map(Path::to_path_buf),
        });
    }
}

//! Final assembly of the talk video with ffmpeg.
//!
//! Every [`Profile`] maps to one argument shape built by [`build_command`];
//! [`Transcoder::assemble`] does the surrounding work (output checks, frame
//! rate probe, filter script) and turns a failed run into a conversion error.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use df_core::{Asset, AssetKind, DemoTimings, Error, OutputSpec, Profile, Result};
use regex::Regex;

use crate::command::{conversion_failure, ToolCommand, ToolRunner};
use crate::frames::FramePattern;
use crate::segments::{OverlayPlan, SegmentPlanner};

/// Name of the filter script written to the scratch directory.
const FILTER_SCRIPT: &str = "filter";

/// Overlay-only inputs to [`build_command`].
#[derive(Debug, Clone, Copy)]
pub struct OverlayArgs<'a> {
    pub plan: &'a OverlayPlan,
    pub filter_script: &'a Path,
    pub frame_rate: &'a str,
}

/// Everything [`build_command`] needs besides the profile.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    /// Audio track or full video providing the soundtrack.
    pub media: &'a Asset,
    pub frames: &'a FramePattern,
    pub output: &'a OutputSpec,
    /// Required for [`Profile::H264Overlay`], ignored otherwise.
    pub overlay: Option<OverlayArgs<'a>>,
}

/// Input stream carrying the audio in `media`: a bare audio file has it
/// first, a talk video has it after the picture.
fn audio_map(media: &Asset) -> &'static str {
    match media.kind {
        AssetKind::Audio => "0:0",
        _ => "0:1",
    }
}

fn overwrite_flag(output: &OutputSpec) -> &'static str {
    if output.overwrite {
        "-y"
    } else {
        "-n"
    }
}

/// ffmpeg arguments (without the program) producing `ctx.output` under
/// `profile`.
pub fn build_command(profile: Profile, ctx: &CommandContext<'_>) -> Result<Vec<String>> {
    let media = ctx.media.path.to_string_lossy().into_owned();
    let pattern = ctx.frames.pattern_str();
    let out = ctx.output.path.to_string_lossy().into_owned();
    let s = |v: &[&str]| v.iter().map(|a| a.to_string()).collect::<Vec<_>>();

    let args = match profile {
        // Old ffmpeg releases support neither -n nor stream specifiers, and
        // are picky about argument order.
        Profile::Legacy => {
            let mut args = s(&["-v", "0", "-i"]);
            args.push(media);
            args.extend(s(&["-f", "image2", "-r", "1", "-s", "hd720", "-i"]));
            args.push(pattern);
            args.extend(s(&["-map", "1:0", "-acodec", "libmp3lame", "-ab", "128k"]));
            args.extend(s(&["-map", audio_map(ctx.media), "-vcodec", "mpeg4", "-vb", "2M", "-y"]));
            args.push(out);
            args
        }
        Profile::H264 => {
            let mut args = s(&["-v", "error", "-i"]);
            args.push(media);
            args.extend(s(&["-r", "1", "-i"]));
            args.push(pattern);
            args.extend(s(&["-map", "1:0", "-map", audio_map(ctx.media)]));
            args.extend(s(&["-c:a", "copy"]));
            args.extend(s(&[
                "-c:v", "libx264", "-profile:v", "baseline", "-preset", "ultrafast", "-level", "3.0",
                "-crf", "28", "-pix_fmt", "yuv420p", "-s", "1280x720",
            ]));
            args.push(overwrite_flag(ctx.output).into());
            args.push(out);
            args
        }
        Profile::H264Overlay => {
            let overlay = ctx.overlay.ok_or_else(|| {
                Error::Internal("overlay output requires a segment plan".into())
            })?;
            let mut args = s(&["-v", "error"]);
            args.extend(overlay.plan.input_args.iter().cloned());
            args.push("-filter_complex_script".into());
            args.push(overlay.filter_script.to_string_lossy().into_owned());
            args.extend(s(&["-map", "[v]", "-map", "[a]", "-r", overlay.frame_rate]));
            args.extend(s(&["-acodec", "libmp3lame", "-ab", "92k"]));
            args.extend(s(&[
                "-vcodec", "libx264", "-profile:v", "baseline", "-preset", "fast", "-level", "3.0",
                "-crf", "28",
            ]));
            args.push(overwrite_flag(ctx.output).into());
            args.push(out);
            args
        }
    };
    Ok(args)
}

/// `<rate> tbr` in ffmpeg's stream banner.
static FRAME_RATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\S+)\s+tbr").expect("frame rate pattern is valid"));

/// Extract the frame rate from ffmpeg's stream banner (`... 25 tbr, ...`).
pub fn parse_frame_rate(banner: &str) -> Option<String> {
    let raw = FRAME_RATE.captures(banner)?.get(1)?.as_str();
    let fps: f64 = raw.parse().ok()?;
    (fps > 0.0).then(|| raw.to_string())
}

/// Drives ffmpeg for the final encode.
pub struct Transcoder {
    ffmpeg: PathBuf,
    runner: Arc<dyn ToolRunner>,
}

impl Transcoder {
    pub fn new(ffmpeg: impl Into<PathBuf>, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            runner,
        }
    }

    fn command(&self) -> ToolCommand {
        ToolCommand::new(&self.ffmpeg)
    }

    /// Frame rate of `video` as reported by `ffmpeg -i`.
    ///
    /// Without an output file ffmpeg always exits non-zero, so only the
    /// banner is inspected.
    pub async fn probe_frame_rate(&self, video: &Path) -> Result<String> {
        let mut cmd = self.command();
        cmd.arg("-i").path_arg(video);
        let output = self.runner.run(&cmd).await?;
        parse_frame_rate(&output.combined()).ok_or_else(|| {
            conversion_failure(
                format!("Could not determine the frame rate of {}", video.display()),
                &cmd,
                &output,
            )
        })
    }

    /// Encode `media` and `frames` into `output`.
    ///
    /// `demo` and `duration` drive segment planning for the overlay profile,
    /// whose filter script is written into `scratch`. Fails without starting
    /// ffmpeg if the output exists and overwriting is off.
    pub async fn assemble(
        &self,
        output: &OutputSpec,
        media: &Asset,
        frames: &FramePattern,
        demo: &DemoTimings,
        duration: u32,
        scratch: &Path,
    ) -> Result<PathBuf> {
        output.check_writable()?;

        let profile = output.profile;
        let args = match profile {
            Profile::Legacy | Profile::H264 => build_command(
                profile,
                &CommandContext {
                    media,
                    frames,
                    output,
                    overlay: None,
                },
            )?,
            Profile::H264Overlay => {
                if media.kind != AssetKind::Video {
                    return Err(Error::Validation(format!(
                        "overlay output needs the talk video, got {:?} asset {}",
                        media.kind,
                        media.path.display()
                    )));
                }
                let frame_rate = self.probe_frame_rate(&media.path).await?;
                let segments = SegmentPlanner::plan(demo, duration);
                let plan = SegmentPlanner::overlay(&segments, &media.path, frames);
                let script = scratch.join(FILTER_SCRIPT);
                tokio::fs::write(&script, plan.filter_script()).await?;
                tracing::debug!(
                    "Overlay plan: {} segments at {frame_rate} fps",
                    plan.segments.len()
                );
                build_command(
                    profile,
                    &CommandContext {
                        media,
                        frames,
                        output,
                        overlay: Some(OverlayArgs {
                            plan: &plan,
                            filter_script: &script,
                            frame_rate: &frame_rate,
                        }),
                    },
                )?
            }
        };

        let mut cmd = self.command();
        cmd.args(args);
        tracing::info!("Encoding {} ({profile})", output.path.display());
        let result = self.runner.run(&cmd).await?;
        if !result.success() {
            let mut message = format!("Failed to create final movie as {}", output.path.display());
            if profile.requires_recent_encoder() {
                message.push_str(&format!(
                    ". The {profile} output format requires a recent version of ffmpeg and libx264; \
                     perhaps you should check your setup"
                ));
            }
            return Err(conversion_failure(message, &cmd, &result));
        }

        Ok(output.path.clone())
    }
}

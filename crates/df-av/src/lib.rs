//! # df-av
//!
//! External tool plumbing for the deckforge pipeline.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- resolve ffmpeg, rtmpdump and
//!   swfrender from config or `PATH`.
//! - **Command execution** ([`ToolCommand`], [`ToolRunner`]) -- async process
//!   builder plus the seam tests use to substitute fake tools.
//! - **Scratch space** ([`Workspace`]) -- lazily created temp directory.
//! - **Acquisition helpers** -- resumable RTMP download ([`StreamDownloader`]),
//!   SWF rasterizing ([`SlideRenderer`]) and audio extraction
//!   ([`extract_audio`]).
//! - **Assembly** -- per-second frame expansion ([`FrameExpander`]), overlay
//!   segment planning ([`SegmentPlanner`]) and the ffmpeg encode
//!   ([`Transcoder`]).

pub mod audio;
pub mod command;
pub mod frames;
pub mod render;
pub mod segments;
pub mod stream;
pub mod tools;
pub mod transcode;
pub mod workspace;

// ---- Re-exports for convenience ----

pub use audio::extract_audio;
pub use command::{conversion_failure, SystemRunner, ToolCommand, ToolOutput, ToolRunner};
pub use frames::{FrameExpander, FramePattern};
pub use render::SlideRenderer;
pub use segments::{video_input_index, OverlayPlan, Segment, SegmentKind, SegmentPlanner};
pub use stream::{StreamDownloader, RESUMABLE_EXIT_CODE};
pub use tools::{Tool, ToolInfo, ToolRegistry};
pub use transcode::{build_command, parse_frame_rate, CommandContext, OverlayArgs, Transcoder};
pub use workspace::Workspace;

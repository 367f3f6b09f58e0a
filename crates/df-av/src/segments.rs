//! Segment planning for the slides/video overlay output.
//!
//! Demo timings split the talk into alternating segments. Slide segments show
//! the slide full-width with the speaker video inset in the bottom-right
//! corner; video segments show the speaker video alone. Every segment is
//! composited onto its own labelled output and the outputs are concatenated
//! with the matching audio.
//!
//! Each segment contributes its own ffmpeg inputs: the source video (seeked
//! and trimmed to the segment) and, for slide segments, the frame sequence
//! started at the segment's first second. Input numbering therefore depends
//! on how many slide and video segments precede a segment.

use std::path::Path;

use df_core::DemoTimings;

use crate::frames::FramePattern;

/// Output canvas.
const CANVAS_WIDTH: u32 = 1280;
const CANVAS_HEIGHT: u32 = 720;
/// Width of the speaker inset during slide segments.
const INSET_WIDTH: u32 = 320;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Slides,
    Video,
}

impl SegmentKind {
    /// Inputs a segment of this kind adds to the command line.
    pub fn input_count(&self) -> usize {
        match self {
            SegmentKind::Slides => 2,
            SegmentKind::Video => 1,
        }
    }
}

/// A half-open `[start, end)` stretch of the talk; `end` is `None` for the
/// final segment, which runs to the end of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub start: u32,
    pub end: Option<u32>,
}

impl Segment {
    /// Length in seconds, or `None` when unbounded.
    pub fn length(&self) -> Option<u32> {
        self.end.map(|end| end - self.start)
    }

    /// Concrete `(start, end)` within a talk of `duration` seconds.
    pub fn span(&self, duration: u32) -> (u32, u32) {
        (self.start, self.end.unwrap_or(duration).max(self.start))
    }
}

/// Index of segment `segment`'s video input.
///
/// Slide segments take two inputs and video segments one, so the index is
/// twice the number of earlier slide segments plus the number of earlier
/// video segments. Segment kinds alternate starting from the opening kind.
pub fn video_input_index(segment: usize, opens_on_slides: bool) -> usize {
    let even_before = segment.div_ceil(2);
    let odd_before = segment / 2;
    let (slides_before, video_before) = if opens_on_slides {
        (even_before, odd_before)
    } else {
        (odd_before, even_before)
    };
    2 * slides_before + video_before
}

/// The ffmpeg inputs and filter graph for an overlay encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayPlan {
    pub segments: Vec<Segment>,
    /// `-ss`/`-t`/`-f`/`-i` arguments for every input, in order.
    pub input_args: Vec<String>,
    /// Per-segment scale/overlay filter chains, one statement per line.
    pub filters: Vec<String>,
    /// Final `concat` statement.
    pub concat: String,
}

impl OverlayPlan {
    /// Contents of the `-filter_complex_script` file.
    pub fn filter_script(&self) -> String {
        format!("{}\n{}", self.filters.join("\n"), self.concat)
    }
}

pub struct SegmentPlanner;

impl SegmentPlanner {
    /// Split a talk of `duration` seconds at `demo` switch points.
    ///
    /// The talk opens on slides unless the first switch point is 0. Switch
    /// points at or past the end of the talk are ignored.
    pub fn plan(demo: &DemoTimings, duration: u32) -> Vec<Segment> {
        let mut bounds: Vec<u32> = Vec::with_capacity(demo.offsets().len() + 1);
        for &offset in demo.offsets() {
            if offset == 0 || offset < duration {
                bounds.push(offset);
            } else {
                tracing::warn!("Ignoring demo timing {offset}s beyond talk duration {duration}s");
            }
        }

        let opens_on_slides = bounds.first() != Some(&0);
        if opens_on_slides {
            bounds.insert(0, 0);
        }

        (0..bounds.len())
            .map(|i| Segment {
                kind: if (i % 2 == 0) == opens_on_slides {
                    SegmentKind::Slides
                } else {
                    SegmentKind::Video
                },
                start: bounds[i],
                end: bounds.get(i + 1).copied(),
            })
            .collect()
    }

    /// Build the inputs and filter graph compositing `video` and `frames`
    /// over `segments`.
    pub fn overlay(segments: &[Segment], video: &Path, frames: &FramePattern) -> OverlayPlan {
        let opens_on_slides = segments
            .first()
            .map_or(true, |s| s.kind == SegmentKind::Slides);
        let video = video.to_string_lossy().into_owned();

        let mut input_args: Vec<String> = Vec::new();
        let mut filters: Vec<String> = Vec::new();
        let mut concat = Vec::with_capacity(segments.len() + 1);
        let mut inputs = 0usize;

        for (i, segment) in segments.iter().enumerate() {
            let vid = video_input_index(i, opens_on_slides);
            debug_assert_eq!(vid, inputs);

            if segment.start > 0 {
                input_args.extend(["-ss".into(), segment.start.to_string()]);
            }
            if let Some(length) = segment.length() {
                input_args.extend(["-t".into(), length.to_string()]);
            }
            input_args.extend(["-i".into(), video.clone()]);

            match segment.kind {
                SegmentKind::Slides => {
                    input_args.extend([
                        "-f".into(),
                        "image2".into(),
                        "-r".into(),
                        "1".into(),
                        "-s".into(),
                        "hd720".into(),
                        "-start_number".into(),
                        frames.frame_at(segment.start).to_string(),
                        "-i".into(),
                        frames.pattern_str(),
                    ]);
                    let slides = vid + 1;
                    let slide_width = CANVAS_WIDTH - INSET_WIDTH;
                    filters.extend([
                        format!("[{vid}:v] setpts=PTS-STARTPTS, scale=w={INSET_WIDTH}:h=-1 [sp-{i}];"),
                        format!("[{slides}:v] setpts=PTS-STARTPTS, scale=w={slide_width}:h=-1 [sl-{i}];"),
                        format!("color=size={CANVAS_WIDTH}x{CANVAS_HEIGHT}:c=Black [b-{i}];"),
                        format!("[b-{i}][sl-{i}] overlay=shortest=1:x=0:y=0 [bsl-{i}];"),
                        format!(
                            "[bsl-{i}][sp-{i}] overlay=shortest=1:x=main_w-{INSET_WIDTH}:y=main_h-overlay_h [c-{i}];"
                        ),
                    ]);
                }
                SegmentKind::Video => {
                    filters.push(format!(
                        "[{vid}:v] scale='if(gt(a,16/9),{CANVAS_WIDTH},-1)':'if(gt(a,16/9),-1,{CANVAS_HEIGHT})' [c-{i}];"
                    ));
                }
            }

            concat.push(format!("[c-{i}] [{vid}:a:0]"));
            inputs += segment.kind.input_count();
        }
        concat.push(format!("concat=n={}:v=1:a=1 [v] [a]", segments.len()));

        OverlayPlan {
            segments: segments.to_vec(),
            input_args,
            filters,
            concat: concat.join(" "),
        }
    }
}

//! Lifecycle of one synthesis run.

use std::fmt;

/// Steps a synthesis run moves through, in order. `Failed` can be entered
/// from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SynthesisState {
    Created,
    VideoAcquired,
    SlidesAcquired,
    FramesExpanded,
    Assembled,
    Done,
    Failed,
}

impl SynthesisState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisState::Created => "created",
            SynthesisState::VideoAcquired => "video_acquired",
            SynthesisState::SlidesAcquired => "slides_acquired",
            SynthesisState::FramesExpanded => "frames_expanded",
            SynthesisState::Assembled => "assembled",
            SynthesisState::Done => "done",
            SynthesisState::Failed => "failed",
        }
    }

    /// The state a successful step leads to.
    pub fn next(&self) -> Option<SynthesisState> {
        use SynthesisState::*;
        match self {
            Created => Some(VideoAcquired),
            VideoAcquired => Some(SlidesAcquired),
            SlidesAcquired => Some(FramesExpanded),
            FramesExpanded => Some(Assembled),
            Assembled => Some(Done),
            Done | Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SynthesisState::Done | SynthesisState::Failed)
    }

    /// Whether moving from `self` to `to` is a legal transition.
    pub fn can_transition_to(&self, to: SynthesisState) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == SynthesisState::Failed || self.next() == Some(to)
    }
}

impl fmt::Display for SynthesisState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

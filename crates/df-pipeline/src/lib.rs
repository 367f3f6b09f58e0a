//! # df-pipeline
//!
//! Orchestration of a full talk synthesis.
//!
//! - **[`Synthesizer`]** -- acquires the video, soundtrack and slides, expands
//!   frames and assembles the output, always cleaning up its scratch space.
//! - **[`SynthesisState`]** -- the run's state machine.
//! - **[`StateObserver`]** -- callback receiving every [`Transition`].

pub mod context;
pub mod state;
pub mod synthesizer;

pub use context::{StateObserver, Transition};
pub use state::SynthesisState;
pub use synthesizer::Synthesizer;

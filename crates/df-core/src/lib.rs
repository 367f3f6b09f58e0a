//! df-core: shared errors, configuration, talk model, and file-linking seam.
//!
//! This crate is the foundational dependency for all other df-* crates,
//! providing the unified error type, the TOML configuration, the talk
//! manifest handed over by the scraper, and the hard-link abstraction used
//! by both the resource cache and the frame expander.

pub mod config;
pub mod error;
pub mod links;
pub mod talk;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use links::{is_too_many_links, FileLinker, HardLinker};
pub use talk::*;

//! Domain model shared by every StudioStyle crate.
//!
//! Holds the job record and its status state machine, the media-type
//! predicate used at intake, and output naming. Has no internal deps so
//! the provider, pipeline, and worker crates can all build on it.

pub mod error;
pub mod job;
pub mod media;
pub mod naming;
pub mod types;

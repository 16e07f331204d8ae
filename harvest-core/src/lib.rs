//! Harvest core domain types
//!
//! Shared types for one agent run: the raw fetch-output payload, the
//! per-attempt poll result, artifact references discovered in the
//! output, and the immutable record of a completed run.
//!
//! This crate is pure data and parsing logic; all I/O (HTTP, S3,
//! filesystem) lives in `harvest-client` and the `harvest` binary.

pub mod artifact;
pub mod outcome;
pub mod output;

pub use artifact::{ArtifactKind, ArtifactReference, ExtractedReferences, extract_references};
pub use outcome::RunOutcome;
pub use output::{OutputShape, PollResult, RawOutput, output_ready};

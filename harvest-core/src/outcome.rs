//! Run outcome record

use std::path::PathBuf;

use serde::Serialize;

use crate::artifact::ExtractedReferences;
use crate::output::RawOutput;

/// Immutable record of one completed run.
///
/// Constructed only after the output became ready and every
/// persistence step succeeded; a run that fails anywhere produces no
/// outcome at all.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// Full fetch-output response, exactly as received.
    pub raw_output: RawOutput,
    /// Artifact references discovered in the output.
    pub references: ExtractedReferences,
    /// Where the raw output was written locally.
    pub local_path: PathBuf,
    /// Storage location descriptor (`s3://bucket/key`).
    pub upload_location: String,
}

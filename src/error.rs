use std::path::PathBuf;

use thiserror::Error;

/// Failures that end a whole run.
///
/// Per-source fetch errors and per-URL probe errors are never surfaced here,
/// they degrade into missing content and invalid probe results instead.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("no content fetched from any of the {sources} sources")]
    NoContent { sources: usize },

    #[error("no valid channels found")]
    NoValidChannels,

    #[error("unable to write output to {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("run interrupted before output was written")]
    Interrupted,
}

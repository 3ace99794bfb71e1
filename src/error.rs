//! Error types for hyperfetch.

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FetchError>;

/// Failures surfaced to callers of [`HyperFetch::fetch`](crate::HyperFetch::fetch)
/// and of the body consumption methods on [`Response`](crate::Response).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("malformed archive URL: {0}")]
    MalformedUrl(String),

    #[error("archive runtime construction failed: {0}")]
    RuntimeConstruction(String),

    #[error("passthrough fetch failed: {0:#}")]
    Passthrough(anyhow::Error),

    #[error("body has already been consumed")]
    BodyUsed,

    #[error("body stream failed: {0}")]
    Body(#[source] io::Error),

    #[error("invalid JSON body: {0}")]
    Parse(#[from] serde_json::Error),

    /// Any failure while resolving, opening, listing or streaming an archive.
    /// `fetch` turns this into a 500 response and never returns it.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// Raised by an [`Archive`](crate::archive::Archive) when no file or directory
/// matches a requested path.
#[derive(Debug, Error)]
#[error("no file or directory matches {path} (tried: {})", .tried.join(", "))]
pub struct EntryNotFound {
    pub path: String,
    pub tried: Vec<String>,
}

impl EntryNotFound {
    pub fn new(path: impl Into<String>, tried: Vec<String>) -> Self {
        Self {
            path: path.into(),
            tried,
        }
    }
}

//! Path resolution against an opened archive.
//!
//! Matching rules belong to the archive. This layer only separates a
//! well-formed miss, which becomes a 404, from every other failure.

use anyhow::Result;
use tracing::debug;

use crate::archive::{Archive, ResolvedEntry};
use crate::error::EntryNotFound;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ResolvedEntry),
    /// No entry matched; carries diagnostic text for the response body
    NotFound(String),
}

pub async fn resolve(archive: &dyn Archive, path: &str) -> Result<Resolution> {
    match archive.resolve_path(path).await {
        Ok(entry) => {
            debug!(path, resolved = %entry.path, kind = ?entry.kind, "resolved archive path");
            Ok(Resolution::Found(entry))
        }
        Err(e) if e.is::<EntryNotFound>() => {
            debug!(path, "archive path not found");
            Ok(Resolution::NotFound(format!("{e:?}")))
        }
        Err(e) => Err(e),
    }
}
